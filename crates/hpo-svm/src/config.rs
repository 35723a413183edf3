use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default location the MNIST files are fetched from when missing locally.
pub const DEFAULT_MNIST_MIRROR: &str = "http://yann.lecun.com/exdb/mnist/";

/// Central configuration for a benchmark run.
///
/// Everything here describes *how* an arm is evaluated; the arm itself
/// (the hyperparameters under search) is passed separately.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct BenchmarkConfig {
    pub loader: LoaderOptions,
    pub preprocessing: PreprocessingOptions,
    pub solver: SolverConfig,
}

/// Dataset loading options.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoaderOptions {
    /// Prepend the validation split to the training split.
    ///
    /// Used when retraining on train+val before final test scoring. The
    /// validation split itself is left in place.
    pub combine: bool,
    /// Base URL the MNIST files are downloaded from.
    pub mnist_mirror: String,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            combine: false,
            mnist_mirror: DEFAULT_MNIST_MIRROR.to_string(),
        }
    }
}

/// How the `scaled` preprocessor computes its statistics.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Standardization {
    /// Fit mean/std on the training split and apply them to every split.
    #[default]
    FitOnTrain,
    /// Standardize each split with its own statistics. Reproduces historical
    /// benchmark numbers but leaks validation/test statistics.
    PerSplit,
}

impl FromStr for Standardization {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fit_on_train" | "fit-on-train" => Ok(Standardization::FitOnTrain),
            "per_split" | "per-split" => Ok(Standardization::PerSplit),
            _ => Err(format!(
                "Unknown standardization mode: {}. Valid options are: fit_on_train, per_split",
                s
            )),
        }
    }
}

impl fmt::Display for Standardization {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Standardization::FitOnTrain => write!(f, "fit_on_train"),
            Standardization::PerSplit => write!(f, "per_split"),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(default)]
pub struct PreprocessingOptions {
    pub standardization: Standardization,
}

/// SMO solver settings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SolverConfig {
    /// Stopping tolerance on the maximal KKT violation.
    pub tol: f64,
    /// Hard cap on SMO iterations per binary sub-problem. `None` runs until
    /// the tolerance is met.
    pub max_iter: Option<usize>,
    /// Memory budget for cached kernel rows during one fit. One-vs-one
    /// sub-problems solved concurrently share it.
    pub cache_size_mb: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tol: 1e-3,
            max_iter: None,
            cache_size_mb: 200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        let config: BenchmarkConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.loader, LoaderOptions::default());
        assert_eq!(config.preprocessing.standardization, Standardization::FitOnTrain);
        assert_eq!(config.solver, SolverConfig::default());
    }

    #[test]
    fn partial_solver_section() {
        let config: BenchmarkConfig =
            serde_json::from_str(r#"{"solver": {"cache_size_mb": 16}}"#).unwrap();
        assert_eq!(config.solver.cache_size_mb, 16);
        assert_eq!(config.solver.tol, 1e-3);
        assert!(config.solver.max_iter.is_none());
    }

    #[test]
    fn standardization_display_round_trips() {
        for mode in [Standardization::FitOnTrain, Standardization::PerSplit] {
            assert_eq!(mode.to_string().parse::<Standardization>().unwrap(), mode);
        }
    }
}
