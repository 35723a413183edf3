use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use hpo_svm::evaluator::DEFAULT_DATASET;
use hpo_svm::BenchmarkConfig;

fn default_dataset() -> String {
    DEFAULT_DATASET.to_string()
}

/// The `EXPERIMENT` section: where the datasets live and which one to use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSection {
    pub data_dir: PathBuf,
    #[serde(default = "default_dataset")]
    pub dataset: String,
}

/// Experiment configuration file.
///
/// ```json
/// {
///   "EXPERIMENT": { "data_dir": "/data/svm", "dataset": "mnist" },
///   "benchmark": { "solver": { "tol": 0.001 } }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(rename = "EXPERIMENT")]
    pub experiment: ExperimentSection,
    #[serde(default)]
    pub benchmark: BenchmarkConfig,
}

pub fn load_experiment_config<P: AsRef<Path>>(path: P) -> Result<ExperimentConfig> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: ExperimentConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}
