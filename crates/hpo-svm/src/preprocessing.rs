//! Feature preprocessing selected per arm.
//!
//! Provides fitted min/max and standard scalers plus per-example L2
//! normalization. Scalers are fit on the training split and applied
//! unchanged to validation and test, except under
//! [`Standardization::PerSplit`].

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::config::{PreprocessingOptions, Standardization};
use crate::data_handling::{PreprocessedDataset, RawDataset, Split};
use crate::error::{BenchmarkError, Result};

/// Preprocessing methods, in the ordinal order used by the search space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreprocessingMethod {
    Identity,
    MinMax,
    Scaled,
    Normalized,
}

impl PreprocessingMethod {
    /// Map the categorical `preprocessor` index of an arm to a method:
    /// 1 identity, 2 min_max, 3 scaled, 4 normalized.
    pub fn from_index(index: i64) -> Result<Self> {
        match index {
            1 => Ok(PreprocessingMethod::Identity),
            2 => Ok(PreprocessingMethod::MinMax),
            3 => Ok(PreprocessingMethod::Scaled),
            4 => Ok(PreprocessingMethod::Normalized),
            other => Err(BenchmarkError::UnknownPreprocessor(other.to_string())),
        }
    }
}

impl FromStr for PreprocessingMethod {
    type Err = BenchmarkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "identity" | "none" => Ok(PreprocessingMethod::Identity),
            "min_max" | "minmax" => Ok(PreprocessingMethod::MinMax),
            "scaled" | "standard" => Ok(PreprocessingMethod::Scaled),
            "normalized" => Ok(PreprocessingMethod::Normalized),
            _ => Err(BenchmarkError::UnknownPreprocessor(s.to_string())),
        }
    }
}

impl fmt::Display for PreprocessingMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PreprocessingMethod::Identity => write!(f, "identity"),
            PreprocessingMethod::MinMax => write!(f, "min_max"),
            PreprocessingMethod::Scaled => write!(f, "scaled"),
            PreprocessingMethod::Normalized => write!(f, "normalized"),
        }
    }
}

/// Per-feature `(x - center) / scale` transform.
#[derive(Clone, Debug, PartialEq)]
pub struct Scaler {
    pub center: Array1<f32>,
    pub scale: Array1<f32>,
}

impl Scaler {
    /// Rescale each feature to [0, 1] using the column min/max of `x`.
    /// Constant features get a unit scale.
    pub fn fit_min_max(x: &Array2<f32>) -> Result<Self> {
        ensure_non_empty(x, "min_max")?;
        let min = x.fold_axis(Axis(0), f32::INFINITY, |&acc, &v| acc.min(v));
        let max = x.fold_axis(Axis(0), f32::NEG_INFINITY, |&acc, &v| acc.max(v));
        let scale = Zip::from(&min)
            .and(&max)
            .map_collect(|&lo, &hi| non_zero_scale(hi - lo));
        Ok(Scaler { center: min, scale })
    }

    /// Zero mean, unit population variance per feature. Constant features get
    /// a unit scale.
    pub fn fit_standard(x: &Array2<f32>) -> Result<Self> {
        ensure_non_empty(x, "scaled")?;
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| BenchmarkError::Shape("cannot standardize an empty split".into()))?;
        let std = x.std_axis(Axis(0), 0.0).mapv(non_zero_scale);
        Ok(Scaler { center: mean, scale: std })
    }

    pub fn transform(&self, x: &Array2<f32>) -> Result<Array2<f32>> {
        if x.ncols() != self.center.len() {
            return Err(BenchmarkError::Shape(format!(
                "scaler fitted on {} features, got {}",
                self.center.len(),
                x.ncols()
            )));
        }
        Ok((x - &self.center) / &self.scale)
    }
}

fn non_zero_scale(v: f32) -> f32 {
    if v == 0.0 || !v.is_finite() {
        1.0
    } else {
        v
    }
}

fn ensure_non_empty(x: &Array2<f32>, method: &str) -> Result<()> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(BenchmarkError::Shape(format!(
            "{} preprocessing requires a non-empty training split",
            method
        )));
    }
    Ok(())
}

/// Divide every row by its L2 norm. All-zero rows are left as zeros.
pub fn normalize_rows(x: &Array2<f32>) -> Array2<f32> {
    let mut out = x.to_owned();
    for mut row in out.rows_mut() {
        let norm = row.dot(&row).sqrt();
        if norm > 0.0 {
            row.mapv_inplace(|v| v / norm);
        }
    }
    out
}

fn with_features(split: &Split, x: Array2<f32>) -> Split {
    Split {
        x,
        y: split.y.clone(),
    }
}

/// Apply `method` to a raw dataset, fitting on its training split.
pub fn preprocess(
    raw: &RawDataset,
    method: PreprocessingMethod,
    options: &PreprocessingOptions,
) -> Result<PreprocessedDataset> {
    log::debug!("[hpo-svm::preprocessing] applying {}", method);
    let (train, validation, test) = match method {
        PreprocessingMethod::Identity => (
            raw.train.clone(),
            raw.validation.clone(),
            raw.test.clone(),
        ),
        PreprocessingMethod::MinMax => {
            let scaler = Scaler::fit_min_max(&raw.train.x)?;
            (
                with_features(&raw.train, scaler.transform(&raw.train.x)?),
                with_features(&raw.validation, scaler.transform(&raw.validation.x)?),
                with_features(&raw.test, scaler.transform(&raw.test.x)?),
            )
        }
        PreprocessingMethod::Scaled => match options.standardization {
            Standardization::FitOnTrain => {
                let scaler = Scaler::fit_standard(&raw.train.x)?;
                (
                    with_features(&raw.train, scaler.transform(&raw.train.x)?),
                    with_features(&raw.validation, scaler.transform(&raw.validation.x)?),
                    with_features(&raw.test, scaler.transform(&raw.test.x)?),
                )
            }
            Standardization::PerSplit => {
                let own = |split: &Split| -> Result<Split> {
                    let scaler = Scaler::fit_standard(&split.x)?;
                    Ok(with_features(split, scaler.transform(&split.x)?))
                };
                (own(&raw.train)?, own(&raw.validation)?, own(&raw.test)?)
            }
        },
        PreprocessingMethod::Normalized => (
            with_features(&raw.train, normalize_rows(&raw.train.x)),
            with_features(&raw.validation, normalize_rows(&raw.validation.x)),
            with_features(&raw.test, normalize_rows(&raw.test.x)),
        ),
    };
    PreprocessedDataset::new(method, train, validation, test)
}
