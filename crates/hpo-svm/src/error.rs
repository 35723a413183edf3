//! Error type shared by every stage of the evaluation pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BenchmarkError>;

/// Failures that abort the evaluation of an arm.
///
/// Nothing in the pipeline recovers from these or substitutes a default
/// metric; they are surfaced to the caller as-is.
#[derive(Error, Debug)]
pub enum BenchmarkError {
    #[error("Unknown dataset: {0}. Valid options are: mnist, cifar10")]
    UnknownDataset(String),

    #[error("Unknown preprocessor: {0}. Valid options are: 1 (identity), 2 (min_max), 3 (scaled), 4 (normalized)")]
    UnknownPreprocessor(String),

    #[error("Unknown kernel: {0}. Valid options are: 1 (rbf), 2 (poly), 3 (sigmoid)")]
    UnknownKernel(String),

    #[error("Missing hyperparameter '{name}' required by {required_by}")]
    MissingParameter { name: String, required_by: String },

    #[error("Invalid hyperparameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Corrupt {dataset} file {file}: {reason}")]
    Decode {
        dataset: String,
        file: String,
        reason: String,
    },

    #[error("Invalid shape: {0}")]
    Shape(String),

    #[error("Model fit failed: {0}")]
    Fit(String),

    #[error("Model not fitted")]
    NotFitted,
}

impl BenchmarkError {
    /// True for errors caused by the arm or run configuration rather than by
    /// data or numerics.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            BenchmarkError::UnknownDataset(_)
                | BenchmarkError::UnknownPreprocessor(_)
                | BenchmarkError::UnknownKernel(_)
                | BenchmarkError::MissingParameter { .. }
                | BenchmarkError::InvalidParameter { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BenchmarkError::Io {
            path: path.into(),
            source,
        }
    }
}
