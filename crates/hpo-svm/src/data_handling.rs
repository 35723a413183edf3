//! Dataset containers shared by the loader, the preprocessing selector and
//! the evaluator.
//!
//! A dataset is always three splits (train, validation, test). Every split
//! stores a feature matrix (examples × flattened features) and a label
//! vector of the same length; the feature dimensionality is the same across
//! the three splits. Constructors enforce these invariants so downstream code
//! can rely on them.
use std::fmt;
use std::str::FromStr;

use ndarray::{concatenate, Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{BenchmarkError, Result};
use crate::preprocessing::PreprocessingMethod;

/// Datasets the loader knows how to fetch and decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetId {
    Mnist,
    Cifar10,
}

impl FromStr for DatasetId {
    type Err = BenchmarkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mnist" => Ok(DatasetId::Mnist),
            "cifar10" | "cifar-10" => Ok(DatasetId::Cifar10),
            _ => Err(BenchmarkError::UnknownDataset(s.to_string())),
        }
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DatasetId::Mnist => write!(f, "mnist"),
            DatasetId::Cifar10 => write!(f, "cifar10"),
        }
    }
}

/// One partition of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub x: Array2<f32>,
    pub y: Array1<i32>,
}

impl Split {
    pub fn new(x: Array2<f32>, y: Array1<i32>) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(BenchmarkError::Shape(format!(
                "{} feature rows but {} labels",
                x.nrows(),
                y.len()
            )));
        }
        Ok(Split { x, y })
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    /// Split off the last `n` examples, returning `(head, tail)`.
    pub fn split_tail(&self, n: usize) -> Result<(Split, Split)> {
        if n >= self.len() {
            return Err(BenchmarkError::Shape(format!(
                "cannot hold out {} of {} examples",
                n,
                self.len()
            )));
        }
        let cut = self.len() - n;
        let head = Split {
            x: self.x.slice(ndarray::s![..cut, ..]).to_owned(),
            y: self.y.slice(ndarray::s![..cut]).to_owned(),
        };
        let tail = Split {
            x: self.x.slice(ndarray::s![cut.., ..]).to_owned(),
            y: self.y.slice(ndarray::s![cut..]).to_owned(),
        };
        Ok((head, tail))
    }

    /// Stack splits vertically, in order.
    pub fn concat(parts: &[&Split]) -> Result<Split> {
        let xs: Vec<_> = parts.iter().map(|p| p.x.view()).collect();
        let ys: Vec<_> = parts.iter().map(|p| p.y.view()).collect();
        let x = concatenate(Axis(0), &xs)
            .map_err(|e| BenchmarkError::Shape(format!("cannot concatenate features: {}", e)))?;
        let y = concatenate(Axis(0), &ys)
            .map_err(|e| BenchmarkError::Shape(format!("cannot concatenate labels: {}", e)))?;
        Split::new(x, y)
    }
}

fn check_dimensions(train: &Split, validation: &Split, test: &Split) -> Result<()> {
    for (name, split) in [("train", train), ("validation", validation), ("test", test)] {
        if split.x.nrows() != split.y.len() {
            return Err(BenchmarkError::Shape(format!(
                "{} split has {} feature rows but {} labels",
                name,
                split.x.nrows(),
                split.y.len()
            )));
        }
    }
    let dim = train.n_features();
    if validation.n_features() != dim || test.n_features() != dim {
        return Err(BenchmarkError::Shape(format!(
            "feature dimensionality differs across splits: train {}, validation {}, test {}",
            dim,
            validation.n_features(),
            test.n_features()
        )));
    }
    Ok(())
}

/// Decoded dataset as produced by the loader. Never mutated after load.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDataset {
    pub train: Split,
    pub validation: Split,
    pub test: Split,
}

impl RawDataset {
    pub fn new(train: Split, validation: Split, test: Split) -> Result<Self> {
        check_dimensions(&train, &validation, &test)?;
        Ok(RawDataset {
            train,
            validation,
            test,
        })
    }

    pub fn n_features(&self) -> usize {
        self.train.n_features()
    }

    pub fn log_summary(&self, id: DatasetId) {
        log::info!(
            "[hpo-svm::data] {}: {} train / {} validation / {} test examples, {} features",
            id,
            self.train.len(),
            self.validation.len(),
            self.test.len(),
            self.n_features()
        );
    }
}

/// Dataset after a preprocessing transform. Fresh for every arm.
#[derive(Debug, Clone)]
pub struct PreprocessedDataset {
    pub method: PreprocessingMethod,
    pub train: Split,
    pub validation: Split,
    pub test: Split,
}

impl PreprocessedDataset {
    pub fn new(
        method: PreprocessingMethod,
        train: Split,
        validation: Split,
        test: Split,
    ) -> Result<Self> {
        check_dimensions(&train, &validation, &test)?;
        Ok(PreprocessedDataset {
            method,
            train,
            validation,
            test,
        })
    }
}
