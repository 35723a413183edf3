//! hpo-svm: benchmark evaluation pipeline for SVM hyperparameter search.
//!
//! Given an arm (one hyperparameter configuration) this crate loads and
//! caches a dataset, applies the preprocessing the arm selects, builds a
//! kernel support-vector classifier and reports validation and test accuracy.
//! Search, scheduling and result persistence belong to the surrounding
//! harness.
//!
//! The pipeline runs [`arm`] → [`preprocessing`] → [`models::factory`] →
//! [`evaluator`]; see [`evaluator::Evaluator`] for the entry point.
pub mod arm;
pub mod config;
pub mod data_handling;
pub mod error;
pub mod evaluator;
pub mod io;
pub mod models;
pub mod preprocessing;
pub mod stats;

pub use arm::{normalize_arm, normalize_value, Arm, HyperParams, ParamValue};
pub use config::BenchmarkConfig;
pub use error::{BenchmarkError, Result};
pub use evaluator::{evaluate, EvaluationResult, Evaluator, RunReport};
