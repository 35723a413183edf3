//! Evaluation of a single arm: normalize, preprocess, build, fit, score.
use std::fmt;
use std::path::Path;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::arm::{normalize_arm, Arm, HyperParams};
use crate::config::BenchmarkConfig;
use crate::data_handling::{DatasetId, RawDataset};
use crate::error::Result;
use crate::io::{DatasetCache, Fetcher};
use crate::models::factory::build_model;
use crate::preprocessing::preprocess;

/// Reported in place of a measured training loss. Only the validation and
/// test metrics are computed.
pub const TRAINING_LOSS_PLACEHOLDER: f64 = 1.0;

/// Dataset evaluated when the caller does not name one.
pub const DEFAULT_DATASET: &str = "cifar10";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Always [`TRAINING_LOSS_PLACEHOLDER`].
    pub training_loss: f64,
    pub validation_accuracy: f64,
    pub test_accuracy: f64,
}

impl EvaluationResult {
    pub fn new(validation_accuracy: f64, test_accuracy: f64) -> Self {
        EvaluationResult {
            training_loss: TRAINING_LOSS_PLACEHOLDER,
            validation_accuracy,
            test_accuracy,
        }
    }

    /// `(training_loss, validation_accuracy, test_accuracy)`
    pub fn as_tuple(&self) -> (f64, f64, f64) {
        (self.training_loss, self.validation_accuracy, self.test_accuracy)
    }

    pub fn validation_error(&self) -> f64 {
        1.0 - self.validation_accuracy
    }

    pub fn test_error(&self) -> f64 {
        1.0 - self.test_accuracy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Sat,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RunStatus::Sat => write!(f, "SAT"),
        }
    }
}

/// Outcome of one run, rendered as the single result line optimizer
/// front-ends parse:
///
/// ```text
/// Result for ParamILS: SAT, <duration>, 1, <validation error>, -1, test_error, <test error>
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub status: RunStatus,
    pub duration: Duration,
    pub result: EvaluationResult,
}

impl RunReport {
    pub fn new(result: EvaluationResult, duration: Duration) -> Self {
        RunReport {
            status: RunStatus::Sat,
            duration,
            result,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Result for ParamILS: {}, {:.6}, 1, {:.6}, -1, test_error, {:.6}",
            self.status,
            self.duration.as_secs_f64(),
            self.result.validation_error(),
            self.result.test_error()
        )
    }
}

/// Evaluate `arm` against an already loaded dataset.
///
/// Pure with respect to `dataset`: the raw splits are only read, and the
/// preprocessed copy and fitted model are dropped before returning.
pub fn evaluate_dataset(
    arm: &Arm,
    dataset: &RawDataset,
    config: &BenchmarkConfig,
) -> Result<EvaluationResult> {
    let params = HyperParams::from_arm(&normalize_arm(arm))?;
    evaluate_params(&params, dataset, config)
}

fn evaluate_params(
    params: &HyperParams,
    dataset: &RawDataset,
    config: &BenchmarkConfig,
) -> Result<EvaluationResult> {
    let data = preprocess(dataset, params.preprocessor, &config.preprocessing)?;
    let mut model = build_model(params, &config.solver);
    model.fit(&data.train.x, &data.train.y)?;

    let validation_accuracy = model.score(&data.validation.x, &data.validation.y)?;
    let test_accuracy = model.score(&data.test.x, &data.test.y)?;
    log::info!(
        "[hpo-svm::evaluator] {} / {}: validation accuracy {:.4}, test accuracy {:.4}",
        params.preprocessor,
        model.name(),
        validation_accuracy,
        test_accuracy
    );
    Ok(EvaluationResult::new(validation_accuracy, test_accuracy))
}

/// Evaluates arms against datasets loaded once and cached.
pub struct Evaluator {
    config: BenchmarkConfig,
    cache: DatasetCache,
}

impl Evaluator {
    pub fn new(config: BenchmarkConfig) -> Self {
        let cache = DatasetCache::new(config.loader.clone());
        Evaluator { config, cache }
    }

    pub fn with_fetcher(config: BenchmarkConfig, fetcher: Box<dyn Fetcher>) -> Self {
        let cache = DatasetCache::with_fetcher(config.loader.clone(), fetcher);
        Evaluator { config, cache }
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    /// Evaluate `arm` on `dataset` stored under `data_dir`.
    ///
    /// Configuration problems (unknown dataset, bad or missing
    /// hyperparameters) are reported before any file is touched.
    pub fn evaluate(&self, dataset: &str, data_dir: &Path, arm: &Arm) -> Result<EvaluationResult> {
        let id: DatasetId = dataset.parse()?;
        let params = HyperParams::from_arm(&normalize_arm(arm))?;
        log::debug!("[hpo-svm::evaluator] arm {:?}", arm);
        let raw = self.cache.get_or_load(id, data_dir)?;
        evaluate_params(&params, &raw, &self.config)
    }
}

/// Default-configuration evaluator behind [`evaluate`]. Its cache lives for
/// the whole process.
static DEFAULT_EVALUATOR: Lazy<Evaluator> = Lazy::new(|| Evaluator::new(BenchmarkConfig::default()));

/// Harness entry point: evaluate `arm` on CIFAR-10 stored under `data_dir`
/// with the default configuration.
///
/// Each storage directory is loaded once per process; later calls reuse the
/// decoded dataset.
///
/// Returns `(training_loss, validation_accuracy, test_accuracy)`.
pub fn evaluate(arm: &Arm, data_dir: &Path) -> Result<(f64, f64, f64)> {
    DEFAULT_EVALUATOR
        .evaluate(DEFAULT_DATASET, data_dir, arm)
        .map(|r| r.as_tuple())
}
