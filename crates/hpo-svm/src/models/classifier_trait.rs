use ndarray::{Array1, Array2};

use crate::error::Result;
use crate::stats::accuracy;

/// Contract for classifiers built from an arm. Labels are arbitrary integer
/// class ids; implementations handle any number of classes ≥ 2.
pub trait ClassifierModel: Send {
    /// Fit the model on `x` (examples × features) with labels `y`.
    fn fit(&mut self, x: &Array2<f32>, y: &Array1<i32>) -> Result<()>;

    /// Predict a class label for every row of `x`.
    fn predict(&self, x: &Array2<f32>) -> Result<Array1<i32>>;

    /// Fraction of rows of `x` whose predicted label equals `y`.
    fn score(&self, x: &Array2<f32>, y: &Array1<i32>) -> Result<f64> {
        let predictions = self.predict(x)?;
        accuracy(y, &predictions)
    }

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "classifier"
    }
}
