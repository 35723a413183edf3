//! Scoring helpers.
use ndarray::Array1;

use crate::error::{BenchmarkError, Result};

/// Fraction of positions where `predicted` equals `truth`.
///
/// # Arguments
///
/// * `truth` - Ground-truth class labels.
/// * `predicted` - Predicted class labels, same length as `truth`.
///
/// # Returns
///
/// A value in [0, 1]. Empty inputs are an error rather than a silent 0 or 1.
pub fn accuracy(truth: &Array1<i32>, predicted: &Array1<i32>) -> Result<f64> {
    if truth.len() != predicted.len() {
        return Err(BenchmarkError::Shape(format!(
            "{} labels but {} predictions",
            truth.len(),
            predicted.len()
        )));
    }
    if truth.is_empty() {
        return Err(BenchmarkError::Shape(
            "cannot score an empty split".to_string(),
        ));
    }
    let correct = truth
        .iter()
        .zip(predicted.iter())
        .filter(|(a, b)| a == b)
        .count();
    Ok(correct as f64 / truth.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn accuracy_counts_matches() {
        let acc = accuracy(&array![1, 2, 3, 4], &array![1, 2, 0, 4]).unwrap();
        assert!((acc - 0.75).abs() < 1e-12);
    }

    #[test]
    fn accuracy_rejects_mismatch_and_empty() {
        assert!(accuracy(&array![1, 2], &array![1]).is_err());
        assert!(accuracy(&Array1::from_vec(vec![]), &Array1::from_vec(vec![])).is_err());
    }
}
