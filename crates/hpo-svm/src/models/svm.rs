use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;

use crate::config::SolverConfig;
use crate::error::{BenchmarkError, Result};
use crate::models::classifier_trait::ClassifierModel;
use crate::models::kernel::{pair_cache_bytes, squared_norm, Kernel};
use crate::models::smo::{solve_binary, BinaryModel};

/// One-vs-one machine separating `classes[positive]` from `classes[negative]`.
#[derive(Debug, Clone)]
struct PairMachine {
    positive: usize,
    negative: usize,
    model: BinaryModel,
}

/// Kernel support-vector classifier.
///
/// Multi-class problems are decomposed one-vs-one: a binary machine is trained
/// for every pair of classes and prediction takes a majority vote, ties going
/// to the smaller class label.
pub struct SvcClassifier {
    kernel: Kernel,
    c: f64,
    solver: SolverConfig,
    classes: Vec<i32>,
    machines: Vec<PairMachine>,
}

impl SvcClassifier {
    pub fn new(kernel: Kernel, c: f64, solver: SolverConfig) -> Self {
        SvcClassifier {
            kernel,
            c,
            solver,
            classes: Vec::new(),
            machines: Vec::new(),
        }
    }

    pub fn classes(&self) -> &[i32] {
        &self.classes
    }

    /// Total support vectors across all pair machines.
    pub fn n_support(&self) -> usize {
        self.machines.iter().map(|m| m.model.n_support()).sum()
    }

    pub fn is_fitted(&self) -> bool {
        !self.machines.is_empty()
    }

    fn fit_pair(
        &self,
        x: &Array2<f32>,
        y: &Array1<i32>,
        positive: usize,
        negative: usize,
        cache_bytes: u64,
    ) -> Result<PairMachine> {
        let (pos_label, neg_label) = (self.classes[positive], self.classes[negative]);
        let rows: Vec<usize> = y
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == pos_label || l == neg_label)
            .map(|(i, _)| i)
            .collect();
        let x_pair = x.select(Axis(0), &rows);
        let y_pair: Vec<f64> = rows
            .iter()
            .map(|&i| if y[i] == pos_label { 1.0 } else { -1.0 })
            .collect();

        let model = solve_binary(&x_pair, &y_pair, self.c, self.kernel, &self.solver, cache_bytes)?;
        log::debug!(
            "[hpo-svm::svm] {} vs {}: {} examples, {} support vectors, {} iterations",
            pos_label,
            neg_label,
            rows.len(),
            model.n_support(),
            model.iterations
        );
        Ok(PairMachine {
            positive,
            negative,
            model,
        })
    }
}

impl ClassifierModel for SvcClassifier {
    fn fit(&mut self, x: &Array2<f32>, y: &Array1<i32>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(BenchmarkError::Shape(format!(
                "{} feature rows but {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if x.nrows() == 0 {
            return Err(BenchmarkError::Fit("training split is empty".to_string()));
        }
        if let Some(pos) = x.iter().position(|v| !v.is_finite()) {
            return Err(BenchmarkError::Fit(format!(
                "non-finite feature value at row {}, column {}",
                pos / x.ncols(),
                pos % x.ncols()
            )));
        }

        let mut classes: Vec<i32> = y.to_vec();
        classes.sort_unstable();
        classes.dedup();
        if classes.len() < 2 {
            return Err(BenchmarkError::Fit(format!(
                "SVC requires at least 2 distinct classes, found {}",
                classes.len()
            )));
        }
        self.classes = classes;
        self.machines.clear();

        let pairs: Vec<(usize, usize)> = (0..self.classes.len())
            .flat_map(|a| ((a + 1)..self.classes.len()).map(move |b| (a, b)))
            .collect();
        // pairs are solved concurrently, so the kernel cache budget is shared
        let cache_bytes = pair_cache_bytes(
            self.solver.cache_size_mb,
            pairs.len(),
            rayon::current_num_threads(),
        );
        log::info!(
            "[hpo-svm::svm] fitting {} one-vs-one machines ({} classes, {} examples, {} features), {} KiB kernel cache each",
            pairs.len(),
            self.classes.len(),
            x.nrows(),
            x.ncols(),
            cache_bytes / 1024
        );

        let this = &*self;
        let machines = pairs
            .par_iter()
            .map(|&(a, b)| this.fit_pair(x, y, a, b, cache_bytes))
            .collect::<Result<Vec<_>>>()?;
        self.machines = machines;

        log::info!(
            "[hpo-svm::svm] fitted with {} support vectors in total",
            self.n_support()
        );
        Ok(())
    }

    fn predict(&self, x: &Array2<f32>) -> Result<Array1<i32>> {
        if !self.is_fitted() {
            return Err(BenchmarkError::NotFitted);
        }
        let n_features = self.machines[0].model.support_vectors.ncols();
        if x.ncols() != n_features {
            return Err(BenchmarkError::Shape(format!(
                "model fitted on {} features, got {}",
                n_features,
                x.ncols()
            )));
        }

        let predictions: Vec<i32> = x
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|row| {
                let sq = squared_norm(row);
                let mut votes = vec![0usize; self.classes.len()];
                for machine in &self.machines {
                    if machine.model.decision(&self.kernel, row, sq) > 0.0 {
                        votes[machine.positive] += 1;
                    } else {
                        votes[machine.negative] += 1;
                    }
                }
                let mut best = 0;
                for (k, &v) in votes.iter().enumerate() {
                    if v > votes[best] {
                        best = k;
                    }
                }
                self.classes[best]
            })
            .collect();
        Ok(Array1::from_vec(predictions))
    }

    fn name(&self) -> &str {
        self.kernel.name()
    }
}
