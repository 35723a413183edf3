//! Sequential minimal optimization for the binary C-SVC dual.
//!
//! Solves
//!
//! ```text
//! min_α  ½ αᵀQα − eᵀα   s.t.  0 ≤ α_t ≤ C,  yᵀα = 0,   Q_ts = y_t y_s K(x_t, x_s)
//! ```
//!
//! selecting the maximal violating pair at every step and stopping once the
//! KKT violation falls below the tolerance. Kernel rows come from a bounded
//! `KernelCache`, so memory stays flat regardless of the number of examples.
use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::config::SolverConfig;
use crate::error::{BenchmarkError, Result};
use crate::models::kernel::{squared_norm, Kernel, KernelCache};

/// Floor for the curvature of a pair update.
const TAU: f64 = 1e-12;

/// A trained two-class machine: `f(x) = Σ coef_s K(sv_s, x) − rho`.
#[derive(Debug, Clone)]
pub(crate) struct BinaryModel {
    pub support_vectors: Array2<f32>,
    pub sv_sq_norms: Array1<f64>,
    /// `α_s y_s` for every support vector.
    pub coef: Array1<f64>,
    pub rho: f64,
    pub iterations: usize,
}

impl BinaryModel {
    pub(crate) fn decision(&self, kernel: &Kernel, x: ArrayView1<f32>, sq_x: f64) -> f64 {
        let mut sum = -self.rho;
        for (s, sv) in self.support_vectors.axis_iter(Axis(0)).enumerate() {
            sum += self.coef[s] * kernel.eval_with_norms(sv, x, self.sv_sq_norms[s], sq_x);
        }
        sum
    }

    pub(crate) fn n_support(&self) -> usize {
        self.coef.len()
    }
}

struct Dual<'c> {
    y: &'c [f64],
    c: f64,
    alpha: Vec<f64>,
    grad: Vec<f64>,
}

impl Dual<'_> {
    #[inline]
    fn in_up(&self, t: usize) -> bool {
        (self.y[t] > 0.0 && self.alpha[t] < self.c) || (self.y[t] < 0.0 && self.alpha[t] > 0.0)
    }

    #[inline]
    fn in_low(&self, t: usize) -> bool {
        (self.y[t] > 0.0 && self.alpha[t] > 0.0) || (self.y[t] < 0.0 && self.alpha[t] < self.c)
    }

    /// Maximal violating pair and the size of the violation.
    fn select_pair(&self) -> Option<(usize, usize, f64)> {
        let mut g_max = f64::NEG_INFINITY;
        let mut g_min = f64::INFINITY;
        let mut i = None;
        let mut j = None;
        for t in 0..self.y.len() {
            let v = -self.y[t] * self.grad[t];
            if self.in_up(t) && v >= g_max {
                g_max = v;
                i = Some(t);
            }
            if self.in_low(t) && v <= g_min {
                g_min = v;
                j = Some(t);
            }
        }
        match (i, j) {
            (Some(i), Some(j)) => Some((i, j, g_max - g_min)),
            _ => None,
        }
    }

    /// Analytic two-variable update, clipped to the box.
    fn update_pair(&mut self, i: usize, j: usize, k_ii: f64, k_jj: f64, k_ij: f64) -> (f64, f64) {
        let c = self.c;
        let (old_i, old_j) = (self.alpha[i], self.alpha[j]);
        let (mut a_i, mut a_j) = (old_i, old_j);

        if self.y[i] != self.y[j] {
            let quad = (k_ii + k_jj - 2.0 * k_ij).max(TAU);
            let delta = (-self.grad[i] - self.grad[j]) / quad;
            let diff = a_i - a_j;
            a_i += delta;
            a_j += delta;
            if diff > 0.0 {
                if a_j < 0.0 {
                    a_j = 0.0;
                    a_i = diff;
                }
            } else if a_i < 0.0 {
                a_i = 0.0;
                a_j = -diff;
            }
            if diff > 0.0 {
                if a_i > c {
                    a_i = c;
                    a_j = c - diff;
                }
            } else if a_j > c {
                a_j = c;
                a_i = c + diff;
            }
        } else {
            let quad = (k_ii + k_jj - 2.0 * k_ij).max(TAU);
            let delta = (self.grad[i] - self.grad[j]) / quad;
            let sum = a_i + a_j;
            a_i -= delta;
            a_j += delta;
            if sum > c {
                if a_i > c {
                    a_i = c;
                    a_j = sum - c;
                }
            } else if a_j < 0.0 {
                a_j = 0.0;
                a_i = sum;
            }
            if sum > c {
                if a_j > c {
                    a_j = c;
                    a_i = sum - c;
                }
            } else if a_i < 0.0 {
                a_i = 0.0;
                a_j = sum;
            }
        }

        self.alpha[i] = a_i;
        self.alpha[j] = a_j;
        (a_i - old_i, a_j - old_j)
    }

    /// Offset from the KKT conditions: mean over free vectors, otherwise the
    /// midpoint of the feasible interval.
    fn rho(&self) -> f64 {
        let mut upper = f64::INFINITY;
        let mut lower = f64::NEG_INFINITY;
        let mut free_sum = 0.0;
        let mut n_free = 0usize;
        for t in 0..self.y.len() {
            let yg = self.y[t] * self.grad[t];
            if self.alpha[t] >= self.c {
                if self.y[t] < 0.0 {
                    upper = upper.min(yg);
                } else {
                    lower = lower.max(yg);
                }
            } else if self.alpha[t] <= 0.0 {
                if self.y[t] > 0.0 {
                    upper = upper.min(yg);
                } else {
                    lower = lower.max(yg);
                }
            } else {
                n_free += 1;
                free_sum += yg;
            }
        }
        if n_free > 0 {
            free_sum / n_free as f64
        } else {
            (upper + lower) / 2.0
        }
    }
}

/// Train a binary machine on `x` with labels `y` in {+1, -1}, caching at most
/// `cache_bytes` of kernel rows.
pub(crate) fn solve_binary(
    x: &Array2<f32>,
    y: &[f64],
    c: f64,
    kernel: Kernel,
    solver: &SolverConfig,
    cache_bytes: u64,
) -> Result<BinaryModel> {
    let n = x.nrows();
    if n != y.len() {
        return Err(BenchmarkError::Shape(format!(
            "{} rows but {} labels",
            n,
            y.len()
        )));
    }
    if !y.iter().any(|&v| v > 0.0) || !y.iter().any(|&v| v < 0.0) {
        return Err(BenchmarkError::Fit(
            "binary sub-problem needs examples of both classes".to_string(),
        ));
    }

    let mut cache = KernelCache::new(x, kernel, cache_bytes);
    let mut dual = Dual {
        y,
        c,
        alpha: vec![0.0; n],
        grad: vec![-1.0; n],
    };

    let mut iterations = 0usize;
    loop {
        let Some((i, j, violation)) = dual.select_pair() else {
            break;
        };
        if violation < solver.tol {
            break;
        }
        if let Some(max_iter) = solver.max_iter {
            if iterations >= max_iter {
                log::warn!(
                    "[hpo-svm::smo] stopped at max_iter = {} with KKT violation {:.3e} (tol {:.1e})",
                    max_iter,
                    violation,
                    solver.tol
                );
                break;
            }
        }

        let row_i = cache.row(i);
        let row_j = cache.row(j);
        let (d_i, d_j) = dual.update_pair(i, j, cache.diag(i), cache.diag(j), row_i[j]);

        let (yi, yj) = (y[i], y[j]);
        for t in 0..n {
            dual.grad[t] += y[t] * (yi * row_i[t] * d_i + yj * row_j[t] * d_j);
        }
        iterations += 1;

        if iterations % 10_000 == 0 {
            log::trace!(
                "[hpo-svm::smo] iteration {} violation {:.3e}",
                iterations,
                violation
            );
        }
    }

    if dual.grad.iter().any(|g| !g.is_finite()) {
        return Err(BenchmarkError::Fit(format!(
            "non-finite gradient after {} iterations; kernel values overflowed",
            iterations
        )));
    }

    let rho = dual.rho();
    let support: Vec<usize> = (0..n).filter(|&t| dual.alpha[t] > 0.0).collect();
    let support_vectors = x.select(Axis(0), &support);
    let coef: Array1<f64> = support.iter().map(|&t| dual.alpha[t] * y[t]).collect();
    let sv_sq_norms = support_vectors.axis_iter(Axis(0)).map(squared_norm).collect();

    let (hits, misses) = cache.stats();
    log::debug!(
        "[hpo-svm::smo] converged in {} iterations: {} support vectors of {}, cache {}/{} rows, {} hits / {} misses",
        iterations,
        support.len(),
        n,
        cache.len(),
        cache.capacity(),
        hits,
        misses
    );

    Ok(BinaryModel {
        support_vectors,
        sv_sq_norms,
        coef,
        rho,
        iterations,
    })
}
