//! Kernel functions and the on-demand kernel row cache used by the solver.
use std::rc::Rc;

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Kernel function together with the coefficients it needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Kernel {
    /// K(x, y) = exp(-γ‖x - y‖²)
    Rbf { gamma: f64 },
    /// K(x, y) = (γ x·y + coef0)^degree
    Poly { gamma: f64, coef0: f64, degree: u32 },
    /// K(x, y) = tanh(γ x·y + coef0)
    Sigmoid { gamma: f64, coef0: f64 },
}

impl Kernel {
    pub fn name(&self) -> &'static str {
        match self {
            Kernel::Rbf { .. } => "rbf",
            Kernel::Poly { .. } => "poly",
            Kernel::Sigmoid { .. } => "sigmoid",
        }
    }

    /// Evaluate the kernel given the squared norms of both inputs.
    #[inline]
    pub fn eval_with_norms(&self, a: ArrayView1<f32>, b: ArrayView1<f32>, sq_a: f64, sq_b: f64) -> f64 {
        let dot = a.dot(&b) as f64;
        match *self {
            Kernel::Rbf { gamma } => {
                let dist = (sq_a + sq_b - 2.0 * dot).max(0.0);
                (-gamma * dist).exp()
            }
            Kernel::Poly {
                gamma,
                coef0,
                degree,
            } => (gamma * dot + coef0).powi(degree.min(i32::MAX as u32) as i32),
            Kernel::Sigmoid { gamma, coef0 } => (gamma * dot + coef0).tanh(),
        }
    }

    pub fn eval(&self, a: ArrayView1<f32>, b: ArrayView1<f32>) -> f64 {
        self.eval_with_norms(a, b, squared_norm(a), squared_norm(b))
    }
}

/// Share of a `cache_size_mb` budget given to one of `n_pairs` binary
/// sub-problems when up to `threads` of them are solved at the same time.
/// The caches of concurrently running sub-problems add up to at most
/// `cache_size_mb`.
pub(crate) fn pair_cache_bytes(cache_size_mb: usize, n_pairs: usize, threads: usize) -> u64 {
    let total = (cache_size_mb as u64).saturating_mul(1024 * 1024);
    let concurrent = threads.min(n_pairs).max(1) as u64;
    total / concurrent
}

#[inline]
pub(crate) fn squared_norm(v: ArrayView1<f32>) -> f64 {
    v.iter().map(|&x| (x as f64) * (x as f64)).sum()
}

pub(crate) fn row_norms(x: &Array2<f32>) -> Array1<f64> {
    x.axis_iter(Axis(0)).map(squared_norm).collect()
}

/// Kernel rows of a training matrix, computed on demand and kept in a
/// bounded least-recently-used cache.
pub(crate) struct KernelCache<'a> {
    x: &'a Array2<f32>,
    kernel: Kernel,
    sq_norms: Array1<f64>,
    diag: Vec<f64>,
    rows: Vec<Option<(Rc<Vec<f64>>, u64)>>,
    cached: usize,
    capacity: usize,
    tick: u64,
    hits: u64,
    misses: u64,
}

impl<'a> KernelCache<'a> {
    /// `budget_bytes` bounds the cached rows; at least two rows are always kept.
    pub(crate) fn new(x: &'a Array2<f32>, kernel: Kernel, budget_bytes: u64) -> Self {
        let n = x.nrows();
        let sq_norms = row_norms(x);
        let diag = (0..n)
            .map(|i| kernel.eval_with_norms(x.row(i), x.row(i), sq_norms[i], sq_norms[i]))
            .collect();
        let row_bytes = (n.max(1) * std::mem::size_of::<f64>()) as u64;
        let capacity = ((budget_bytes / row_bytes) as usize).clamp(2, n.max(2));
        KernelCache {
            x,
            kernel,
            sq_norms,
            diag,
            rows: vec![None; n],
            cached: 0,
            capacity,
            tick: 0,
            hits: 0,
            misses: 0,
        }
    }

    pub(crate) fn diag(&self, i: usize) -> f64 {
        self.diag[i]
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.cached
    }

    pub(crate) fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    /// K(x_i, x_t) for every training row t.
    pub(crate) fn row(&mut self, i: usize) -> Rc<Vec<f64>> {
        self.tick += 1;
        if let Some((row, used)) = self.rows[i].as_mut() {
            *used = self.tick;
            self.hits += 1;
            return Rc::clone(row);
        }
        self.misses += 1;

        if self.cached >= self.capacity {
            self.evict_least_recent();
        }

        let row = Rc::new(self.compute_row(i));
        self.rows[i] = Some((Rc::clone(&row), self.tick));
        self.cached += 1;
        row
    }

    fn evict_least_recent(&mut self) {
        let victim = self
            .rows
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|(_, used)| (idx, *used)))
            .min_by_key(|&(_, used)| used)
            .map(|(idx, _)| idx);
        if let Some(idx) = victim {
            self.rows[idx] = None;
            self.cached -= 1;
        }
    }

    fn compute_row(&self, i: usize) -> Vec<f64> {
        let xi = self.x.row(i);
        let sq_i = self.sq_norms[i];
        let kernel = self.kernel;
        let x = self.x;
        let sq_norms = &self.sq_norms;
        (0..x.nrows())
            .into_par_iter()
            .map(|t| kernel.eval_with_norms(xi, x.row(t), sq_i, sq_norms[t]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn rbf_is_one_on_identical_inputs() {
        let k = Kernel::Rbf { gamma: 0.5 };
        let a = array![1.0f32, 2.0, 3.0];
        assert!((k.eval(a.view(), a.view()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn kernel_values_match_closed_forms() {
        let a = array![1.0f32, 0.0];
        let b = array![0.5f32, 2.0];

        let rbf = Kernel::Rbf { gamma: 0.1 };
        let expected = (-0.1f64 * (0.25 + 4.0)).exp();
        assert!((rbf.eval(a.view(), b.view()) - expected).abs() < 1e-9);

        let poly = Kernel::Poly {
            gamma: 2.0,
            coef0: 1.0,
            degree: 3,
        };
        assert!((poly.eval(a.view(), b.view()) - 8.0).abs() < 1e-9);

        let sigmoid = Kernel::Sigmoid {
            gamma: 1.0,
            coef0: -0.5,
        };
        assert!(sigmoid.eval(a.view(), b.view()).abs() < 1e-12);
    }

    #[test]
    fn cache_respects_capacity_and_matches_fresh_rows() {
        let x = Array2::from_shape_fn((50, 4), |(r, c)| (r * 4 + c) as f32 / 100.0);
        let kernel = Kernel::Rbf { gamma: 1.0 };
        // 0 MB forces the minimum capacity of two rows.
        let mut cache = KernelCache::new(&x, kernel, 0);
        assert_eq!(cache.capacity(), 2);

        for i in [0, 1, 2, 0, 3, 3, 4] {
            let row = cache.row(i);
            assert!(cache.len() <= cache.capacity());
            for t in 0..x.nrows() {
                let fresh = kernel.eval(x.row(i), x.row(t));
                assert!((row[t] - fresh).abs() < 1e-9);
            }
        }
        let (hits, misses) = cache.stats();
        assert_eq!(hits, 1);
        assert_eq!(misses, 6);
    }

    #[test]
    fn pair_budget_is_split_across_concurrent_pairs() {
        let mib = 1024 * 1024;
        assert_eq!(pair_cache_bytes(200, 45, 16), 200 * mib / 16);
        // fewer pairs than threads: only that many caches coexist
        assert_eq!(pair_cache_bytes(200, 3, 16), 200 * mib / 3);
        assert_eq!(pair_cache_bytes(200, 1, 16), 200 * mib);
        assert_eq!(pair_cache_bytes(200, 45, 0), 200 * mib);
    }

    #[test]
    fn pair_budget_sizes_the_cache() {
        let x = Array2::<f32>::zeros((1000, 2));
        let kernel = Kernel::Rbf { gamma: 1.0 };
        // 1 MiB over 4 concurrent pairs, 8000-byte rows
        let cache = KernelCache::new(&x, kernel, pair_cache_bytes(1, 45, 4));
        assert_eq!(cache.capacity(), 262_144 / 8000);

        let total: usize = (0..4)
            .map(|_| KernelCache::new(&x, kernel, pair_cache_bytes(1, 45, 4)).capacity() * 8000)
            .sum();
        assert!(total <= 1024 * 1024);
    }
}
