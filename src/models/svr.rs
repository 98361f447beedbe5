//! Epsilon-insensitive support vector regression with an RBF kernel.
//!
//! The intercept is folded into the kernel (`K + 1`), which leaves a
//! box-constrained dual with no equality constraint:
//!
//! ```text
//! min  ½ βᵀQβ − yᵀβ + ε‖β‖₁    s.t. −C ≤ βᵢ ≤ C,   Q = K + 1
//! ```
//!
//! solved by cyclic coordinate descent. Each coordinate step has a closed
//! form (soft-threshold, then clip to the box). Rows with βᵢ ≠ 0 are the
//! support vectors; prediction is `Σ βᵢ (k(xᵢ, x) + 1)`.

use serde::{Deserialize, Serialize};

use super::{FitReport, Regressor};
use crate::features::FeatureMatrix;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvrConfig {
    /// Box constraint on dual coefficients
    pub c: f64,
    /// Half-width of the insensitive tube
    pub epsilon: f64,
    /// RBF width; None selects `1 / (n_features * Var(X))`
    pub gamma: Option<f64>,
    /// Maximum coordinate-descent sweeps
    pub max_iter: usize,
    /// Stop when no coefficient moves more than this in a sweep
    pub tol: f64,
}

impl Default for SvrConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            epsilon: 0.1,
            gamma: None,
            max_iter: 1000,
            tol: 1e-3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SvrRegressor {
    config: SvrConfig,
    gamma: f64,
    support: Vec<Vec<f64>>,
    coefficients: Vec<f64>,
}

/// Kernel width used when `gamma` is not configured.
pub fn scale_gamma(x: &FeatureMatrix) -> f64 {
    let values = x.as_slice();
    if values.is_empty() {
        return 1.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    if var > 0.0 {
        1.0 / (x.n_cols() as f64 * var)
    } else {
        1.0
    }
}

fn rbf(gamma: f64, a: &[f64], b: &[f64]) -> f64 {
    let d2: f64 = a.iter().zip(b).map(|(u, v)| (u - v) * (u - v)).sum();
    (-gamma * d2).exp()
}

impl SvrRegressor {
    pub fn new(config: SvrConfig) -> Self {
        Self {
            config,
            gamma: 1.0,
            support: Vec::new(),
            coefficients: Vec::new(),
        }
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn support_vector_count(&self) -> usize {
        self.support.len()
    }
}

impl Regressor for SvrRegressor {
    fn fit(&mut self, x: &FeatureMatrix, y: &[f64]) -> FitReport {
        let n = x.n_rows();
        let c = self.config.c;
        let eps = self.config.epsilon;
        self.gamma = self.config.gamma.unwrap_or_else(|| scale_gamma(x));

        // Bias-augmented kernel, row-major n x n
        let mut q = vec![0.0; n * n];
        for i in 0..n {
            q[i * n + i] = 2.0;
            for j in 0..i {
                let k = rbf(self.gamma, x.row(i), x.row(j)) + 1.0;
                q[i * n + j] = k;
                q[j * n + i] = k;
            }
        }

        let mut beta = vec![0.0; n];
        // f = Qβ
        let mut f = vec![0.0; n];
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.config.max_iter {
            iterations += 1;
            let mut max_delta: f64 = 0.0;

            for i in 0..n {
                let qii = q[i * n + i];
                let z = beta[i] - (f[i] - y[i]) / qii;
                let shrunk = z.signum() * (z.abs() - eps / qii).max(0.0);
                let updated = shrunk.clamp(-c, c);
                let delta = updated - beta[i];
                if delta != 0.0 {
                    beta[i] = updated;
                    let col = &q[i * n..(i + 1) * n];
                    for (fj, qij) in f.iter_mut().zip(col) {
                        *fj += delta * qij;
                    }
                    max_delta = max_delta.max(delta.abs());
                }
            }

            if max_delta < self.config.tol {
                converged = true;
                break;
            }
        }

        self.support.clear();
        self.coefficients.clear();
        for (i, &b) in beta.iter().enumerate() {
            if b != 0.0 {
                self.support.push(x.row(i).to_vec());
                self.coefficients.push(b);
            }
        }

        FitReport { iterations, converged }
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        self.support
            .iter()
            .zip(&self.coefficients)
            .map(|(sv, b)| b * (rbf(self.gamma, sv, row) + 1.0))
            .sum()
    }
}
