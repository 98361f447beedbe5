//! Ordinary least squares with intercept.
//!
//! Solved on centered data through the normal equations and a Cholesky
//! factorization. One-hot blocks make the centered design rank-deficient
//! (each block sums to a constant), so a diagonal jitter proportional to the
//! mean diagonal is added and raised until the factorization succeeds.

use super::{FitReport, Regressor};
use crate::features::FeatureMatrix;

/// Initial jitter relative to the mean diagonal of XᵀX.
const RELATIVE_JITTER: f64 = 1e-10;
const MAX_JITTER_ATTEMPTS: usize = 12;

#[derive(Debug, Clone, Default)]
pub struct LinearRegression {
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

/// In-place lower Cholesky factor of a row-major `p x p` SPD matrix.
/// Returns false on a non-positive pivot.
fn cholesky(a: &mut [f64], p: usize) -> bool {
    for j in 0..p {
        let mut d = a[j * p + j];
        for k in 0..j {
            d -= a[j * p + k] * a[j * p + k];
        }
        if !(d > 0.0 && d.is_finite()) {
            return false;
        }
        let d = d.sqrt();
        a[j * p + j] = d;
        for i in j + 1..p {
            let mut s = a[i * p + j];
            for k in 0..j {
                s -= a[i * p + k] * a[j * p + k];
            }
            a[i * p + j] = s / d;
        }
    }
    true
}

/// Solve `L Lᵀ w = b` given the lower factor.
fn cholesky_solve(l: &[f64], p: usize, b: &[f64]) -> Vec<f64> {
    let mut z = vec![0.0; p];
    for i in 0..p {
        let mut s = b[i];
        for k in 0..i {
            s -= l[i * p + k] * z[k];
        }
        z[i] = s / l[i * p + i];
    }
    let mut w = vec![0.0; p];
    for i in (0..p).rev() {
        let mut s = z[i];
        for k in i + 1..p {
            s -= l[k * p + i] * w[k];
        }
        w[i] = s / l[i * p + i];
    }
    w
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &FeatureMatrix, y: &[f64]) -> FitReport {
        let n = x.n_rows();
        let p = x.n_cols();
        if n == 0 {
            self.coefficients = vec![0.0; p];
            self.intercept = 0.0;
            return FitReport::closed_form();
        }

        let inv_n = 1.0 / n as f64;
        let y_mean = y.iter().sum::<f64>() * inv_n;
        let mut x_mean = vec![0.0; p];
        for row in x.rows() {
            for (m, v) in x_mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        x_mean.iter_mut().for_each(|m| *m *= inv_n);

        let mut xtx = vec![0.0; p * p];
        let mut xty = vec![0.0; p];
        let mut centered = vec![0.0; p];
        for (row, &yi) in x.rows().zip(y) {
            for j in 0..p {
                centered[j] = row[j] - x_mean[j];
            }
            let yc = yi - y_mean;
            for i in 0..p {
                xty[i] += centered[i] * yc;
                for j in 0..=i {
                    xtx[i * p + j] += centered[i] * centered[j];
                }
            }
        }
        for i in 0..p {
            for j in 0..i {
                xtx[j * p + i] = xtx[i * p + j];
            }
        }

        let mean_diag = (0..p).map(|i| xtx[i * p + i]).sum::<f64>() / p.max(1) as f64;
        let mut jitter = RELATIVE_JITTER * mean_diag.max(1.0);
        let mut weights = vec![0.0; p];
        for _ in 0..MAX_JITTER_ATTEMPTS {
            let mut a = xtx.clone();
            for i in 0..p {
                a[i * p + i] += jitter;
            }
            if cholesky(&mut a, p) {
                weights = cholesky_solve(&a, p, &xty);
                break;
            }
            jitter *= 10.0;
        }

        self.intercept = y_mean - weights.iter().zip(&x_mean).map(|(w, m)| w * m).sum::<f64>();
        self.coefficients = weights;
        FitReport::closed_form()
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        self.intercept + self.coefficients.iter().zip(row).map(|(w, v)| w * v).sum::<f64>()
    }
}
