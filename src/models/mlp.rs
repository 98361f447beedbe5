//! Multi-layer perceptron regressor
//!
//! Fully connected ReLU hidden layers with a linear output unit, trained on
//! half squared error plus an L2 penalty using mini-batch Adam.
//!
//! Parameters live in one flat buffer (per layer: weights row-major
//! `fan_in x fan_out`, then biases) so the optimizer updates them in a single
//! pass.
//!
//! Training stops when the epoch loss fails to improve by `tol` for more than
//! `n_iter_no_change` consecutive epochs, or at `max_iter` (reported as not
//! converged).

use rand::prelude::*;
use serde::{Deserialize, Serialize};

use super::{FitReport, Regressor};
use crate::features::FeatureMatrix;

const DEFAULT_MAX_BATCH: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlpConfig {
    /// Width of each hidden layer
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f64,
    /// L2 penalty on weights (not biases)
    pub alpha: f64,
    /// Mini-batch size; None uses min(200, n)
    pub batch_size: Option<usize>,
    /// Maximum epochs
    pub max_iter: usize,
    /// Minimum loss improvement that resets the patience counter
    pub tol: f64,
    /// Patience in epochs
    pub n_iter_no_change: usize,
    /// Seed for initialization and batch shuffling
    pub seed: u64,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![100, 50],
            learning_rate: 1e-3,
            alpha: 1e-4,
            batch_size: None,
            max_iter: 1000,
            tol: 1e-4,
            n_iter_no_change: 10,
            seed: 42,
        }
    }
}

// ============================================================================
// Adam Optimizer
// ============================================================================

/// Adam over a flat parameter vector.
#[derive(Debug, Clone)]
pub struct AdamOptimizer {
    pub lr: f64,
    /// First moment decay
    pub beta1: f64,
    /// Second moment decay
    pub beta2: f64,
    pub eps: f64,
    /// Total steps taken
    pub steps: u64,
    m: Vec<f64>,
    v: Vec<f64>,
}

impl AdamOptimizer {
    pub fn new(num_params: usize, lr: f64) -> Self {
        Self {
            lr,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            steps: 0,
            m: vec![0.0; num_params],
            v: vec![0.0; num_params],
        }
    }

    /// One bias-corrected update. `grads` must match the layout of `weights`.
    pub fn apply(&mut self, weights: &mut [f64], grads: &[f64]) {
        self.steps += 1;
        let t = self.steps as f64;
        let lr_t = self.lr * (1.0 - self.beta2.powf(t)).sqrt() / (1.0 - self.beta1.powf(t));

        for i in 0..weights.len() {
            let g = grads[i];
            self.m[i] = self.beta1 * self.m[i] + (1.0 - self.beta1) * g;
            self.v[i] = self.beta2 * self.v[i] + (1.0 - self.beta2) * g * g;
            weights[i] -= lr_t * self.m[i] / (self.v[i].sqrt() + self.eps);
        }
    }
}

// ============================================================================
// Network
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Layer {
    fan_in: usize,
    fan_out: usize,
    /// Offset of the weight block in the flat buffer
    w: usize,
    /// Offset of the bias block
    b: usize,
}

#[derive(Debug, Clone)]
pub struct MlpRegressor {
    config: MlpConfig,
    layers: Vec<Layer>,
    params: Vec<f64>,
    loss_curve: Vec<f64>,
}

impl MlpRegressor {
    pub fn new(config: MlpConfig) -> Self {
        Self {
            config,
            layers: Vec::new(),
            params: Vec::new(),
            loss_curve: Vec::new(),
        }
    }

    /// Epoch losses of the last fit (half MSE plus penalty).
    pub fn loss_curve(&self) -> &[f64] {
        &self.loss_curve
    }

    pub fn num_params(&self) -> usize {
        self.params.len()
    }

    /// Lay out the layers and draw Glorot-uniform weights and biases.
    fn initialize(&mut self, n_inputs: usize, rng: &mut StdRng) {
        let mut sizes = vec![n_inputs];
        sizes.extend(self.config.hidden_layers.iter().copied().filter(|&w| w > 0));
        sizes.push(1);

        self.layers.clear();
        let mut offset = 0;
        for pair in sizes.windows(2) {
            let (fan_in, fan_out) = (pair[0], pair[1]);
            self.layers.push(Layer { fan_in, fan_out, w: offset, b: offset + fan_in * fan_out });
            offset += fan_in * fan_out + fan_out;
        }

        self.params = Vec::with_capacity(offset);
        for layer in &self.layers {
            let bound = (6.0 / (layer.fan_in + layer.fan_out) as f64).sqrt();
            for _ in 0..layer.fan_in * layer.fan_out + layer.fan_out {
                self.params.push(rng.gen_range(-bound..bound));
            }
        }
    }

    /// Forward pass storing every layer's post-activation output.
    /// `acts[0]` is the input; the last entry holds the single prediction.
    fn forward(&self, row: &[f64], acts: &mut Vec<Vec<f64>>) {
        acts.resize(self.layers.len() + 1, Vec::new());
        acts[0].clear();
        acts[0].extend_from_slice(row);
        let last = self.layers.len() - 1;

        for (l, layer) in self.layers.iter().enumerate() {
            let (input, rest) = acts.split_at_mut(l + 1);
            let input = &input[l];
            let out = &mut rest[0];
            out.clear();
            out.extend_from_slice(&self.params[layer.b..layer.b + layer.fan_out]);
            for (i, &a) in input.iter().enumerate() {
                if a == 0.0 {
                    continue;
                }
                let w_row = &self.params[layer.w + i * layer.fan_out..layer.w + (i + 1) * layer.fan_out];
                for (o, w) in out.iter_mut().zip(w_row) {
                    *o += a * w;
                }
            }
            if l != last {
                out.iter_mut().for_each(|v| *v = v.max(0.0));
            }
        }
    }

    /// Accumulate gradients of one sample's loss into `grads`.
    /// `scale` is 1 / batch length.
    fn backward(&self, acts: &[Vec<f64>], target: f64, scale: f64, grads: &mut [f64]) -> f64 {
        let prediction = acts[self.layers.len()][0];
        let err = prediction - target;
        let mut delta = vec![err * scale];

        for (l, layer) in self.layers.iter().enumerate().rev() {
            let input = &acts[l];
            for (j, d) in delta.iter().enumerate() {
                grads[layer.b + j] += d;
            }
            for (i, &a) in input.iter().enumerate() {
                if a == 0.0 {
                    continue;
                }
                let g_row = &mut grads[layer.w + i * layer.fan_out..layer.w + (i + 1) * layer.fan_out];
                for (g, d) in g_row.iter_mut().zip(&delta) {
                    *g += a * d;
                }
            }
            if l > 0 {
                // ReLU derivative: active where the stored output is positive
                let mut prev = vec![0.0; layer.fan_in];
                for (i, p) in prev.iter_mut().enumerate() {
                    if input[i] > 0.0 {
                        let w_row = &self.params[layer.w + i * layer.fan_out..layer.w + (i + 1) * layer.fan_out];
                        *p = w_row.iter().zip(&delta).map(|(w, d)| w * d).sum();
                    }
                }
                delta = prev;
            }
        }

        0.5 * err * err
    }

    fn weight_penalty(&self) -> f64 {
        self.layers
            .iter()
            .map(|layer| {
                self.params[layer.w..layer.b].iter().map(|w| w * w).sum::<f64>()
            })
            .sum()
    }
}

impl Regressor for MlpRegressor {
    fn fit(&mut self, x: &FeatureMatrix, y: &[f64]) -> FitReport {
        let n = x.n_rows();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        self.initialize(x.n_cols(), &mut rng);
        self.loss_curve.clear();
        if n == 0 {
            return FitReport { iterations: 0, converged: true };
        }

        let batch_size = self.config.batch_size.unwrap_or(DEFAULT_MAX_BATCH).clamp(1, n);
        let alpha = self.config.alpha;
        let mut optimizer = AdamOptimizer::new(self.params.len(), self.config.learning_rate);
        let mut grads = vec![0.0; self.params.len()];
        let mut acts: Vec<Vec<f64>> = Vec::new();
        let mut order: Vec<usize> = (0..n).collect();

        let mut best_loss = f64::INFINITY;
        let mut no_improvement = 0;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.config.max_iter {
            iterations += 1;
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for batch in order.chunks(batch_size) {
                grads.iter_mut().for_each(|g| *g = 0.0);
                let scale = 1.0 / batch.len() as f64;
                let mut batch_loss = 0.0;
                for &i in batch {
                    self.forward(x.row(i), &mut acts);
                    batch_loss += self.backward(&acts, y[i], scale, &mut grads);
                }
                batch_loss = batch_loss * scale + 0.5 * alpha * self.weight_penalty() * scale;
                for layer in &self.layers {
                    for k in layer.w..layer.b {
                        grads[k] += alpha * self.params[k] * scale;
                    }
                }
                optimizer.apply(&mut self.params, &grads);
                epoch_loss += batch_loss * batch.len() as f64;
            }

            let epoch_loss = epoch_loss / n as f64;
            self.loss_curve.push(epoch_loss);

            if epoch_loss > best_loss - self.config.tol {
                no_improvement += 1;
            } else {
                no_improvement = 0;
            }
            if epoch_loss < best_loss {
                best_loss = epoch_loss;
            }
            if no_improvement > self.config.n_iter_no_change {
                converged = true;
                break;
            }
        }

        FitReport { iterations, converged }
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        if self.layers.is_empty() {
            return 0.0;
        }
        let mut acts = Vec::new();
        self.forward(row, &mut acts);
        acts[self.layers.len()][0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::{linear_problem, mse};

    fn small_config() -> MlpConfig {
        MlpConfig {
            hidden_layers: vec![16],
            learning_rate: 0.01,
            batch_size: Some(32),
            max_iter: 300,
            ..MlpConfig::default()
        }
    }

    #[test]
    fn test_learns_linear_target() {
        let (x, y) = linear_problem(200, 4);
        let mut mlp = MlpRegressor::new(small_config());
        mlp.fit(&x, &y);
        let err = mse(&mlp.predict(&x), &y);
        assert!(err < 0.1, "mse {err}");
        let curve = mlp.loss_curve();
        assert!(curve.last().unwrap() < curve.first().unwrap());
    }

    #[test]
    fn test_parameter_layout() {
        let (x, y) = linear_problem(10, 1);
        let mut mlp = MlpRegressor::new(MlpConfig { max_iter: 1, ..MlpConfig::default() });
        mlp.fit(&x, &y);
        // 2->100->50->1
        assert_eq!(mlp.num_params(), 2 * 100 + 100 + 100 * 50 + 50 + 50 + 1);
    }

    #[test]
    fn test_iteration_cap_reports_non_convergence() {
        let (x, y) = linear_problem(50, 2);
        let mut mlp = MlpRegressor::new(MlpConfig { max_iter: 3, ..small_config() });
        let report = mlp.fit(&x, &y);
        assert_eq!(report, FitReport { iterations: 3, converged: false });
        assert_eq!(mlp.loss_curve().len(), 3);
    }

    #[test]
    fn test_same_seed_same_network() {
        let (x, y) = linear_problem(60, 8);
        let config = MlpConfig { max_iter: 20, ..small_config() };
        let mut a = MlpRegressor::new(config.clone());
        let mut b = MlpRegressor::new(config);
        a.fit(&x, &y);
        b.fit(&x, &y);
        assert_eq!(a.predict(&x), b.predict(&x));
    }

    #[test]
    fn test_adam_moves_against_gradient() {
        let mut opt = AdamOptimizer::new(2, 0.1);
        let mut w = vec![1.0, -1.0];
        opt.apply(&mut w, &[1.0, -1.0]);
        assert!(w[0] < 1.0);
        assert!(w[1] > -1.0);
        assert_eq!(opt.steps, 1);
    }
}
