//! Random forest regressor
//!
//! Bootstrap ensemble of CART regression trees grown with the exact-greedy
//! variance-reduction criterion. Trees are independent, so they are grown on
//! the rayon pool; each tree draws its bootstrap sample from its own seed,
//! derived up front from the forest seed, so results do not depend on thread
//! scheduling.

use rand::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{FitReport, Regressor};
use crate::features::FeatureMatrix;

/// Feature values closer than this are treated as equal when placing thresholds.
const FEATURE_TIE_EPSILON: f64 = 1e-7;

/// Forest hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees
    pub n_trees: usize,
    /// Maximum tree depth (None = grow until leaves are pure or too small)
    pub max_depth: Option<usize>,
    /// Minimum samples required to split an internal node
    pub min_samples_split: usize,
    /// Minimum samples required in each child
    pub min_samples_leaf: usize,
    /// Draw a bootstrap sample per tree (otherwise every tree sees all rows)
    pub bootstrap: bool,
    /// Seed for the per-tree bootstrap draws
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
            seed: 42,
        }
    }
}

// ============================================================================
// Tree
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// One fitted regression tree. Node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    /// Total squared-error decrease attributed to each feature
    importances: Vec<f64>,
}

impl RegressionTree {
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split { feature, threshold, left, right } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct TreeBuilder<'a> {
    x: &'a FeatureMatrix,
    y: &'a [f64],
    config: &'a ForestConfig,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl<'a> TreeBuilder<'a> {
    fn new(x: &'a FeatureMatrix, y: &'a [f64], config: &'a ForestConfig) -> Self {
        Self {
            x,
            y,
            config,
            nodes: Vec::new(),
            importances: vec![0.0; x.n_cols()],
        }
    }

    fn build(mut self, indices: &[usize]) -> RegressionTree {
        if indices.is_empty() {
            self.nodes.push(Node::Leaf { value: 0.0 });
        } else {
            self.build_node(indices, 0);
        }
        RegressionTree {
            nodes: self.nodes,
            importances: self.importances,
        }
    }

    fn build_node(&mut self, indices: &[usize], depth: usize) -> usize {
        let current = self.nodes.len();
        let n = indices.len() as f64;
        let sum: f64 = indices.iter().map(|&i| self.y[i]).sum();
        let sum_sq: f64 = indices.iter().map(|&i| self.y[i] * self.y[i]).sum();
        let leaf_value = sum / n;
        let node_sse = sum_sq - sum * sum / n;

        let depth_reached = self.config.max_depth.is_some_and(|d| depth >= d);
        if depth_reached
            || indices.len() < self.config.min_samples_split.max(2)
            || indices.len() < 2 * self.config.min_samples_leaf.max(1)
            || node_sse <= 1e-12 * (1.0 + sum_sq)
        {
            self.nodes.push(Node::Leaf { value: leaf_value });
            return current;
        }

        let Some(split) = self.find_best_split(indices, sum) else {
            self.nodes.push(Node::Leaf { value: leaf_value });
            return current;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| self.x.get(i, split.feature) <= split.threshold);

        self.importances[split.feature] += split.gain;

        // Reserve the slot, patch child links once both subtrees exist.
        self.nodes.push(Node::Leaf { value: leaf_value });
        let left = self.build_node(&left_idx, depth + 1);
        let right = self.build_node(&right_idx, depth + 1);
        self.nodes[current] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        current
    }

    /// Exact-greedy search over every feature and every distinct threshold.
    ///
    /// Gain is the squared-error decrease `sum_l²/n_l + sum_r²/n_r - sum²/n`.
    fn find_best_split(&self, indices: &[usize], total_sum: f64) -> Option<SplitCandidate> {
        let n = indices.len();
        let min_leaf = self.config.min_samples_leaf.max(1);
        let parent_term = total_sum * total_sum / n as f64;
        let mut best: Option<SplitCandidate> = None;
        let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);

        for feature in 0..self.x.n_cols() {
            pairs.clear();
            pairs.extend(indices.iter().map(|&i| (self.x.get(i, feature), self.y[i])));
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            if pairs[n - 1].0 - pairs[0].0 <= FEATURE_TIE_EPSILON {
                continue;
            }

            let mut left_sum = 0.0;
            for i in 0..n - 1 {
                left_sum += pairs[i].1;
                let n_left = i + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                if pairs[i + 1].0 - pairs[i].0 <= FEATURE_TIE_EPSILON {
                    continue;
                }
                let right_sum = total_sum - left_sum;
                let gain = left_sum * left_sum / n_left as f64
                    + right_sum * right_sum / n_right as f64
                    - parent_term;
                if gain > 0.0 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: 0.5 * (pairs[i].0 + pairs[i + 1].0),
                        gain,
                    });
                }
            }
        }

        best
    }
}

// ============================================================================
// Forest
// ============================================================================

/// Bagged ensemble of regression trees. Prediction is the mean over trees.
#[derive(Debug, Clone)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<RegressionTree>,
    importances: Vec<f64>,
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            importances: Vec::new(),
        }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    /// Mean-decrease-in-impurity importances, one per feature column.
    ///
    /// Each tree's importances are normalized to sum to 1, averaged over the
    /// forest and renormalized. All zeros when no tree found a split.
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    fn aggregate_importances(trees: &[RegressionTree], n_features: usize) -> Vec<f64> {
        let mut total = vec![0.0; n_features];
        for tree in trees {
            let sum: f64 = tree.importances.iter().sum();
            if sum > 0.0 {
                for (acc, v) in total.iter_mut().zip(&tree.importances) {
                    *acc += v / sum;
                }
            }
        }
        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            total.iter_mut().for_each(|v| *v /= sum);
        }
        total
    }
}

impl Regressor for RandomForest {
    fn fit(&mut self, x: &FeatureMatrix, y: &[f64]) -> FitReport {
        let n = x.n_rows();
        let mut master = StdRng::seed_from_u64(self.config.seed);
        let seeds: Vec<u64> = (0..self.config.n_trees.max(1)).map(|_| master.gen()).collect();
        let config = &self.config;

        self.trees = seeds
            .into_par_iter()
            .map(|seed| {
                let indices: Vec<usize> = if config.bootstrap && n > 0 {
                    let mut rng = StdRng::seed_from_u64(seed);
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                TreeBuilder::new(x, y, config).build(&indices)
            })
            .collect();

        self.importances = Self::aggregate_importances(&self.trees, x.n_cols());
        FitReport::closed_form()
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / self.trees.len() as f64
    }
}
