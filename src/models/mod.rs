//! Regression model families.
//!
//! Four interchangeable strategies behind one [`Regressor`] seam:
//!
//! - `forest`: bootstrap ensemble of CART regression trees (exposes
//!   impurity-based feature importances)
//! - `svr`: epsilon-insensitive support vector regression, RBF kernel
//! - `linear`: ordinary least squares with intercept
//! - `mlp`: feed-forward ReLU network trained with Adam
//!
//! The family is a configuration value ([`ModelFamily`]); [`Model`] is the
//! tagged variant the trainer holds.

pub mod forest;
pub mod linear;
pub mod mlp;
pub mod svr;

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::FeatureMatrix;

pub use forest::{ForestConfig, RandomForest};
pub use linear::LinearRegression;
pub use mlp::{MlpConfig, MlpRegressor};
pub use svr::{SvrConfig, SvrRegressor};

// ============================================================================
// Family Selection
// ============================================================================

/// Closed set of supported regression strategies.
///
/// Serializes as the canonical name; deserializes through [`FromStr`], so
/// config files may also use the display spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum ModelFamily {
    RandomForest,
    Svr,
    Linear,
    Mlp,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 4] = [
        ModelFamily::RandomForest,
        ModelFamily::Svr,
        ModelFamily::Linear,
        ModelFamily::Mlp,
    ];

    /// Canonical configuration name.
    pub fn name(self) -> &'static str {
        match self {
            ModelFamily::RandomForest => "random_forest",
            ModelFamily::Svr => "svr",
            ModelFamily::Linear => "linear",
            ModelFamily::Mlp => "mlp",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ModelFamily::RandomForest => "Random Forest",
            ModelFamily::Svr => "Support Vector Regression",
            ModelFamily::Linear => "Linear Regression",
            ModelFamily::Mlp => "Neural Network",
        }
    }

    /// Whether fitted models of this family report feature importances.
    pub fn supports_importance(self) -> bool {
        matches!(self, ModelFamily::RandomForest)
    }
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A model family name outside the supported set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unsupported model family '{0}' (expected one of: random_forest, svr, linear, mlp)")]
pub struct UnsupportedFamily(pub String);

impl FromStr for ModelFamily {
    type Err = UnsupportedFamily;

    /// Accepts canonical names and the common display spellings
    /// ("Random Forest", "SVM", "Linear Regression", "Neural Network", ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match key.as_str() {
            "randomforest" | "rf" | "forest" => Ok(ModelFamily::RandomForest),
            "svr" | "svm" | "supportvectorregression" => Ok(ModelFamily::Svr),
            "linear" | "linearregression" | "ols" => Ok(ModelFamily::Linear),
            "mlp" | "neuralnetwork" | "nn" => Ok(ModelFamily::Mlp),
            _ => Err(UnsupportedFamily(s.to_string())),
        }
    }
}

impl TryFrom<String> for ModelFamily {
    type Error = UnsupportedFamily;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// ============================================================================
// Regressor Seam
// ============================================================================

/// Outcome of a numerical fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitReport {
    /// Iterations (epochs, sweeps) actually run; 1 for closed-form fits
    pub iterations: usize,
    /// False when an iterative fit stopped at its cap
    pub converged: bool,
}

impl FitReport {
    pub fn closed_form() -> Self {
        Self { iterations: 1, converged: true }
    }
}

/// Single-output regression strategy.
pub trait Regressor {
    /// Fit on `x` (rows = samples) against `y`. Refitting replaces prior state.
    fn fit(&mut self, x: &FeatureMatrix, y: &[f64]) -> FitReport;

    /// Predict one encoded row.
    fn predict_row(&self, row: &[f64]) -> f64;

    /// Predict every row of `x`.
    fn predict(&self, x: &FeatureMatrix) -> Vec<f64> {
        x.rows().map(|row| self.predict_row(row)).collect()
    }
}

/// Per-family hyperparameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default)]
    pub forest: ForestConfig,
    #[serde(default)]
    pub svr: SvrConfig,
    #[serde(default)]
    pub mlp: MlpConfig,
}

/// A regressor of one of the supported families.
#[derive(Debug, Clone)]
pub enum Model {
    RandomForest(RandomForest),
    Svr(SvrRegressor),
    Linear(LinearRegression),
    Mlp(MlpRegressor),
}

impl Model {
    /// Unfitted model of `family` configured from `settings`.
    pub fn new(family: ModelFamily, settings: &ModelSettings) -> Self {
        match family {
            ModelFamily::RandomForest => Model::RandomForest(RandomForest::new(settings.forest.clone())),
            ModelFamily::Svr => Model::Svr(SvrRegressor::new(settings.svr.clone())),
            ModelFamily::Linear => Model::Linear(LinearRegression::new()),
            ModelFamily::Mlp => Model::Mlp(MlpRegressor::new(settings.mlp.clone())),
        }
    }

    pub fn family(&self) -> ModelFamily {
        match self {
            Model::RandomForest(_) => ModelFamily::RandomForest,
            Model::Svr(_) => ModelFamily::Svr,
            Model::Linear(_) => ModelFamily::Linear,
            Model::Mlp(_) => ModelFamily::Mlp,
        }
    }

    /// Normalized impurity importances, for families that support them.
    pub fn feature_importances(&self) -> Option<&[f64]> {
        match self {
            Model::RandomForest(forest) => Some(forest.feature_importances()),
            _ => None,
        }
    }
}

impl Regressor for Model {
    fn fit(&mut self, x: &FeatureMatrix, y: &[f64]) -> FitReport {
        match self {
            Model::RandomForest(m) => m.fit(x, y),
            Model::Svr(m) => m.fit(x, y),
            Model::Linear(m) => m.fit(x, y),
            Model::Mlp(m) => m.fit(x, y),
        }
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        match self {
            Model::RandomForest(m) => m.predict_row(row),
            Model::Svr(m) => m.predict_row(row),
            Model::Linear(m) => m.predict_row(row),
            Model::Mlp(m) => m.predict_row(row),
        }
    }
}
