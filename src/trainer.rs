//! Dual regressor trainer
//!
//! Fits one shared [`FittedTransformer`] on the training partition, then two
//! independent models of the same family: one for azimuth deviation and one
//! for inclination deviation. Both fits run in parallel over the same
//! immutable training matrix and are evaluated on the same held-out rows.

use std::sync::Arc;
use std::time::Instant;

use rand::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::defaults;
use crate::features::FittedTransformer;
use crate::models::{FitReport, Model, ModelFamily, ModelSettings, Regressor, UnsupportedFamily};
use crate::types::{Dataset, FeatureRow, Metrics, Target};

#[derive(Debug, Error, PartialEq)]
pub enum TrainError {
    #[error("Insufficient data: {rows} rows gives {train} training and {test} test rows")]
    InsufficientData { rows: usize, train: usize, test: usize },

    #[error(transparent)]
    UnsupportedFamily(#[from] UnsupportedFamily),

    #[error("Invalid training parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("Feature importances are not available for {0} models")]
    ImportanceUnavailable(ModelFamily),

    #[error("Feature width mismatch: model expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Knobs for one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingOptions {
    pub family: ModelFamily,
    /// Held-out fraction, strictly between 0 and 1
    pub test_fraction: f64,
    /// Seed for the train/test shuffle
    pub seed: u64,
    pub settings: ModelSettings,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            family: ModelFamily::RandomForest,
            test_fraction: defaults::TEST_FRACTION,
            seed: defaults::SPLIT_SEED,
            settings: ModelSettings::default(),
        }
    }
}

impl TrainingOptions {
    pub fn with_family(family: ModelFamily) -> Self {
        Self { family, ..Self::default() }
    }
}

// ============================================================================
// Train/Test Split
// ============================================================================

/// Row indices of each partition, in shuffled order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Seeded shuffle; the first `ceil(n * test_fraction)` indices form the test set.
pub fn split_indices(n: usize, test_fraction: f64, seed: u64) -> Result<DataSplit, TrainError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(TrainError::InvalidParameter {
            name: "test_fraction",
            value: test_fraction,
        });
    }
    let n_test = (n as f64 * test_fraction).ceil() as usize;
    let n_train = n.saturating_sub(n_test);
    if n < 2 || n_test == 0 || n_train == 0 {
        return Err(TrainError::InsufficientData {
            rows: n,
            train: n_train,
            test: n_test,
        });
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));
    let train = order.split_off(n_test);
    Ok(DataSplit { train, test: order })
}

// ============================================================================
// Metrics
// ============================================================================

pub fn rmse(truth: &[f64], predicted: &[f64]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let sse: f64 = truth.iter().zip(predicted).map(|(t, p)| (t - p).powi(2)).sum();
    (sse / truth.len() as f64).sqrt()
}

/// Coefficient of determination. A constant truth vector scores 1 when
/// predicted exactly and 0 otherwise.
pub fn r2_score(truth: &[f64], predicted: &[f64]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let mean = truth.iter().sum::<f64>() / truth.len() as f64;
    let ss_tot: f64 = truth.iter().map(|t| (t - mean).powi(2)).sum();
    let ss_res: f64 = truth.iter().zip(predicted).map(|(t, p)| (t - p).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

// ============================================================================
// Trained Pair
// ============================================================================

/// Two fitted models of one family sharing one transformer.
#[derive(Debug, Clone)]
pub struct TrainedModelPair {
    family: ModelFamily,
    transformer: Arc<FittedTransformer>,
    azimuth: Model,
    inclination: Model,
}

impl TrainedModelPair {
    pub fn family(&self) -> ModelFamily {
        self.family
    }

    pub fn transformer(&self) -> &FittedTransformer {
        &self.transformer
    }

    pub fn model(&self, target: Target) -> &Model {
        match target {
            Target::Azimuth => &self.azimuth,
            Target::Inclination => &self.inclination,
        }
    }

    /// Predicted (Δazimuth, Δinclination) for one row.
    pub fn predict<R: FeatureRow + ?Sized>(&self, row: &R) -> (f64, f64) {
        let encoded = self.transformer.transform_one(row);
        (
            self.azimuth.predict_row(&encoded),
            self.inclination.predict_row(&encoded),
        )
    }

    /// Predict from an already encoded feature vector.
    pub fn predict_encoded(&self, encoded: &[f64]) -> Result<(f64, f64), TrainError> {
        let expected = self.transformer.n_features();
        if encoded.len() != expected {
            return Err(TrainError::DimensionMismatch {
                expected,
                actual: encoded.len(),
            });
        }
        Ok((
            self.azimuth.predict_row(encoded),
            self.inclination.predict_row(encoded),
        ))
    }
}

/// Non-fatal condition raised while fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FitWarning {
    /// An iterative fit stopped at its cap; the partial model is kept.
    NumericNonConvergence {
        target: Target,
        family: ModelFamily,
        iterations: usize,
    },
}

impl std::fmt::Display for FitWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitWarning::NumericNonConvergence { target, family, iterations } => write!(
                f,
                "{family} model for {target} did not converge within {iterations} iterations"
            ),
        }
    }
}

/// Everything known about a training run besides the models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub family: ModelFamily,
    pub metrics: Metrics,
    pub seed: u64,
    pub train_rows: usize,
    pub test_rows: usize,
    pub warnings: Vec<FitWarning>,
    pub duration_ms: u64,
}

/// Train a family given by name (display spellings accepted).
pub fn train_named(
    dataset: &Dataset,
    family: &str,
    test_fraction: f64,
    seed: u64,
) -> Result<(TrainedModelPair, TrainingReport), TrainError> {
    let family: ModelFamily = family.parse()?;
    let options = TrainingOptions {
        family,
        test_fraction,
        seed,
        ..TrainingOptions::default()
    };
    train(dataset, &options)
}

/// Split, fit the shared transformer, fit both models in parallel and score
/// them on the held-out rows.
pub fn train(
    dataset: &Dataset,
    options: &TrainingOptions,
) -> Result<(TrainedModelPair, TrainingReport), TrainError> {
    let started = Instant::now();
    let split = split_indices(dataset.len(), options.test_fraction, options.seed)?;
    info!(
        family = %options.family,
        rows = dataset.len(),
        train = split.train.len(),
        test = split.test.len(),
        "Training deviation models"
    );

    let train_set = dataset.select(&split.train);
    let test_set = dataset.select(&split.test);

    let transformer = Arc::new(FittedTransformer::fit(&train_set));
    let x_train = transformer.transform_dataset(&train_set);
    let x_test = transformer.transform_dataset(&test_set);
    debug!(features = transformer.n_features(), "Transformer fitted");

    let y_az = train_set.target_column(Target::Azimuth);
    let y_inc = train_set.target_column(Target::Inclination);

    let mut azimuth = Model::new(options.family, &options.settings);
    let mut inclination = Model::new(options.family, &options.settings);
    let (az_fit, inc_fit) = rayon::join(
        || azimuth.fit(&x_train, &y_az),
        || inclination.fit(&x_train, &y_inc),
    );

    let mut warnings = Vec::new();
    for (target, fit) in [(Target::Azimuth, az_fit), (Target::Inclination, inc_fit)] {
        if let Some(w) = non_convergence(options.family, target, fit) {
            warn!(
                family = %options.family,
                target = %target,
                iterations = fit.iterations,
                "Fit stopped at iteration cap"
            );
            warnings.push(w);
        }
    }

    let az_true = test_set.target_column(Target::Azimuth);
    let inc_true = test_set.target_column(Target::Inclination);
    let az_pred = azimuth.predict(&x_test);
    let inc_pred = inclination.predict(&x_test);
    let metrics = Metrics {
        azimuth_rmse: rmse(&az_true, &az_pred),
        azimuth_r2: r2_score(&az_true, &az_pred),
        inclination_rmse: rmse(&inc_true, &inc_pred),
        inclination_r2: r2_score(&inc_true, &inc_pred),
    };

    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(
        family = %options.family,
        azimuth_r2 = metrics.azimuth_r2,
        inclination_r2 = metrics.inclination_r2,
        duration_ms,
        "Training complete"
    );

    let report = TrainingReport {
        family: options.family,
        metrics,
        seed: options.seed,
        train_rows: split.train.len(),
        test_rows: split.test.len(),
        warnings,
        duration_ms,
    };
    let pair = TrainedModelPair {
        family: options.family,
        transformer,
        azimuth,
        inclination,
    };
    Ok((pair, report))
}

fn non_convergence(family: ModelFamily, target: Target, fit: FitReport) -> Option<FitWarning> {
    (!fit.converged).then_some(FitWarning::NumericNonConvergence {
        target,
        family,
        iterations: fit.iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ForestConfig, MlpConfig};
    use crate::types::sample_record;

    fn linear_dataset(n: usize) -> Dataset {
        let liths = ["Granite", "Schist", "Gneiss"];
        (0..n)
            .map(|i| {
                let mut r = sample_record(100.0 + 9.0 * i as f64, liths[i % 3], "DrillPro");
                r.rotation_speed = 50.0 + (i * 37 % 150) as f64;
                r.deviation_azimuth = 0.05 * r.final_depth + 0.03 * r.rotation_speed;
                r.deviation_inclination = 0.03 * r.final_depth - 0.02 * r.rotation_speed;
                r
            })
            .collect()
    }

    #[test]
    fn test_split_sizes_and_coverage() {
        let split = split_indices(10, 0.2, 42).expect("split");
        assert_eq!(split.test.len(), 2);
        assert_eq!(split.train.len(), 8);
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
        // ceil: 11 * 0.2 = 2.2 -> 3 test rows
        assert_eq!(split_indices(11, 0.2, 42).expect("split").test.len(), 3);
    }

    #[test]
    fn test_split_is_seeded() {
        assert_eq!(split_indices(50, 0.2, 7), split_indices(50, 0.2, 7));
        assert_ne!(split_indices(50, 0.2, 7), split_indices(50, 0.2, 8));
    }

    #[test]
    fn test_split_rejects_tiny_or_invalid() {
        assert!(matches!(split_indices(1, 0.2, 0), Err(TrainError::InsufficientData { rows: 1, .. })));
        assert!(matches!(split_indices(0, 0.2, 0), Err(TrainError::InsufficientData { .. })));
        assert!(matches!(
            split_indices(10, 1.0, 0),
            Err(TrainError::InvalidParameter { name: "test_fraction", .. })
        ));
        assert!(matches!(split_indices(10, 0.0, 0), Err(TrainError::InvalidParameter { .. })));
        // two rows split into one and one
        let split = split_indices(2, 0.2, 0).expect("split");
        assert_eq!((split.train.len(), split.test.len()), (1, 1));
    }

    #[test]
    fn test_metric_edge_cases() {
        assert_eq!(rmse(&[1.0, 3.0], &[1.0, 1.0]), 2.0_f64.sqrt());
        assert_eq!(r2_score(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 1.0);
        assert_eq!(r2_score(&[2.0, 2.0], &[2.0, 2.0]), 1.0);
        assert_eq!(r2_score(&[2.0, 2.0], &[2.0, 3.0]), 0.0);
        assert!(r2_score(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]) < 0.0);
    }

    #[test]
    fn test_linear_training_is_deterministic() {
        let ds = linear_dataset(60);
        let options = TrainingOptions::with_family(ModelFamily::Linear);
        let (pair_a, report_a) = train(&ds, &options).expect("train");
        let (pair_b, report_b) = train(&ds, &options).expect("train");
        assert_eq!(report_a.metrics, report_b.metrics);
        assert_eq!(report_a.test_rows, 12);
        assert_eq!(report_a.train_rows, 48);
        assert!(report_a.warnings.is_empty());
        let first_row = &ds.records()[0];
        assert_eq!(pair_a.predict(first_row), pair_b.predict(first_row));

        let encoded = pair_a.transformer().transform_one(first_row);
        assert_eq!(pair_a.predict_encoded(&encoded), Ok(pair_a.predict(first_row)));
        assert_eq!(
            pair_a.predict_encoded(&[0.0]),
            Err(TrainError::DimensionMismatch { expected: encoded.len(), actual: 1 })
        );
    }

    #[test]
    fn test_linear_fits_exact_relationship() {
        let ds = linear_dataset(60);
        let (_, report) = train(&ds, &TrainingOptions::with_family(ModelFamily::Linear)).expect("train");
        assert!(report.metrics.azimuth_r2 > 0.999);
        assert!(report.metrics.inclination_r2 > 0.999);
        assert!(report.metrics.azimuth_rmse < 1e-3);
    }

    #[test]
    fn test_unsupported_family_name() {
        let err = train_named(&linear_dataset(10), "xgboost", 0.2, 42).unwrap_err();
        assert!(matches!(err, TrainError::UnsupportedFamily(_)));
    }

    #[test]
    fn test_named_family_aliases() {
        let (pair, _) = train_named(&linear_dataset(20), "Linear Regression", 0.2, 42).expect("train");
        assert_eq!(pair.family(), ModelFamily::Linear);
    }

    #[test]
    fn test_capped_iterative_fit_warns_but_returns_model() {
        let ds = linear_dataset(40);
        let options = TrainingOptions {
            family: ModelFamily::Mlp,
            settings: ModelSettings {
                mlp: MlpConfig { hidden_layers: vec![4], max_iter: 2, ..MlpConfig::default() },
                ..ModelSettings::default()
            },
            ..TrainingOptions::default()
        };
        let (pair, report) = train(&ds, &options).expect("train");
        assert_eq!(report.warnings.len(), 2);
        assert!(matches!(
            report.warnings[0],
            FitWarning::NumericNonConvergence { target: Target::Azimuth, iterations: 2, .. }
        ));
        let (az, inc) = pair.predict(&ds.records()[0]);
        assert!(az.is_finite() && inc.is_finite());
    }

    #[test]
    fn test_forest_pair_shares_transformer() {
        let ds = linear_dataset(30);
        let options = TrainingOptions {
            settings: ModelSettings {
                forest: ForestConfig { n_trees: 5, ..ForestConfig::default() },
                ..ModelSettings::default()
            },
            ..TrainingOptions::default()
        };
        let (pair, report) = train(&ds, &options).expect("train");
        assert_eq!(pair.family(), ModelFamily::RandomForest);
        assert!(report.warnings.is_empty());
        let width = pair.transformer().n_features();
        for t in Target::ALL {
            assert_eq!(pair.model(t).feature_importances().map(<[f64]>::len), Some(width));
        }
    }
}
