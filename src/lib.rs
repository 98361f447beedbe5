//! Drill-hole deviation prediction
//!
//! Learns how far a drill hole drifts from its planned azimuth and inclination
//! from historical holes, then simulates the deviated path of a planned hole.
//!
//! ## Architecture
//!
//! - **Analysis**: deviation summaries and field correlations before training
//! - **Augmentation**: noisy synthetic copies of small training tables
//! - **Features**: standardized numerics plus one-hot categories
//! - **Trainer**: one regressor per deviation axis, evaluated on a held-out split
//! - **Trajectory**: straight-line path interpolation in 3D
//! - **Prediction**: deltas, trajectory and recommendation tier for a planned hole

pub mod config;
pub mod types;
pub mod analysis;
pub mod augmentation;
pub mod features;
pub mod models;
pub mod trainer;
pub mod importance;
pub mod trajectory;
pub mod prediction;
pub mod session;
pub mod demo;
pub mod ingest;

// Re-export configuration
pub use config::PredictorConfig;

// Re-export commonly used types
pub use types::{
    CategoricalFeature, Dataset, DrillRecord, FeatureImportance, FeatureRow, FitQuality, Metrics,
    NumericFeature, PerformanceTier, RecommendationThresholds, RecommendationTier, Target,
};

pub use analysis::{explore, ExplorationReport};
pub use augmentation::{augment, AugmentError, AugmentationParams, AugmentedDataset};
pub use features::{FeatureMatrix, FittedTransformer};
pub use models::{Model, ModelFamily, Regressor};
pub use trainer::{train, train_named, TrainError, TrainedModelPair, TrainingOptions, TrainingReport};
pub use trajectory::{simulate, Trajectory, TrajectoryError, TrajectorySummary};
pub use prediction::{predict, predict_with_thresholds, DeviationReport, PlannedHole, Prediction};
pub use session::Session;
