//! Predictor configuration
//!
//! Loaded from TOML with every field defaulted, so a partial file (or none at
//! all) is always valid:
//!
//! ```toml
//! [training]
//! family = "random_forest"
//! test_fraction = 0.2
//!
//! [augmentation]
//! enabled = true
//! samples = 800
//!
//! [forest]
//! n_trees = 200
//!
//! [columns]
//! final_depth = ["Depth_m", "final_depth"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::defaults;
use crate::augmentation::AugmentationParams;
use crate::ingest::ColumnMapping;
use crate::models::{ForestConfig, MlpConfig, ModelFamily, ModelSettings, SvrConfig};
use crate::trainer::TrainingOptions;
use crate::types::RecommendationThresholds;

/// Complete predictor configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictorConfig {
    #[serde(default)]
    pub training: TrainingSection,

    #[serde(default)]
    pub augmentation: AugmentationSection,

    #[serde(default)]
    pub forest: ForestConfig,

    #[serde(default)]
    pub svr: SvrConfig,

    #[serde(default)]
    pub mlp: MlpConfig,

    #[serde(default)]
    pub trajectory: TrajectorySection,

    #[serde(default)]
    pub recommendation: RecommendationThresholds,

    #[serde(default)]
    pub columns: ColumnMapping,
}

impl PredictorConfig {
    /// Load configuration using the standard search order:
    /// `$DEVIATION_CONFIG`, then `./deviation_config.toml`, then defaults.
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(defaults::CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), family = %config.training.family, "Loaded config from DEVIATION_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from DEVIATION_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "DEVIATION_CONFIG points to non-existent file, falling back");
            }
        }

        // 2. Check ./deviation_config.toml
        let local = PathBuf::from(defaults::LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(family = %config.training.family, "Loaded config from ./deviation_config.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./deviation_config.toml, using defaults");
                }
            }
        }

        // 3. Defaults
        info!("No deviation_config.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse and validate TOML text. Unknown keys only warn.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Predictor config saved");
        Ok(())
    }

    /// Reject impossible values; suspicious ones are logged.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (errors, warnings) = super::validation::validate_ranges(self);
        for w in &warnings {
            warn!("{}", w);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Per-family hyperparameters as the trainer consumes them.
    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            forest: self.forest.clone(),
            svr: self.svr.clone(),
            mlp: self.mlp.clone(),
        }
    }

    pub fn training_options(&self) -> TrainingOptions {
        TrainingOptions {
            family: self.training.family,
            test_fraction: self.training.test_fraction,
            seed: self.training.seed,
            settings: self.model_settings(),
        }
    }

    pub fn augmentation_params(&self) -> AugmentationParams {
        AugmentationParams {
            count: self.augmentation.samples,
            noise_level: self.augmentation.noise_level,
            vary_categories: self.augmentation.vary_categories,
            seed: self.augmentation.seed,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Sections
// ============================================================================

/// `[training]`: model family and evaluation split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSection {
    #[serde(default = "default_family")]
    pub family: ModelFamily,

    /// Held-out fraction, strictly between 0 and 1
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,

    #[serde(default = "default_split_seed")]
    pub seed: u64,
}

impl Default for TrainingSection {
    fn default() -> Self {
        Self {
            family: default_family(),
            test_fraction: default_test_fraction(),
            seed: default_split_seed(),
        }
    }
}

fn default_family() -> ModelFamily {
    ModelFamily::RandomForest
}
fn default_test_fraction() -> f64 {
    defaults::TEST_FRACTION
}
fn default_split_seed() -> u64 {
    defaults::SPLIT_SEED
}

/// `[augmentation]`: synthetic sample generation before training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugmentationSection {
    /// Augment the training table before fitting
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_samples")]
    pub samples: usize,

    #[serde(default = "default_noise_level")]
    pub noise_level: f64,

    #[serde(default = "default_true")]
    pub vary_categories: bool,

    #[serde(default = "default_augmentation_seed")]
    pub seed: u64,
}

impl Default for AugmentationSection {
    fn default() -> Self {
        Self {
            enabled: false,
            samples: default_samples(),
            noise_level: default_noise_level(),
            vary_categories: true,
            seed: default_augmentation_seed(),
        }
    }
}

fn default_samples() -> usize {
    defaults::AUGMENTED_SAMPLES
}
fn default_noise_level() -> f64 {
    defaults::NOISE_LEVEL
}
fn default_true() -> bool {
    true
}
fn default_augmentation_seed() -> u64 {
    defaults::AUGMENTATION_SEED
}

/// `[trajectory]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySection {
    #[serde(default = "default_num_points")]
    pub num_points: usize,
}

impl Default for TrajectorySection {
    fn default() -> Self {
        Self { num_points: default_num_points() }
    }
}

fn default_num_points() -> usize {
    defaults::TRAJECTORY_POINTS
}
