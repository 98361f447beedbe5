//! Predictor Configuration Module
//!
//! Model families, hyperparameters, augmentation, recommendation thresholds
//! and CSV column aliases, all loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `DEVIATION_CONFIG` environment variable (path to TOML file)
//! 2. `deviation_config.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! ```ignore
//! // In main():
//! config::init(PredictorConfig::load());
//!
//! // Anywhere else:
//! let options = config::get().training_options();
//! ```

mod predictor_config;
pub mod defaults;
pub mod validation;

pub use predictor_config::*;

use std::sync::OnceLock;

static PREDICTOR_CONFIG: OnceLock<PredictorConfig> = OnceLock::new();

/// Install the process-wide configuration. Later calls are ignored.
pub fn init(config: PredictorConfig) {
    if PREDICTOR_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// The process-wide configuration; built-in defaults if `init()` never ran.
pub fn get() -> &'static PredictorConfig {
    PREDICTOR_CONFIG.get_or_init(PredictorConfig::default)
}
