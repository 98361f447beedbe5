//! Default constants shared by the library defaults and the config layer.
//!
//! Grouped by subsystem.

// ============================================================================
// Config Discovery
// ============================================================================

/// Environment variable holding an explicit config path.
pub const CONFIG_ENV_VAR: &str = "DEVIATION_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "deviation_config.toml";

// ============================================================================
// Training
// ============================================================================

/// Held-out fraction for evaluation.
pub const TEST_FRACTION: f64 = 0.2;

/// Seed for the train/test shuffle.
pub const SPLIT_SEED: u64 = 42;

// ============================================================================
// Augmentation
// ============================================================================

/// Synthetic rows appended per augmentation run.
pub const AUGMENTED_SAMPLES: usize = 500;

/// Noise std as a fraction of each field's std.
pub const NOISE_LEVEL: f64 = 0.1;

/// Seed for augmentation draws.
pub const AUGMENTATION_SEED: u64 = 42;

/// Noise levels above this are accepted but flagged.
pub const NOISE_LEVEL_WARN_ABOVE: f64 = 1.0;

// ============================================================================
// Trajectory & Recommendation
// ============================================================================

/// Samples along a simulated hole.
pub const TRAJECTORY_POINTS: usize = 100;

/// Magnitude (°) from which a deviation is Moderate.
pub const MODERATE_DEVIATION_DEG: f64 = 5.0;

/// Magnitude (°) from which a deviation is High.
pub const HIGH_DEVIATION_DEG: f64 = 15.0;
