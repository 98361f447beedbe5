//! Config validation: unknown-key detection with Levenshtein suggestions
//! and value range checks.
//!
//! The raw TOML is first walked as a `toml::Value` tree and every dotted key
//! compared against the known field set; typos produce warnings with a
//! "did you mean?" hint. Serde deserialization then runs as normal, so
//! unknown keys never reject a file.

use std::collections::HashSet;

use super::defaults;
use super::PredictorConfig;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Every valid dotted key path of `PredictorConfig`.
///
/// Kept in step with the section structs by hand.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [training]
        "training",
        "training.family",
        "training.test_fraction",
        "training.seed",
        // [augmentation]
        "augmentation",
        "augmentation.enabled",
        "augmentation.samples",
        "augmentation.noise_level",
        "augmentation.vary_categories",
        "augmentation.seed",
        // [forest]
        "forest",
        "forest.n_trees",
        "forest.max_depth",
        "forest.min_samples_split",
        "forest.min_samples_leaf",
        "forest.bootstrap",
        "forest.seed",
        // [svr]
        "svr",
        "svr.c",
        "svr.epsilon",
        "svr.gamma",
        "svr.max_iter",
        "svr.tol",
        // [mlp]
        "mlp",
        "mlp.hidden_layers",
        "mlp.learning_rate",
        "mlp.alpha",
        "mlp.batch_size",
        "mlp.max_iter",
        "mlp.tol",
        "mlp.n_iter_no_change",
        "mlp.seed",
        // [trajectory]
        "trajectory",
        "trajectory.num_points",
        // [recommendation]
        "recommendation",
        "recommendation.moderate_deg",
        "recommendation.high_deg",
        // [columns]
        "columns",
        "columns.final_depth",
        "columns.initial_azimuth",
        "columns.initial_inclination",
        "columns.lithology",
        "columns.rotation_speed",
        "columns.drilling_company",
        "columns.deviation_azimuth",
        "columns.deviation_inclination",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively collect dotted key paths from a `toml::Value` tree.
///
/// `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Closest known key within edit distance 3, ties broken alphabetically.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|&(dist, _)| dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Warnings for every unknown key in a raw TOML string.
///
/// Syntax errors yield no warnings here; serde reports them afterwards.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

/// Check value ranges on a parsed config.
///
/// Errors are values no run could use; warnings are accepted but unusual.
pub fn validate_ranges(config: &PredictorConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let t = &config.training;
    if !(t.test_fraction > 0.0 && t.test_fraction < 1.0) {
        errors.push(format!(
            "training.test_fraction = {} must lie strictly between 0 and 1",
            t.test_fraction
        ));
    }

    let a = &config.augmentation;
    if !(a.noise_level > 0.0 && a.noise_level.is_finite()) {
        errors.push(format!(
            "augmentation.noise_level = {} must be positive",
            a.noise_level
        ));
    } else if a.noise_level > defaults::NOISE_LEVEL_WARN_ABOVE {
        warnings.push(ValidationWarning {
            field: "augmentation.noise_level".to_string(),
            message: format!(
                "augmentation.noise_level = {} exceeds one field std; synthetic rows will be mostly noise",
                a.noise_level
            ),
            suggestion: None,
        });
    }
    if a.enabled && a.samples == 0 {
        warnings.push(ValidationWarning {
            field: "augmentation.samples".to_string(),
            message: "augmentation is enabled with samples = 0".to_string(),
            suggestion: None,
        });
    }

    if config.forest.n_trees == 0 {
        errors.push("forest.n_trees must be at least 1".to_string());
    }
    if config.forest.min_samples_leaf == 0 {
        errors.push("forest.min_samples_leaf must be at least 1".to_string());
    }
    if config.forest.max_depth == Some(0) {
        errors.push("forest.max_depth must be at least 1 when set".to_string());
    }

    let s = &config.svr;
    if !(s.c > 0.0) {
        errors.push(format!("svr.c = {} must be positive", s.c));
    }
    if !(s.epsilon >= 0.0) {
        errors.push(format!("svr.epsilon = {} must be non-negative", s.epsilon));
    }
    if let Some(gamma) = s.gamma {
        if !(gamma > 0.0) {
            errors.push(format!("svr.gamma = {gamma} must be positive when set"));
        }
    }

    let m = &config.mlp;
    if !(m.learning_rate > 0.0) {
        errors.push(format!("mlp.learning_rate = {} must be positive", m.learning_rate));
    }
    if m.alpha < 0.0 {
        errors.push(format!("mlp.alpha = {} must be non-negative", m.alpha));
    }
    if m.hidden_layers.iter().any(|&w| w == 0) {
        errors.push("mlp.hidden_layers entries must be at least 1".to_string());
    }
    if m.batch_size == Some(0) {
        errors.push("mlp.batch_size must be at least 1 when set".to_string());
    }

    if config.trajectory.num_points < 2 {
        warnings.push(ValidationWarning {
            field: "trajectory.num_points".to_string(),
            message: format!(
                "trajectory.num_points = {} is below 2; trajectories will use 2 points",
                config.trajectory.num_points
            ),
            suggestion: None,
        });
    }

    let r = &config.recommendation;
    if !(r.moderate_deg >= 0.0 && r.moderate_deg < r.high_deg) {
        errors.push(format!(
            "recommendation thresholds must satisfy 0 <= moderate_deg < high_deg (got {} / {})",
            r.moderate_deg, r.high_deg
        ));
    }

    let c = &config.columns;
    for (name, aliases) in [
        ("final_depth", &c.final_depth),
        ("initial_azimuth", &c.initial_azimuth),
        ("initial_inclination", &c.initial_inclination),
        ("lithology", &c.lithology),
        ("rotation_speed", &c.rotation_speed),
        ("drilling_company", &c.drilling_company),
        ("deviation_azimuth", &c.deviation_azimuth),
        ("deviation_inclination", &c.deviation_inclination),
    ] {
        if aliases.iter().all(|a| a.trim().is_empty()) {
            errors.push(format!("columns.{name} needs at least one column name"));
        }
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
