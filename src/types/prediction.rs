//! Model evaluation and prediction output types

use serde::{Deserialize, Serialize};

use crate::config::defaults;

/// Held-out evaluation of both deviation models.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub azimuth_rmse: f64,
    pub azimuth_r2: f64,
    pub inclination_rmse: f64,
    pub inclination_r2: f64,
}

impl Metrics {
    /// Mean of the azimuth and inclination R².
    pub fn mean_r2(&self) -> f64 {
        (self.azimuth_r2 + self.inclination_r2) / 2.0
    }
}

/// Qualitative fit band used when presenting R² values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitQuality {
    /// R² > 0.7
    Good,
    /// 0.5 < R² <= 0.7
    Fair,
    Poor,
}

impl FitQuality {
    pub fn from_r2(r2: f64) -> Self {
        if r2 > 0.7 {
            FitQuality::Good
        } else if r2 > 0.5 {
            FitQuality::Fair
        } else {
            FitQuality::Poor
        }
    }
}

/// Overall reading of a trained pair, from the mean of both R² values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTier {
    Limited,
    /// mean R² > 0.5
    Moderate,
    /// mean R² > 0.7
    Good,
    /// mean R² > 0.8
    Excellent,
}

impl PerformanceTier {
    pub fn from_mean_r2(mean_r2: f64) -> Self {
        if mean_r2 > 0.8 {
            PerformanceTier::Excellent
        } else if mean_r2 > 0.7 {
            PerformanceTier::Good
        } else if mean_r2 > 0.5 {
            PerformanceTier::Moderate
        } else {
            PerformanceTier::Limited
        }
    }

    pub fn from_metrics(metrics: &Metrics) -> Self {
        Self::from_mean_r2(metrics.mean_r2())
    }

    pub fn label(self) -> &'static str {
        match self {
            PerformanceTier::Excellent => "Excellent",
            PerformanceTier::Good => "Good",
            PerformanceTier::Moderate => "Moderate",
            PerformanceTier::Limited => "Limited",
        }
    }

    /// How far the predictions can be trusted for planning.
    pub fn advice(self) -> &'static str {
        match self {
            PerformanceTier::Excellent => {
                "The model captures the factors driving deviation very well; predictions can be used with high confidence for hole planning."
            }
            PerformanceTier::Good => {
                "The model captures the main deviation trends; predictions are reliable for most drilling conditions."
            }
            PerformanceTier::Moderate => {
                "The model captures general trends but lacks precision in some cases; use predictions as indicators and plan safety margins."
            }
            PerformanceTier::Limited => {
                "The model struggles with the factors driving deviation; use predictions with caution, additional inputs may be needed."
            }
        }
    }
}

/// Relative contribution of one expanded feature to each model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    /// Expanded feature name (transformer output column)
    pub feature: String,
    pub azimuth: f64,
    pub inclination: f64,
}

// ============================================================================
// Recommendation Tiers
// ============================================================================

/// Angular magnitude thresholds (degrees) separating recommendation tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationThresholds {
    /// Magnitudes at or above this are at least `Moderate`
    pub moderate_deg: f64,
    /// Magnitudes at or above this are `High`
    pub high_deg: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            moderate_deg: defaults::MODERATE_DEVIATION_DEG,
            high_deg: defaults::HIGH_DEVIATION_DEG,
        }
    }
}

/// Severity of the predicted deviation, driving the advisory actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationTier {
    Low,
    Moderate,
    High,
}

impl RecommendationTier {
    /// Classify `sqrt(Δaz² + Δinc²)` against the thresholds.
    pub fn from_magnitude(magnitude: f64, thresholds: &RecommendationThresholds) -> Self {
        if magnitude < thresholds.moderate_deg {
            RecommendationTier::Low
        } else if magnitude < thresholds.high_deg {
            RecommendationTier::Moderate
        } else {
            RecommendationTier::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RecommendationTier::Low => "Low deviation",
            RecommendationTier::Moderate => "Moderate deviation",
            RecommendationTier::High => "High deviation",
        }
    }

    /// Field actions suggested for this tier.
    pub fn actions(self) -> &'static [&'static str] {
        match self {
            RecommendationTier::Low => &[
                "Predicted deviation is low; no particular adjustment is required.",
                "Drill according to the planned parameters.",
                "Check hole orientation at regular intervals.",
            ],
            RecommendationTier::Moderate => &[
                "Moderate deviation expected; consider preventive adjustments.",
                "Apply a slight compensation to the collar orientation.",
                "Schedule more frequent orientation surveys while drilling.",
                "Reduce rotation speed through critical intervals.",
            ],
            RecommendationTier::High => &[
                "Significant deviation expected; corrective measures are required.",
                "Offset the collar orientation to compensate for the predicted drift.",
                "Add stabilisers to hold the trajectory.",
                "Consider directional drilling techniques where available.",
                "Survey orientation very frequently.",
            ],
        }
    }
}

impl std::fmt::Display for RecommendationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
