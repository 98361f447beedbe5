//! Deviation prediction for a planned hole
//!
//! Combines a trained model pair with the trajectory simulator and classifies
//! the predicted angular drift into a recommendation tier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::defaults;
use crate::models::ModelFamily;
use crate::trainer::TrainedModelPair;
use crate::trajectory::{self, Trajectory, TrajectoryError, TrajectorySummary};
use crate::types::{
    CategoricalFeature, FeatureRow, Metrics, NumericFeature, RecommendationThresholds,
    RecommendationTier, DEFAULT_COMPANY, DEFAULT_LITHOLOGY,
};

/// Trajectory resolution used when none is configured.
pub const DEFAULT_TRAJECTORY_POINTS: usize = defaults::TRAJECTORY_POINTS;

/// Planned parameters of a hole not yet drilled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedHole {
    /// Final depth (m)
    pub final_depth: f64,
    /// Collar azimuth (degrees)
    pub initial_azimuth: f64,
    /// Collar inclination (degrees)
    pub initial_inclination: f64,
    #[serde(default)]
    pub lithology: Option<String>,
    /// Rotation speed (rpm)
    pub rotation_speed: f64,
    #[serde(default)]
    pub drilling_company: Option<String>,
}

impl PlannedHole {
    fn label<'a>(value: Option<&'a String>, default: &'static str) -> &'a str {
        match value {
            Some(v) if !v.trim().is_empty() => v,
            _ => default,
        }
    }
}

impl FeatureRow for PlannedHole {
    fn numeric_feature(&self, field: NumericFeature) -> f64 {
        match field {
            NumericFeature::FinalDepth => self.final_depth,
            NumericFeature::InitialAzimuth => self.initial_azimuth,
            NumericFeature::InitialInclination => self.initial_inclination,
            NumericFeature::RotationSpeed => self.rotation_speed,
        }
    }

    fn categorical_feature(&self, field: CategoricalFeature) -> &str {
        match field {
            CategoricalFeature::Lithology => Self::label(self.lithology.as_ref(), DEFAULT_LITHOLOGY),
            CategoricalFeature::DrillingCompany => {
                Self::label(self.drilling_company.as_ref(), DEFAULT_COMPANY)
            }
        }
    }
}

/// Model output for one planned hole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub delta_azimuth: f64,
    pub delta_inclination: f64,
    /// Degrees, in [0, 360)
    pub final_azimuth: f64,
    /// Degrees, in [-90, 0]
    pub final_inclination: f64,
    pub trajectory: Trajectory,
    pub summary: TrajectorySummary,
    /// End-of-hole offset from the undeviated hole (m)
    pub deviation_distance: f64,
    /// sqrt(Δaz² + Δinc²) in degrees
    pub deviation_magnitude: f64,
    pub recommendation: RecommendationTier,
}

/// Predict with the default recommendation thresholds.
pub fn predict(
    pair: &TrainedModelPair,
    hole: &PlannedHole,
    num_points: usize,
) -> Result<Prediction, TrajectoryError> {
    predict_with_thresholds(pair, hole, num_points, &RecommendationThresholds::default())
}

pub fn predict_with_thresholds(
    pair: &TrainedModelPair,
    hole: &PlannedHole,
    num_points: usize,
    thresholds: &RecommendationThresholds,
) -> Result<Prediction, TrajectoryError> {
    let (delta_azimuth, delta_inclination) = pair.predict(hole);
    let (trajectory, summary) = trajectory::simulate(
        hole.initial_azimuth,
        hole.initial_inclination,
        hole.final_depth,
        delta_azimuth,
        delta_inclination,
        num_points,
    )?;
    let deviation_magnitude = delta_azimuth.hypot(delta_inclination);

    Ok(Prediction {
        delta_azimuth,
        delta_inclination,
        final_azimuth: summary.final_azimuth,
        final_inclination: summary.final_inclination,
        deviation_distance: summary.deviation_distance,
        deviation_magnitude,
        recommendation: RecommendationTier::from_magnitude(deviation_magnitude, thresholds),
        trajectory,
        summary,
    })
}

// ============================================================================
// Report
// ============================================================================

/// Everything needed to render a deviation report; formatting is up to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviationReport {
    pub generated_at: DateTime<Utc>,
    pub model_family: ModelFamily,
    pub planned: PlannedHole,
    /// Held-out metrics of the model pair, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    pub delta_azimuth: f64,
    pub delta_inclination: f64,
    pub final_azimuth: f64,
    pub final_inclination: f64,
    pub deviation_distance: f64,
    pub lateral_offset: f64,
    pub vertical_offset: f64,
    pub deviation_magnitude: f64,
    pub tier: RecommendationTier,
    pub tier_label: String,
    pub actions: Vec<String>,
}

impl DeviationReport {
    pub fn new(
        family: ModelFamily,
        planned: &PlannedHole,
        prediction: &Prediction,
        metrics: Option<Metrics>,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            model_family: family,
            planned: planned.clone(),
            metrics,
            delta_azimuth: prediction.delta_azimuth,
            delta_inclination: prediction.delta_inclination,
            final_azimuth: prediction.final_azimuth,
            final_inclination: prediction.final_inclination,
            deviation_distance: prediction.deviation_distance,
            lateral_offset: prediction.summary.lateral_offset,
            vertical_offset: prediction.summary.vertical_offset,
            deviation_magnitude: prediction.deviation_magnitude,
            tier: prediction.recommendation,
            tier_label: prediction.recommendation.label().to_string(),
            actions: prediction
                .recommendation
                .actions()
                .iter()
                .map(|a| (*a).to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelFamily;
    use crate::trainer::{train, TrainingOptions};
    use crate::types::{sample_record, Dataset};

    fn trained_pair() -> TrainedModelPair {
        let ds: Dataset = (0..50)
            .map(|i| {
                let lith = if i % 2 == 0 { "Granite" } else { "Schist" };
                sample_record(100.0 + 10.0 * i as f64, lith, "DrillPro")
            })
            .collect();
        train(&ds, &TrainingOptions::with_family(ModelFamily::Linear))
            .expect("train")
            .0
    }

    fn hole(depth: f64) -> PlannedHole {
        PlannedHole {
            final_depth: depth,
            initial_azimuth: 90.0,
            initial_inclination: -45.0,
            lithology: Some("Granite".to_string()),
            rotation_speed: 120.0,
            drilling_company: None,
        }
    }

    #[test]
    fn test_missing_categoricals_use_defaults() {
        let h = hole(100.0);
        assert_eq!(h.categorical_feature(CategoricalFeature::DrillingCompany), DEFAULT_COMPANY);
        let blank = PlannedHole { lithology: Some("  ".to_string()), ..h };
        assert_eq!(blank.categorical_feature(CategoricalFeature::Lithology), DEFAULT_LITHOLOGY);
    }

    #[test]
    fn test_prediction_follows_learned_relationship() {
        // sample_record: Δaz = 0.05 d, Δinc = 0.03 d
        let pair = trained_pair();
        let p = predict(&pair, &hole(400.0), 50).expect("predict");
        assert!((p.delta_azimuth - 20.0).abs() < 1e-3, "{}", p.delta_azimuth);
        assert!((p.delta_inclination - 12.0).abs() < 1e-3);
        assert!((p.final_azimuth - 110.0).abs() < 1e-3);
        assert!((p.final_inclination + 33.0).abs() < 1e-3);
        assert_eq!(p.trajectory.len(), 50);
        assert!((p.deviation_magnitude - 20.0_f64.hypot(12.0)).abs() < 1e-3);
        assert_eq!(p.recommendation, RecommendationTier::High);
        assert!(p.deviation_distance > 0.0);
    }

    #[test]
    fn test_shallow_hole_low_tier() {
        // 60 m: Δaz 3, Δinc 1.8 -> magnitude ~3.5
        let pair = trained_pair();
        let p = predict(&pair, &hole(60.0), 10).expect("predict");
        assert_eq!(p.recommendation, RecommendationTier::Low);
    }

    #[test]
    fn test_custom_thresholds() {
        let pair = trained_pair();
        let strict = RecommendationThresholds { moderate_deg: 1.0, high_deg: 2.0 };
        let p = predict_with_thresholds(&pair, &hole(60.0), 10, &strict).expect("predict");
        assert_eq!(p.recommendation, RecommendationTier::High);
    }

    #[test]
    fn test_invalid_depth_propagates() {
        let pair = trained_pair();
        assert!(predict(&pair, &hole(-5.0), 10).is_err());
    }

    #[test]
    fn test_report_carries_prediction() {
        let pair = trained_pair();
        let planned = hole(250.0);
        let p = predict(&pair, &planned, 20).expect("predict");
        let report = DeviationReport::new(pair.family(), &planned, &p, None);
        assert_eq!(report.tier, p.recommendation);
        assert_eq!(report.actions.len(), p.recommendation.actions().len());
        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["model_family"], "linear");
        assert!(json.get("metrics").is_none());
        assert!(json["generated_at"].is_string());
    }
}
