//! End-to-end tests: demo data through augmentation, training, importances
//! and prediction, using only the public API.

use std::sync::Arc;

use drillhole_deviation::analysis::{self, CorrelationDirection};
use drillhole_deviation::augmentation::{augment, AugmentationParams};
use drillhole_deviation::demo;
use drillhole_deviation::importance::{importances, sort_by_target};
use drillhole_deviation::ingest::{self, ColumnMapping};
use drillhole_deviation::models::{ForestConfig, ModelFamily, ModelSettings};
use drillhole_deviation::prediction::{predict, DeviationReport, PlannedHole};
use drillhole_deviation::session::Session;
use drillhole_deviation::trainer::{train, train_named, TrainError, TrainingOptions};
use drillhole_deviation::trajectory::{clamp_inclination, wrap_azimuth, Position};
use drillhole_deviation::types::{PerformanceTier, RecommendationTier, Target};

fn linear_options() -> TrainingOptions {
    TrainingOptions {
        family: ModelFamily::Linear,
        test_fraction: 0.2,
        seed: 42,
        settings: ModelSettings::default(),
    }
}

fn small_forest_options() -> TrainingOptions {
    TrainingOptions {
        family: ModelFamily::RandomForest,
        settings: ModelSettings {
            forest: ForestConfig { n_trees: 15, max_depth: Some(10), ..ForestConfig::default() },
            ..ModelSettings::default()
        },
        ..linear_options()
    }
}

fn planned_hole() -> PlannedHole {
    PlannedHole {
        final_depth: 500.0,
        initial_azimuth: 45.0,
        initial_inclination: -60.0,
        lithology: Some("Granite".to_string()),
        rotation_speed: 120.0,
        drilling_company: Some("DrillPro".to_string()),
    }
}

// ============================================================================
// Linear scenario
// ============================================================================

#[test]
fn linear_pair_on_demo_data_is_reproducible_and_reasonable() {
    let dataset = demo::generate(1000, 42);

    let (first_pair, first) = train(&dataset, &linear_options()).expect("train");
    let (second_pair, second) = train(&dataset, &linear_options()).expect("train");
    assert_eq!(first.metrics, second.metrics);

    let a = predict(&first_pair, &planned_hole(), 100).expect("predict");
    let b = predict(&second_pair, &planned_hole(), 100).expect("predict");
    assert_eq!(a.delta_azimuth, b.delta_azimuth);
    assert_eq!(a.delta_inclination, b.delta_inclination);
    assert_eq!(a.deviation_distance, b.deviation_distance);
    assert_eq!(first.train_rows, 800);
    assert_eq!(first.test_rows, 200);
    assert!(first.warnings.is_empty());

    // scatter std is 10° azimuth and 5° inclination
    let m = first.metrics;
    assert!(m.azimuth_rmse > 8.0 && m.azimuth_rmse < 12.5, "azimuth rmse {}", m.azimuth_rmse);
    assert!(
        m.inclination_rmse > 4.0 && m.inclination_rmse < 6.5,
        "inclination rmse {}",
        m.inclination_rmse
    );
    assert!(m.azimuth_r2 > 0.5, "azimuth r2 {}", m.azimuth_r2);
    assert!(m.inclination_r2 > 0.5, "inclination r2 {}", m.inclination_r2);
    assert!(PerformanceTier::from_metrics(&m) >= PerformanceTier::Moderate);
}

#[test]
fn linear_pair_predicts_planned_hole() {
    let dataset = demo::generate(1000, 42);
    let (pair, report) = train(&dataset, &linear_options()).expect("train");
    let hole = planned_hole();

    let prediction = predict(&pair, &hole, 100).expect("predict");

    // generating law: Δaz ≈ 25.5°, Δinc ≈ 17°
    assert!(
        prediction.delta_azimuth > 20.0 && prediction.delta_azimuth < 31.0,
        "Δaz {}",
        prediction.delta_azimuth
    );
    assert!(
        prediction.delta_inclination > 12.0 && prediction.delta_inclination < 22.0,
        "Δinc {}",
        prediction.delta_inclination
    );
    assert_eq!(prediction.recommendation, RecommendationTier::High);

    assert_eq!(prediction.trajectory.len(), 100);
    assert_eq!(prediction.trajectory.points()[0].position, Position::ORIGIN);
    assert_eq!(prediction.final_azimuth, wrap_azimuth(45.0 + prediction.delta_azimuth));
    assert_eq!(
        prediction.final_inclination,
        clamp_inclination(-60.0 + prediction.delta_inclination)
    );
    assert!(prediction.deviation_distance > 0.0);

    let doc = DeviationReport::new(pair.family(), &hole, &prediction, Some(report.metrics));
    assert_eq!(doc.tier, RecommendationTier::High);
    assert_eq!(doc.actions.len(), RecommendationTier::High.actions().len());
    let json = serde_json::to_value(&doc).expect("serialize");
    assert_eq!(json["model_family"], "linear");
    assert_eq!(json["tier"], "high");
}

#[test]
fn unseen_categories_still_predict() {
    let dataset = demo::generate(300, 3);
    let (pair, _) = train(&dataset, &linear_options()).expect("train");
    let hole = PlannedHole {
        lithology: Some("Obsidian".to_string()),
        drilling_company: None,
        ..planned_hole()
    };
    let prediction = predict(&pair, &hole, 10).expect("predict");
    assert!(prediction.delta_azimuth.is_finite());
    assert!(prediction.delta_inclination.is_finite());
}

// ============================================================================
// Exploration
// ============================================================================

#[test]
fn demo_exploration_finds_depth_driven_deviation() {
    let dataset = demo::generate(1000, 42);
    let report = analysis::explore(&dataset).expect("report");

    assert_eq!(report.overview.rows, 1000);
    assert!(report.overview.mean_abs_azimuth > report.overview.mean_abs_inclination);
    assert_eq!(report.by_company.iter().map(|g| g.count).sum::<usize>(), 1000);

    // both deviation laws grow with depth
    let depth_driven = report
        .notable_correlations
        .iter()
        .find(|f| f.first == "deviation_azimuth" && f.second == "final_depth")
        .expect("azimuth vs depth is notable");
    assert_eq!(depth_driven.direction, CorrelationDirection::Positive);
    assert!(depth_driven.p_value < 1e-6);

    let json = serde_json::to_value(&report).expect("serialize");
    assert_eq!(json["correlations"]["fields"][0], "final_depth");
}

// ============================================================================
// Augmentation + forest
// ============================================================================

#[test]
fn augmented_forest_exposes_importances() {
    let dataset = demo::generate(200, 11);
    let params = AugmentationParams { count: 300, ..AugmentationParams::default() };
    let augmented = augment(&dataset, &params).expect("augment");
    assert_eq!(augmented.dataset().len(), 500);
    assert_eq!(augmented.original(), dataset.records());

    let (pair, report) = train(augmented.dataset(), &small_forest_options()).expect("train");
    assert_eq!(report.family, ModelFamily::RandomForest);

    let mut entries = importances(&pair).expect("importances");
    assert_eq!(entries.len(), pair.transformer().n_features());
    let total_az: f64 = entries.iter().map(|e| e.azimuth).sum();
    let total_inc: f64 = entries.iter().map(|e| e.inclination).sum();
    assert!((total_az - 1.0).abs() < 1e-9);
    assert!((total_inc - 1.0).abs() < 1e-9);

    // depth dominates both deviation laws
    sort_by_target(&mut entries, Target::Azimuth);
    assert_eq!(entries[0].feature, "final_depth");
    sort_by_target(&mut entries, Target::Inclination);
    assert_eq!(entries[0].feature, "final_depth");
}

#[test]
fn importances_unavailable_for_other_families() {
    let dataset = demo::generate(100, 5);
    let (pair, _) = train(&dataset, &linear_options()).expect("train");
    assert_eq!(
        importances(&pair).unwrap_err(),
        TrainError::ImportanceUnavailable(ModelFamily::Linear)
    );
}

#[test]
fn family_names_resolve_through_train_named() {
    let dataset = demo::generate(100, 5);
    let (pair, _) = train_named(&dataset, "Linear Regression", 0.2, 1).expect("train");
    assert_eq!(pair.family(), ModelFamily::Linear);
    assert!(matches!(
        train_named(&dataset, "Gradient Boosting", 0.2, 1),
        Err(TrainError::UnsupportedFamily(_))
    ));
}

#[test]
fn tiny_dataset_is_rejected() {
    let dataset = demo::generate(1, 1);
    assert!(matches!(
        train(&dataset, &linear_options()),
        Err(TrainError::InsufficientData { .. })
    ));
}

// ============================================================================
// Session + CSV
// ============================================================================

#[test]
fn session_reuses_augmentation_and_holds_latest_model() {
    let session = Session::new();
    let dataset = demo::generate(120, 9);
    let params = AugmentationParams { count: 60, ..AugmentationParams::default() };

    let first = session.augmented_or_insert(&dataset, &params).expect("augment");
    let again = session.augmented_or_insert(&dataset, &params).expect("augment");
    assert!(Arc::ptr_eq(&first, &again));

    let (pair, report) = train(first.dataset(), &linear_options()).expect("train");
    session.install_model(pair, report);
    let active = session.model().expect("trained");
    assert_eq!(active.pair.family(), ModelFamily::Linear);
    assert!(predict(&active.pair, &planned_hole(), 20).is_ok());
}

#[test]
fn csv_export_trains_like_the_source() {
    let dataset = demo::generate(250, 21);
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    ingest::write_csv(&dataset, file.as_file_mut()).expect("write");

    let loaded = ingest::load_csv(file.path(), &ColumnMapping::default()).expect("load");
    assert_eq!(loaded, dataset);

    let (_, from_memory) = train(&dataset, &linear_options()).expect("train");
    let (_, from_csv) = train(&loaded, &linear_options()).expect("train");
    assert_eq!(from_memory.metrics, from_csv.metrics);
}
