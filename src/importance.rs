//! Feature importance extraction for tree-ensemble model pairs.

use crate::trainer::{TrainError, TrainedModelPair};
use crate::types::{FeatureImportance, Target};

/// Per-feature importances of both models, in transformer output order.
///
/// Each model's weights are non-negative and sum to 1 (or are all zero when
/// the model never split). Families without importances return
/// [`TrainError::ImportanceUnavailable`].
pub fn importances(pair: &TrainedModelPair) -> Result<Vec<FeatureImportance>, TrainError> {
    let family = pair.family();
    if !family.supports_importance() {
        return Err(TrainError::ImportanceUnavailable(family));
    }
    let azimuth = pair
        .model(Target::Azimuth)
        .feature_importances()
        .ok_or(TrainError::ImportanceUnavailable(family))?;
    let inclination = pair
        .model(Target::Inclination)
        .feature_importances()
        .ok_or(TrainError::ImportanceUnavailable(family))?;

    Ok(pair
        .transformer()
        .feature_names()
        .into_iter()
        .zip(azimuth.iter().zip(inclination))
        .map(|(feature, (&azimuth, &inclination))| FeatureImportance {
            feature,
            azimuth,
            inclination,
        })
        .collect())
}

/// Sort descending by the importance for `target`; ties keep feature order.
pub fn sort_by_target(entries: &mut [FeatureImportance], target: Target) {
    entries.sort_by(|a, b| {
        let (x, y) = match target {
            Target::Azimuth => (a.azimuth, b.azimuth),
            Target::Inclination => (a.inclination, b.inclination),
        };
        y.total_cmp(&x)
    });
}
