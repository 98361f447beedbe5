//! Synthetic sample generation for small training sets.
//!
//! Each synthetic record is a copy of one uniformly chosen source row with:
//! - Gaussian noise on every numeric field, scaled by that field's standard
//!   deviation over the *original* rows times `noise_level`
//! - each categorical field independently re-drawn from the original
//!   vocabulary with probability [`CATEGORY_SWAP_PROBABILITY`]
//!
//! Originals are kept in order at the front of the output.

use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use thiserror::Error;
use tracing::debug;

use crate::config::defaults;
use crate::types::{CategoricalFeature, Dataset, DrillRecord, NumericFeature, Target};

/// Probability that a categorical field of a synthetic row is re-drawn.
pub const CATEGORY_SWAP_PROBABILITY: f64 = 0.3;

#[derive(Debug, Error, PartialEq)]
pub enum AugmentError {
    #[error("Insufficient data: cannot augment an empty dataset")]
    InsufficientData,

    #[error("Invalid augmentation parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

/// Inputs that fully determine an augmentation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AugmentationParams {
    /// Number of synthetic rows to append
    pub count: usize,
    /// Noise standard deviation as a fraction of each field's std
    pub noise_level: f64,
    /// Re-draw categorical labels
    pub vary_categories: bool,
    /// RNG seed
    pub seed: u64,
}

impl Default for AugmentationParams {
    fn default() -> Self {
        Self {
            count: defaults::AUGMENTED_SAMPLES,
            noise_level: defaults::NOISE_LEVEL,
            vary_categories: true,
            seed: defaults::AUGMENTATION_SEED,
        }
    }
}

/// Original rows followed by synthetic rows.
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentedDataset {
    dataset: Dataset,
    original_len: usize,
}

impl AugmentedDataset {
    /// The full table (originals then synthetic rows).
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn into_dataset(self) -> Dataset {
        self.dataset
    }

    pub fn original(&self) -> &[DrillRecord] {
        &self.dataset.records()[..self.original_len]
    }

    pub fn synthetic(&self) -> &[DrillRecord] {
        &self.dataset.records()[self.original_len..]
    }

    pub fn original_len(&self) -> usize {
        self.original_len
    }

    pub fn synthetic_len(&self) -> usize {
        self.dataset.len() - self.original_len
    }
}

/// Augment with a seeded RNG.
pub fn augment(
    dataset: &Dataset,
    params: &AugmentationParams,
) -> Result<AugmentedDataset, AugmentError> {
    let mut rng = StdRng::seed_from_u64(params.seed);
    augment_with_rng(
        dataset,
        params.count,
        params.noise_level,
        params.vary_categories,
        &mut rng,
    )
}

/// Augment drawing all randomness from `rng`.
pub fn augment_with_rng<R: Rng>(
    dataset: &Dataset,
    count: usize,
    noise_level: f64,
    vary_categories: bool,
    rng: &mut R,
) -> Result<AugmentedDataset, AugmentError> {
    if dataset.is_empty() {
        return Err(AugmentError::InsufficientData);
    }
    if !(noise_level.is_finite() && noise_level > 0.0) {
        return Err(AugmentError::InvalidParameter {
            name: "noise_level",
            value: noise_level,
        });
    }

    let feature_noise = NumericFeature::ALL
        .iter()
        .map(|&f| field_noise(&dataset.feature_column(f), noise_level).map(|n| (f, n)))
        .collect::<Result<Vec<_>, _>>()?;
    let target_noise = Target::ALL
        .iter()
        .map(|&t| field_noise(&dataset.target_column(t), noise_level).map(|n| (t, n)))
        .collect::<Result<Vec<_>, _>>()?;
    let vocabularies: Vec<(CategoricalFeature, Vec<String>)> = CategoricalFeature::ALL
        .iter()
        .map(|&f| (f, dataset.vocabulary(f)))
        .collect();

    let source = dataset.records();
    let mut records = Vec::with_capacity(source.len() + count);
    records.extend_from_slice(source);

    for _ in 0..count {
        let mut sample = source[rng.gen_range(0..source.len())].clone();

        for (field, noise) in &feature_noise {
            *sample.feature_mut(*field) += noise.sample(rng);
        }
        for (target, noise) in &target_noise {
            *sample.target_mut(*target) += noise.sample(rng);
        }

        if vary_categories {
            for (field, vocab) in &vocabularies {
                if rng.gen::<f64>() < CATEGORY_SWAP_PROBABILITY {
                    if let Some(label) = vocab.choose(rng) {
                        *sample.category_mut(*field) = label.clone();
                    }
                }
            }
        }

        records.push(sample);
    }

    debug!(
        original = source.len(),
        synthetic = count,
        noise_level,
        vary_categories,
        "Augmented dataset"
    );

    Ok(AugmentedDataset {
        dataset: Dataset::new(records),
        original_len: source.len(),
    })
}

/// Zero-mean noise distribution for one field.
fn field_noise(values: &[f64], noise_level: f64) -> Result<Normal<f64>, AugmentError> {
    let std = values.iter().population_std_dev();
    // A single row has no spread.
    let std = if std.is_finite() { std } else { 0.0 };
    Normal::new(0.0, std * noise_level).map_err(|_| AugmentError::InvalidParameter {
        name: "noise_std",
        value: std * noise_level,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sample_record;

    fn small_dataset() -> Dataset {
        Dataset::new(vec![
            sample_record(100.0, "Granite", "DrillPro"),
            sample_record(250.0, "Schist", "DrillPro"),
            sample_record(400.0, "Gneiss", "DrillPro"),
            sample_record(800.0, "Granite", "DrillPro"),
        ])
    }

    fn params(count: usize) -> AugmentationParams {
        AugmentationParams {
            count,
            ..AugmentationParams::default()
        }
    }

    #[test]
    fn test_zero_count_is_identity() {
        let ds = small_dataset();
        let out = augment(&ds, &params(0)).expect("augment");
        assert_eq!(out.dataset(), &ds);
        assert_eq!(out.synthetic_len(), 0);
    }

    #[test]
    fn test_length_law_and_original_order() {
        let ds = small_dataset();
        for k in [1, 7, 250] {
            let out = augment(&ds, &params(k)).expect("augment");
            assert_eq!(out.dataset().len(), ds.len() + k);
            assert_eq!(out.original(), ds.records());
            assert_eq!(out.synthetic_len(), k);
        }
    }

    #[test]
    fn test_input_not_mutated() {
        let ds = small_dataset();
        let before = ds.clone();
        let _ = augment(&ds, &params(50)).expect("augment");
        assert_eq!(ds, before);
    }

    #[test]
    fn test_constant_field_gets_no_noise() {
        // azimuth, inclination and rpm are constant in sample_record
        let ds = small_dataset();
        let out = augment(&ds, &params(500)).expect("augment");
        for r in out.synthetic() {
            assert_eq!(r.initial_azimuth, 90.0);
            assert_eq!(r.initial_inclination, -45.0);
            assert_eq!(r.rotation_speed, 120.0);
        }
    }

    #[test]
    fn test_targets_and_depth_receive_noise() {
        let ds = small_dataset();
        let out = augment(&ds, &params(200)).expect("augment");
        assert_eq!(out.synthetic().len(), 200);

        let source_az = ds.target_column(Target::Azimuth);
        let source_inc = ds.target_column(Target::Inclination);
        let source_depth = ds.feature_column(NumericFeature::FinalDepth);
        let moved = |v: f64, sources: &[f64]| sources.iter().all(|&s| s != v);
        assert!(out.synthetic().iter().all(|r| moved(r.deviation_azimuth, &source_az)));
        assert!(out.synthetic().iter().all(|r| moved(r.deviation_inclination, &source_inc)));
        assert!(out.synthetic().iter().all(|r| moved(r.final_depth, &source_depth)));
    }

    #[test]
    fn test_noise_scale_matches_field_std() {
        // Sources sit 100 m apart so each synthetic depth maps back to its source.
        let mut records = Vec::new();
        for depth in [100.0, 200.0, 300.0, 400.0, 500.0] {
            records.push(sample_record(depth, "Granite", "A"));
        }
        let ds = Dataset::new(records);
        let depth_std = ds.feature_column(NumericFeature::FinalDepth).iter().population_std_dev();
        let noise_level = 0.05;

        let out = augment(
            &ds,
            &AugmentationParams { count: 20_000, noise_level, vary_categories: false, seed: 7 },
        )
        .expect("augment");

        let residuals: Vec<f64> = out
            .synthetic()
            .iter()
            .map(|r| {
                let source = (r.final_depth / 100.0).round() * 100.0;
                r.final_depth - source
            })
            .collect();
        let mean = residuals.iter().mean();
        let std = residuals.iter().population_std_dev();
        let expected = depth_std * noise_level;
        assert!(mean.abs() < 0.05 * expected, "mean {mean} should be ~0");
        assert!((std - expected).abs() / expected < 0.05, "std {std} vs {expected}");
    }

    #[test]
    fn test_categories_drawn_from_original_vocabulary() {
        let ds = small_dataset();
        let vocab = ds.vocabulary(CategoricalFeature::Lithology);
        let out = augment(&ds, &params(1_000)).expect("augment");
        for r in out.synthetic() {
            assert!(vocab.contains(&r.lithology));
            // single-valued field: variation is a no-op
            assert_eq!(r.drilling_company, "DrillPro");
        }
    }

    #[test]
    fn test_no_category_variation_keeps_source_labels() {
        let ds = Dataset::new(vec![
            sample_record(100.0, "Granite", "A"),
            sample_record(100.0, "Granite", "A"),
        ]);
        let mut p = params(100);
        p.vary_categories = false;
        let out = augment(&ds, &p).expect("augment");
        assert!(out.synthetic().iter().all(|r| r.lithology == "Granite"));
    }

    #[test]
    fn test_same_seed_same_output() {
        let ds = small_dataset();
        let a = augment(&ds, &params(100)).expect("augment");
        let b = augment(&ds, &params(100)).expect("augment");
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let err = augment(&Dataset::default(), &params(10)).unwrap_err();
        assert_eq!(err, AugmentError::InsufficientData);
    }

    #[test]
    fn test_non_positive_noise_rejected() {
        let ds = small_dataset();
        let mut p = params(10);
        p.noise_level = 0.0;
        assert!(matches!(
            augment(&ds, &p),
            Err(AugmentError::InvalidParameter { name: "noise_level", .. })
        ));
    }

    #[test]
    fn test_single_row_dataset_has_zero_noise() {
        let ds = Dataset::new(vec![sample_record(321.0, "Basalt", "A")]);
        let out = augment(&ds, &params(20)).expect("augment");
        assert!(out.synthetic().iter().all(|r| r.final_depth == 321.0));
    }
}
