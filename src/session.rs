//! Interactive session state
//!
//! Two copy-on-write single slots:
//! - the current trained model pair, replaced wholesale on retrain
//! - the augmented training table, regenerated only when its inputs change
//!
//! Readers take an `Arc` snapshot and never observe a half-replaced value.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tracing::{debug, info};

use crate::augmentation::{augment, AugmentError, AugmentationParams, AugmentedDataset};
use crate::trainer::{TrainedModelPair, TrainingReport};
use crate::types::Dataset;

/// Identity of an augmentation run: source content plus every parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AugmentationKey {
    pub fingerprint: [u8; 16],
    pub count: usize,
    /// `noise_level.to_bits()`
    pub noise_bits: u64,
    pub vary_categories: bool,
    pub seed: u64,
}

impl AugmentationKey {
    pub fn new(dataset: &Dataset, params: &AugmentationParams) -> Self {
        Self {
            fingerprint: dataset.fingerprint(),
            count: params.count,
            noise_bits: params.noise_level.to_bits(),
            vary_categories: params.vary_categories,
            seed: params.seed,
        }
    }
}

#[derive(Debug)]
struct CachedAugmentation {
    key: AugmentationKey,
    data: Arc<AugmentedDataset>,
}

/// A trained pair together with the report from the run that produced it.
#[derive(Debug)]
pub struct ActiveModel {
    pub pair: TrainedModelPair,
    pub report: TrainingReport,
}

#[derive(Debug, Default)]
pub struct Session {
    model: ArcSwapOption<ActiveModel>,
    augmented: ArcSwapOption<CachedAugmentation>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Model slot
    // ========================================================================

    /// Publish a freshly trained pair, replacing any previous one.
    pub fn install_model(&self, pair: TrainedModelPair, report: TrainingReport) -> Arc<ActiveModel> {
        let active = Arc::new(ActiveModel { pair, report });
        info!(family = %active.pair.family(), "Installed trained model pair");
        self.model.store(Some(Arc::clone(&active)));
        active
    }

    /// Snapshot of the current model, if one has been trained.
    pub fn model(&self) -> Option<Arc<ActiveModel>> {
        self.model.load_full()
    }

    pub fn is_trained(&self) -> bool {
        self.model.load().is_some()
    }

    pub fn clear_model(&self) {
        self.model.store(None);
    }

    // ========================================================================
    // Augmentation cache
    // ========================================================================

    /// Cached augmentation for these exact inputs, generating it on a miss.
    pub fn augmented_or_insert(
        &self,
        dataset: &Dataset,
        params: &AugmentationParams,
    ) -> Result<Arc<AugmentedDataset>, AugmentError> {
        let key = AugmentationKey::new(dataset, params);
        if let Some(cached) = self.augmented.load().as_ref() {
            if cached.key == key {
                debug!(rows = cached.data.dataset().len(), "Augmentation cache hit");
                return Ok(Arc::clone(&cached.data));
            }
        }

        let data = Arc::new(augment(dataset, params)?);
        self.augmented.store(Some(Arc::new(CachedAugmentation {
            key,
            data: Arc::clone(&data),
        })));
        Ok(data)
    }

    /// Key of the cached augmentation, if any.
    pub fn cached_augmentation_key(&self) -> Option<AugmentationKey> {
        self.augmented.load().as_ref().map(|c| c.key)
    }

    pub fn invalidate_augmentation(&self) {
        self.augmented.store(None);
    }
}
