//! Shared data structures for drill-hole deviation prediction
//!
//! - `record`: the fixed tabular schema (DrillRecord, Dataset, field partitions)
//! - `prediction`: evaluation metrics, feature importances, recommendation tiers

mod record;
mod prediction;

pub use record::*;
pub use prediction::*;
