//! Feature preprocessing shared by both deviation models.
//!
//! Fit once on the training rows, then frozen:
//! - numeric fields are standardized with the fit-time mean and population std
//! - categorical fields are one-hot encoded over the fit-time vocabulary,
//!   sorted lexicographically; an unseen label encodes as an all-zero block
//!
//! Column order is numeric fields in declared order, then one indicator block
//! per categorical field in declared order. Feature importances are reported
//! in exactly this order.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::types::{CategoricalFeature, Dataset, FeatureRow, NumericFeature};

// ============================================================================
// Feature Matrix
// ============================================================================

/// Dense row-major matrix of encoded features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    data: Vec<f64>,
    n_rows: usize,
    n_cols: usize,
}

impl FeatureMatrix {
    /// Wrap a row-major buffer. `data.len()` must equal `n_rows * n_cols`.
    pub fn from_vec(data: Vec<f64>, n_rows: usize, n_cols: usize) -> Self {
        assert_eq!(data.len(), n_rows * n_cols, "feature buffer shape mismatch");
        Self { data, n_rows, n_cols }
    }

    /// Build from equal-length rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Self {
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * n_cols);
        for row in rows {
            assert_eq!(row.len(), n_cols, "ragged feature rows");
            data.extend_from_slice(row);
        }
        Self { data, n_rows: rows.len(), n_cols }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n_cols..(i + 1) * self.n_cols]
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.n_cols + col]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact panics on a zero chunk size
        self.data.chunks_exact(self.n_cols.max(1)).take(self.n_rows)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Copy of the rows at `indices`, in that order.
    pub fn select_rows(&self, indices: &[usize]) -> FeatureMatrix {
        let mut data = Vec::with_capacity(indices.len() * self.n_cols);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        FeatureMatrix { data, n_rows: indices.len(), n_cols: self.n_cols }
    }
}

// ============================================================================
// Fitted Transformer
// ============================================================================

/// Frozen standardization parameters for one numeric field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericScaler {
    pub field: NumericFeature,
    pub mean: f64,
    /// Population std, or 1.0 when the field was constant
    pub scale: f64,
}

/// Frozen vocabulary for one categorical field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBlock {
    pub field: CategoricalFeature,
    /// Sorted, deduplicated labels seen at fit time
    pub categories: Vec<String>,
}

/// Immutable numeric/categorical encoder learned from training rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedTransformer {
    numeric: Vec<NumericScaler>,
    blocks: Vec<CategoryBlock>,
}

impl FittedTransformer {
    /// Learn scaling statistics and vocabularies from a dataset.
    pub fn fit(dataset: &Dataset) -> Self {
        Self::fit_rows(dataset.records())
    }

    /// Learn from any slice of encodable rows.
    pub fn fit_rows<R: FeatureRow>(rows: &[R]) -> Self {
        let numeric = NumericFeature::ALL
            .iter()
            .map(|&field| {
                let values: Vec<f64> = rows.iter().map(|r| r.numeric_feature(field)).collect();
                let (mean, std) = if values.is_empty() {
                    (0.0, 0.0)
                } else {
                    (values.iter().mean(), values.iter().population_std_dev())
                };
                NumericScaler {
                    field,
                    mean,
                    scale: if std.is_finite() && std > f64::EPSILON * mean.abs().max(1.0) {
                        std
                    } else {
                        1.0
                    },
                }
            })
            .collect();

        let blocks = CategoricalFeature::ALL
            .iter()
            .map(|&field| {
                let mut categories: Vec<String> = rows
                    .iter()
                    .map(|r| r.categorical_feature(field).to_string())
                    .collect();
                categories.sort();
                categories.dedup();
                CategoryBlock { field, categories }
            })
            .collect();

        Self { numeric, blocks }
    }

    /// Width of the encoded feature vector.
    pub fn n_features(&self) -> usize {
        self.numeric.len() + self.blocks.iter().map(|b| b.categories.len()).sum::<usize>()
    }

    pub fn numeric_scalers(&self) -> &[NumericScaler] {
        &self.numeric
    }

    pub fn category_blocks(&self) -> &[CategoryBlock] {
        &self.blocks
    }

    /// Expanded column names in output order.
    ///
    /// Numeric columns use the field name; indicator columns are `<field>_<label>`.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.numeric.iter().map(|s| s.field.name().to_string()).collect();
        for block in &self.blocks {
            for label in &block.categories {
                names.push(format!("{}_{}", block.field.name(), label));
            }
        }
        names
    }

    /// Append the encoding of one row to `out`.
    pub fn encode_into<R: FeatureRow + ?Sized>(&self, row: &R, out: &mut Vec<f64>) {
        for s in &self.numeric {
            out.push((row.numeric_feature(s.field) - s.mean) / s.scale);
        }
        for block in &self.blocks {
            let start = out.len();
            out.resize(start + block.categories.len(), 0.0);
            let label = row.categorical_feature(block.field);
            // Unseen labels leave the block all-zero.
            if let Ok(pos) = block.categories.binary_search_by(|c| c.as_str().cmp(label)) {
                out[start + pos] = 1.0;
            }
        }
    }

    /// Encode a single row.
    pub fn transform_one<R: FeatureRow + ?Sized>(&self, row: &R) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.n_features());
        self.encode_into(row, &mut out);
        out
    }

    /// Encode many rows into a matrix.
    pub fn transform<R: FeatureRow>(&self, rows: &[R]) -> FeatureMatrix {
        let n_cols = self.n_features();
        let mut data = Vec::with_capacity(rows.len() * n_cols);
        for row in rows {
            self.encode_into(row, &mut data);
        }
        FeatureMatrix::from_vec(data, rows.len(), n_cols)
    }

    /// Encode every row of a dataset.
    pub fn transform_dataset(&self, dataset: &Dataset) -> FeatureMatrix {
        self.transform(dataset.records())
    }
}
