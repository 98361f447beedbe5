//! Drill observation schema: DrillRecord, Dataset and the field partitions

use serde::{Deserialize, Serialize};

/// Lithology label used when the source row has none.
pub const DEFAULT_LITHOLOGY: &str = "Unknown";
/// Drilling company label used when the source row has none.
pub const DEFAULT_COMPANY: &str = "Unspecified";

// ============================================================================
// Field Partitions
// ============================================================================

/// Numeric input features, in declared (feature-matrix) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericFeature {
    /// Planned final depth (m)
    FinalDepth,
    /// Collar azimuth (degrees, 0-360)
    InitialAzimuth,
    /// Collar inclination (degrees, -90-0)
    InitialInclination,
    /// Rotation speed (rpm)
    RotationSpeed,
}

impl NumericFeature {
    pub const ALL: [NumericFeature; 4] = [
        NumericFeature::FinalDepth,
        NumericFeature::InitialAzimuth,
        NumericFeature::InitialInclination,
        NumericFeature::RotationSpeed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NumericFeature::FinalDepth => "final_depth",
            NumericFeature::InitialAzimuth => "initial_azimuth",
            NumericFeature::InitialInclination => "initial_inclination",
            NumericFeature::RotationSpeed => "rotation_speed",
        }
    }
}

/// Categorical input features, in declared (feature-matrix) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalFeature {
    Lithology,
    DrillingCompany,
}

impl CategoricalFeature {
    pub const ALL: [CategoricalFeature; 2] =
        [CategoricalFeature::Lithology, CategoricalFeature::DrillingCompany];

    pub fn name(self) -> &'static str {
        match self {
            CategoricalFeature::Lithology => "lithology",
            CategoricalFeature::DrillingCompany => "drilling_company",
        }
    }

    /// Label substituted for a missing value.
    pub fn default_label(self) -> &'static str {
        match self {
            CategoricalFeature::Lithology => DEFAULT_LITHOLOGY,
            CategoricalFeature::DrillingCompany => DEFAULT_COMPANY,
        }
    }
}

/// Regression targets. Never part of the feature partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Azimuth,
    Inclination,
}

impl Target {
    pub const ALL: [Target; 2] = [Target::Azimuth, Target::Inclination];

    pub fn name(self) -> &'static str {
        match self {
            Target::Azimuth => "deviation_azimuth",
            Target::Inclination => "deviation_inclination",
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Anything the feature transformer can encode.
///
/// Implemented by full training rows and by planned holes at inference.
pub trait FeatureRow {
    fn numeric_feature(&self, field: NumericFeature) -> f64;
    fn categorical_feature(&self, field: CategoricalFeature) -> &str;
}

// ============================================================================
// DrillRecord
// ============================================================================

/// One historical drill hole: planned parameters plus observed deviation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillRecord {
    /// Final depth (m)
    pub final_depth: f64,
    /// Collar azimuth (degrees)
    pub initial_azimuth: f64,
    /// Collar inclination (degrees, negative = downward)
    pub initial_inclination: f64,
    /// Rock type at the collar
    #[serde(default = "default_lithology")]
    pub lithology: String,
    /// Rotation speed (rpm)
    pub rotation_speed: f64,
    /// Contractor that drilled the hole
    #[serde(default = "default_company")]
    pub drilling_company: String,
    /// Observed azimuth drift (degrees)
    pub deviation_azimuth: f64,
    /// Observed inclination drift (degrees)
    pub deviation_inclination: f64,
}

fn default_lithology() -> String {
    DEFAULT_LITHOLOGY.to_string()
}

fn default_company() -> String {
    DEFAULT_COMPANY.to_string()
}

impl DrillRecord {
    pub fn feature(&self, field: NumericFeature) -> f64 {
        match field {
            NumericFeature::FinalDepth => self.final_depth,
            NumericFeature::InitialAzimuth => self.initial_azimuth,
            NumericFeature::InitialInclination => self.initial_inclination,
            NumericFeature::RotationSpeed => self.rotation_speed,
        }
    }

    pub fn feature_mut(&mut self, field: NumericFeature) -> &mut f64 {
        match field {
            NumericFeature::FinalDepth => &mut self.final_depth,
            NumericFeature::InitialAzimuth => &mut self.initial_azimuth,
            NumericFeature::InitialInclination => &mut self.initial_inclination,
            NumericFeature::RotationSpeed => &mut self.rotation_speed,
        }
    }

    pub fn target(&self, target: Target) -> f64 {
        match target {
            Target::Azimuth => self.deviation_azimuth,
            Target::Inclination => self.deviation_inclination,
        }
    }

    pub fn target_mut(&mut self, target: Target) -> &mut f64 {
        match target {
            Target::Azimuth => &mut self.deviation_azimuth,
            Target::Inclination => &mut self.deviation_inclination,
        }
    }

    pub fn category(&self, field: CategoricalFeature) -> &str {
        match field {
            CategoricalFeature::Lithology => &self.lithology,
            CategoricalFeature::DrillingCompany => &self.drilling_company,
        }
    }

    pub fn category_mut(&mut self, field: CategoricalFeature) -> &mut String {
        match field {
            CategoricalFeature::Lithology => &mut self.lithology,
            CategoricalFeature::DrillingCompany => &mut self.drilling_company,
        }
    }

    /// Replace blank categorical labels with the documented defaults.
    pub fn with_defaults(mut self) -> Self {
        for field in CategoricalFeature::ALL {
            let value = self.category_mut(field);
            if value.trim().is_empty() {
                *value = field.default_label().to_string();
            }
        }
        self
    }
}

impl FeatureRow for DrillRecord {
    fn numeric_feature(&self, field: NumericFeature) -> f64 {
        self.feature(field)
    }

    fn categorical_feature(&self, field: CategoricalFeature) -> &str {
        self.category(field)
    }
}

// ============================================================================
// Dataset
// ============================================================================

/// Ordered collection of drill records sharing the fixed schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    records: Vec<DrillRecord>,
}

impl Dataset {
    /// Build a dataset, filling blank categoricals with their defaults.
    pub fn new(records: Vec<DrillRecord>) -> Self {
        Self {
            records: records.into_iter().map(DrillRecord::with_defaults).collect(),
        }
    }

    pub fn records(&self) -> &[DrillRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<DrillRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DrillRecord> {
        self.records.iter()
    }

    /// Values of one numeric feature, in row order.
    pub fn feature_column(&self, field: NumericFeature) -> Vec<f64> {
        self.records.iter().map(|r| r.feature(field)).collect()
    }

    /// Values of one target, in row order.
    pub fn target_column(&self, target: Target) -> Vec<f64> {
        self.records.iter().map(|r| r.target(target)).collect()
    }

    /// Distinct labels of a categorical field in first-seen order.
    pub fn vocabulary(&self, field: CategoricalFeature) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut vocab = Vec::new();
        for record in &self.records {
            let label = record.category(field);
            if seen.insert(label) {
                vocab.push(label.to_string());
            }
        }
        vocab
    }

    /// New dataset holding the rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            records: indices.iter().map(|&i| self.records[i].clone()).collect(),
        }
    }

    /// Content digest used to key caches on the exact row contents.
    pub fn fingerprint(&self) -> [u8; 16] {
        let mut ctx = md5::Context::new();
        ctx.consume((self.records.len() as u64).to_le_bytes());
        for r in &self.records {
            for field in NumericFeature::ALL {
                ctx.consume(r.feature(field).to_bits().to_le_bytes());
            }
            for target in Target::ALL {
                ctx.consume(r.target(target).to_bits().to_le_bytes());
            }
            for field in CategoricalFeature::ALL {
                let label = r.category(field);
                ctx.consume((label.len() as u64).to_le_bytes());
                ctx.consume(label.as_bytes());
            }
        }
        ctx.compute().0
    }
}

impl FromIterator<DrillRecord> for Dataset {
    fn from_iter<I: IntoIterator<Item = DrillRecord>>(iter: I) -> Self {
        Dataset::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a DrillRecord;
    type IntoIter = std::slice::Iter<'a, DrillRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
pub(crate) fn sample_record(depth: f64, lithology: &str, company: &str) -> DrillRecord {
    DrillRecord {
        final_depth: depth,
        initial_azimuth: 90.0,
        initial_inclination: -45.0,
        lithology: lithology.to_string(),
        rotation_speed: 120.0,
        drilling_company: company.to_string(),
        deviation_azimuth: depth * 0.05,
        deviation_inclination: depth * 0.03,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_categories_get_defaults() {
        let ds = Dataset::new(vec![sample_record(100.0, "", "  ")]);
        assert_eq!(ds.records()[0].lithology, DEFAULT_LITHOLOGY);
        assert_eq!(ds.records()[0].drilling_company, DEFAULT_COMPANY);
    }

    #[test]
    fn test_vocabulary_first_seen_order() {
        let ds = Dataset::new(vec![
            sample_record(100.0, "Schist", "A"),
            sample_record(200.0, "Granite", "B"),
            sample_record(300.0, "Schist", "A"),
        ]);
        assert_eq!(ds.vocabulary(CategoricalFeature::Lithology), vec!["Schist", "Granite"]);
        assert_eq!(ds.vocabulary(CategoricalFeature::DrillingCompany), vec!["A", "B"]);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = Dataset::new(vec![sample_record(100.0, "Granite", "A")]);
        let b = Dataset::new(vec![sample_record(100.0, "Granite", "A")]);
        let c = Dataset::new(vec![sample_record(100.5, "Granite", "A")]);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_targets_are_not_features() {
        let names: Vec<_> = NumericFeature::ALL.iter().map(|f| f.name()).collect();
        for t in Target::ALL {
            assert!(!names.contains(&t.name()));
        }
    }

    #[test]
    fn test_missing_categoricals_deserialize_to_defaults() {
        let json = r#"{
            "final_depth": 250.0, "initial_azimuth": 10.0, "initial_inclination": -60.0,
            "rotation_speed": 90.0, "deviation_azimuth": 1.0, "deviation_inclination": -2.0
        }"#;
        let r: DrillRecord = serde_json::from_str(json).expect("valid record JSON");
        assert_eq!(r.lithology, DEFAULT_LITHOLOGY);
        assert_eq!(r.drilling_company, DEFAULT_COMPANY);
    }
}
