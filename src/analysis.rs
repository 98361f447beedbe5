//! Exploratory Statistics
//!
//! Dataset summaries available before any model is trained:
//! - absolute deviation levels over all holes
//! - deviation profile per lithology and per drilling company
//! - Pearson correlations between every pair of numeric fields, with the
//!   notable pairs classified by strength and sign
//!
//! Correlations follow the same Pearson + Student's t approach as the rest of
//! the ML tooling; a constant column correlates 0 with everything.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::Statistics;

use crate::types::{CategoricalFeature, Dataset, DrillRecord, NumericFeature, Target};

/// |r| above which a pair is reported.
pub const NOTABLE_CORRELATION: f64 = 0.3;

/// |r| above which a reported pair counts as strong.
pub const STRONG_CORRELATION: f64 = 0.7;

// ============================================================================
// Overview
// ============================================================================

/// Absolute deviation levels over the whole dataset (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviationOverview {
    pub rows: usize,
    pub mean_abs_azimuth: f64,
    pub max_abs_azimuth: f64,
    pub mean_abs_inclination: f64,
    pub max_abs_inclination: f64,
}

/// `None` for an empty dataset.
pub fn overview(dataset: &Dataset) -> Option<DeviationOverview> {
    if dataset.is_empty() {
        return None;
    }
    let abs_az: Vec<f64> = dataset.iter().map(|r| r.deviation_azimuth.abs()).collect();
    let abs_inc: Vec<f64> = dataset.iter().map(|r| r.deviation_inclination.abs()).collect();
    Some(DeviationOverview {
        rows: dataset.len(),
        mean_abs_azimuth: abs_az.iter().mean(),
        max_abs_azimuth: Statistics::max(abs_az.iter()),
        mean_abs_inclination: abs_inc.iter().mean(),
        max_abs_inclination: Statistics::max(abs_inc.iter()),
    })
}

// ============================================================================
// Per-Category Deviation
// ============================================================================

/// Mean, sample std, min and max of one deviation column within a group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub mean: f64,
    /// `None` for a single-row group
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
}

impl FieldStats {
    fn of(values: &[f64]) -> Self {
        Self {
            mean: values.iter().mean(),
            std: (values.len() > 1).then(|| values.iter().std_dev()),
            min: Statistics::min(values.iter()),
            max: Statistics::max(values.iter()),
        }
    }
}

/// Deviation profile of the holes sharing one category label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDeviation {
    pub label: String,
    pub count: usize,
    /// sqrt(mean(Δaz² + Δinc²)) in degrees
    pub rms_magnitude: f64,
    pub azimuth: FieldStats,
    pub inclination: FieldStats,
}

/// One entry per label of `field`, most deviated first (ties by label).
pub fn group_deviations(dataset: &Dataset, field: CategoricalFeature) -> Vec<GroupDeviation> {
    let mut groups: BTreeMap<&str, Vec<&DrillRecord>> = BTreeMap::new();
    for record in dataset {
        groups.entry(record.category(field)).or_default().push(record);
    }

    let mut out: Vec<GroupDeviation> = groups
        .into_iter()
        .map(|(label, records)| {
            let az: Vec<f64> = records.iter().map(|r| r.deviation_azimuth).collect();
            let inc: Vec<f64> = records.iter().map(|r| r.deviation_inclination).collect();
            let squared: Vec<f64> = az.iter().zip(&inc).map(|(a, i)| a * a + i * i).collect();
            GroupDeviation {
                label: label.to_string(),
                count: records.len(),
                rms_magnitude: squared.iter().mean().sqrt(),
                azimuth: FieldStats::of(&az),
                inclination: FieldStats::of(&inc),
            }
        })
        .collect();

    // BTreeMap order makes the label tie-break implicit under a stable sort.
    out.sort_by(|a, b| b.rms_magnitude.total_cmp(&a.rms_magnitude));
    out
}

// ============================================================================
// Correlations
// ============================================================================

/// Pearson coefficients between all numeric fields (features, then targets).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub fields: Vec<String>,
    /// Row-major, symmetric
    pub values: Vec<Vec<f64>>,
    pub rows: usize,
}

impl CorrelationMatrix {
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i][j]
    }

    /// Coefficient between two named fields.
    pub fn between(&self, first: &str, second: &str) -> Option<f64> {
        let i = self.fields.iter().position(|f| f == first)?;
        let j = self.fields.iter().position(|f| f == second)?;
        Some(self.values[i][j])
    }
}

fn numeric_columns(dataset: &Dataset) -> Vec<(&'static str, Vec<f64>)> {
    NumericFeature::ALL
        .iter()
        .map(|&f| (f.name(), dataset.feature_column(f)))
        .chain(Target::ALL.iter().map(|&t| (t.name(), dataset.target_column(t))))
        .collect()
}

pub fn correlation_matrix(dataset: &Dataset) -> CorrelationMatrix {
    let columns = numeric_columns(dataset);
    let values = columns
        .iter()
        .map(|(_, x)| columns.iter().map(|(_, y)| pearson(x, y)).collect())
        .collect();
    CorrelationMatrix {
        fields: columns.iter().map(|(name, _)| (*name).to_string()).collect(),
        values,
        rows: dataset.len(),
    }
}

/// Pearson r from the sample covariance; 0 when either side has no spread.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 {
        return 0.0;
    }
    let denominator = x.iter().std_dev() * y.iter().std_dev();
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    (x.iter().covariance(y.iter()) / denominator).clamp(-1.0, 1.0)
}

/// Two-tailed p-value of `r` over `n` samples (t-distribution, n - 2 dof).
pub fn p_value_for_r(r: f64, n: usize) -> f64 {
    if n < 3 {
        return 1.0;
    }
    if r.abs() >= 0.9999 {
        return 0.0;
    }
    let df = (n - 2) as f64;
    let t_stat = r * df.sqrt() / (1.0 - r * r).sqrt();
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => 2.0 * (1.0 - dist.cdf(t_stat.abs())),
        Err(_) => 1.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    Moderate,
    Strong,
}

impl CorrelationStrength {
    /// `None` when |r| does not exceed [`NOTABLE_CORRELATION`].
    pub fn classify(r: f64) -> Option<Self> {
        let magnitude = r.abs();
        if magnitude > STRONG_CORRELATION {
            Some(CorrelationStrength::Strong)
        } else if magnitude > NOTABLE_CORRELATION {
            Some(CorrelationStrength::Moderate)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationDirection {
    Positive,
    Negative,
}

/// A field pair whose correlation is worth reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationFinding {
    pub first: String,
    pub second: String,
    pub r: f64,
    pub p_value: f64,
    pub strength: CorrelationStrength,
    pub direction: CorrelationDirection,
}

impl std::fmt::Display for CorrelationFinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let strength = match self.strength {
            CorrelationStrength::Strong => "strong",
            CorrelationStrength::Moderate => "moderate",
        };
        let direction = match self.direction {
            CorrelationDirection::Positive => "positive",
            CorrelationDirection::Negative => "negative",
        };
        write!(
            f,
            "{strength} {direction} correlation ({:.2}) between {} and {}",
            self.r, self.first, self.second
        )
    }
}

/// Pairs with |r| > [`NOTABLE_CORRELATION`], strongest first.
///
/// Each unordered pair appears once, named (later field, earlier field).
pub fn notable_correlations(matrix: &CorrelationMatrix) -> Vec<CorrelationFinding> {
    let mut findings = Vec::new();
    for i in 0..matrix.fields.len() {
        for j in 0..i {
            let r = matrix.get(i, j);
            let Some(strength) = CorrelationStrength::classify(r) else {
                continue;
            };
            findings.push(CorrelationFinding {
                first: matrix.fields[i].clone(),
                second: matrix.fields[j].clone(),
                r,
                p_value: p_value_for_r(r, matrix.rows),
                strength,
                direction: if r > 0.0 {
                    CorrelationDirection::Positive
                } else {
                    CorrelationDirection::Negative
                },
            });
        }
    }
    findings.sort_by(|a, b| b.r.abs().total_cmp(&a.r.abs()));
    findings
}

// ============================================================================
// Full Report
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorationReport {
    pub overview: DeviationOverview,
    pub by_lithology: Vec<GroupDeviation>,
    pub by_company: Vec<GroupDeviation>,
    pub correlations: CorrelationMatrix,
    pub notable_correlations: Vec<CorrelationFinding>,
}

/// Every exploratory summary at once; `None` for an empty dataset.
pub fn explore(dataset: &Dataset) -> Option<ExplorationReport> {
    let overview = overview(dataset)?;
    let correlations = correlation_matrix(dataset);
    Some(ExplorationReport {
        overview,
        by_lithology: group_deviations(dataset, CategoricalFeature::Lithology),
        by_company: group_deviations(dataset, CategoricalFeature::DrillingCompany),
        notable_correlations: notable_correlations(&correlations),
        correlations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sample_record;

    fn record(az: f64, inc: f64, lithology: &str, company: &str) -> DrillRecord {
        DrillRecord {
            deviation_azimuth: az,
            deviation_inclination: inc,
            ..sample_record(100.0, lithology, company)
        }
    }

    #[test]
    fn test_overview_uses_absolute_values() {
        let ds = Dataset::new(vec![
            record(-4.0, 1.0, "Granite", "A"),
            record(2.0, -3.0, "Granite", "A"),
        ]);
        let o = overview(&ds).expect("non-empty");
        assert_eq!(o.rows, 2);
        assert_eq!(o.mean_abs_azimuth, 3.0);
        assert_eq!(o.max_abs_azimuth, 4.0);
        assert_eq!(o.mean_abs_inclination, 2.0);
        assert_eq!(o.max_abs_inclination, 3.0);
        assert!(overview(&Dataset::default()).is_none());
    }

    #[test]
    fn test_group_deviations_by_lithology() {
        let ds = Dataset::new(vec![
            record(3.0, 4.0, "Granite", "A"),
            record(-3.0, -4.0, "Granite", "A"),
            record(1.0, 0.0, "Schist", "A"),
        ]);
        let groups = group_deviations(&ds, CategoricalFeature::Lithology);
        assert_eq!(groups.len(), 2);

        let granite = &groups[0];
        assert_eq!(granite.label, "Granite");
        assert_eq!(granite.count, 2);
        assert_eq!(granite.rms_magnitude, 5.0);
        assert_eq!(granite.azimuth.mean, 0.0);
        assert_eq!(granite.azimuth.min, -3.0);
        assert_eq!(granite.azimuth.max, 3.0);
        // sample std of {-3, 3}
        let std = granite.azimuth.std.expect("two rows");
        assert!((std - 18.0_f64.sqrt()).abs() < 1e-12);

        let schist = &groups[1];
        assert_eq!(schist.rms_magnitude, 1.0);
        assert_eq!(schist.inclination.std, None);
    }

    #[test]
    fn test_groups_sorted_most_deviated_first() {
        let ds = Dataset::new(vec![
            record(1.0, 1.0, "Granite", "Low"),
            record(10.0, 0.0, "Granite", "High"),
            record(5.0, 0.0, "Granite", "Mid"),
        ]);
        let labels: Vec<String> = group_deviations(&ds, CategoricalFeature::DrillingCompany)
            .into_iter()
            .map(|g| g.label)
            .collect();
        assert_eq!(labels, vec!["High", "Mid", "Low"]);
    }

    #[test]
    fn test_pearson_extremes() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson(&x, &[2.0, 4.0, 6.0, 8.0]) - 1.0).abs() < 1e-12);
        assert!((pearson(&x, &[8.0, 6.0, 4.0, 2.0]) + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&x, &[5.0; 4]), 0.0);
        assert_eq!(pearson(&[1.0], &[2.0]), 0.0);
    }

    #[test]
    fn test_strength_boundaries() {
        assert_eq!(CorrelationStrength::classify(0.3), None);
        assert_eq!(CorrelationStrength::classify(-0.31), Some(CorrelationStrength::Moderate));
        assert_eq!(CorrelationStrength::classify(0.7), Some(CorrelationStrength::Moderate));
        assert_eq!(CorrelationStrength::classify(-0.71), Some(CorrelationStrength::Strong));
    }

    #[test]
    fn test_p_value() {
        assert_eq!(p_value_for_r(0.5, 2), 1.0);
        assert_eq!(p_value_for_r(1.0, 50), 0.0);
        assert!(p_value_for_r(0.8, 100) < 0.001);
        assert!(p_value_for_r(0.05, 20) > 0.5);
    }

    #[test]
    fn test_matrix_shape_and_symmetry() {
        let ds = crate::demo::generate(200, 4);
        let m = correlation_matrix(&ds);
        assert_eq!(m.fields.len(), 6);
        assert_eq!(m.fields[0], "final_depth");
        assert_eq!(m.fields[5], "deviation_inclination");
        for i in 0..6 {
            assert!((m.get(i, i) - 1.0).abs() < 1e-9);
            for j in 0..6 {
                assert!((m.get(i, j) - m.get(j, i)).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_notable_correlations_from_linear_deviation() {
        // sample_record: constant collar and rpm, deviations proportional to depth
        let mut records: Vec<DrillRecord> = (0..40)
            .map(|i| sample_record(100.0 + 10.0 * f64::from(i), "Granite", "A"))
            .collect();
        for r in &mut records {
            r.deviation_inclination = -r.deviation_inclination;
        }
        let m = correlation_matrix(&Dataset::new(records));
        let findings = notable_correlations(&m);

        assert_eq!(findings.len(), 3, "{findings:?}");
        assert!(findings.iter().all(|f| f.strength == CorrelationStrength::Strong));
        assert!(findings.iter().all(|f| f.p_value == 0.0));

        let az_depth = findings
            .iter()
            .find(|f| f.first == "deviation_azimuth" && f.second == "final_depth")
            .expect("azimuth vs depth");
        assert_eq!(az_depth.direction, CorrelationDirection::Positive);
        let inc_depth = findings
            .iter()
            .find(|f| f.first == "deviation_inclination" && f.second == "final_depth")
            .expect("inclination vs depth");
        assert_eq!(inc_depth.direction, CorrelationDirection::Negative);
        assert!(inc_depth.to_string().starts_with("strong negative correlation (-1.00)"));

        assert_eq!(m.between("initial_azimuth", "final_depth"), Some(0.0));
    }

    #[test]
    fn test_explore_empty_and_demo() {
        assert!(explore(&Dataset::default()).is_none());
        let report = explore(&crate::demo::generate(300, 8)).expect("report");
        assert_eq!(report.overview.rows, 300);
        assert_eq!(report.by_lithology.len(), 5);
        assert_eq!(report.by_company.len(), 5);
        let counted: usize = report.by_lithology.iter().map(|g| g.count).sum();
        assert_eq!(counted, 300);
    }
}
