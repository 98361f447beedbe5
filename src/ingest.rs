//! CSV ingestion for drill-hole datasets
//!
//! Header-driven: each schema field is located by the first of its accepted
//! column names present in the header (case-insensitive). The defaults accept
//! the schema names plus the French field names used by older survey exports
//! (`profondeur_finale`, `lithologie`, `company`, ...).
//!
//! Numeric fields and both targets are required. A missing categorical column,
//! or an empty categorical cell, takes the documented default label.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::types::{CategoricalFeature, Dataset, DrillRecord, NumericFeature, Target};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to read dataset: {0}")]
    Io(#[from] io::Error),

    #[error("Required column for '{field}' not found (accepted names: {accepted})")]
    MissingColumn { field: &'static str, accepted: String },

    #[error("Line {line}: invalid value '{value}' in column '{column}'")]
    InvalidValue { line: usize, column: String, value: String },

    #[error("Dataset has no header row")]
    Empty,
}

// ============================================================================
// Column Mapping
// ============================================================================

/// Accepted source column names per schema field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub final_depth: Vec<String>,
    pub initial_azimuth: Vec<String>,
    pub initial_inclination: Vec<String>,
    pub lithology: Vec<String>,
    pub rotation_speed: Vec<String>,
    pub drilling_company: Vec<String>,
    pub deviation_azimuth: Vec<String>,
    pub deviation_inclination: Vec<String>,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            final_depth: names(&["final_depth", "profondeur_finale", "depth"]),
            initial_azimuth: names(&["initial_azimuth", "azimuth_initial", "azimuth"]),
            initial_inclination: names(&["initial_inclination", "inclinaison_initiale", "inclination"]),
            lithology: names(&["lithology", "lithologie"]),
            rotation_speed: names(&["rotation_speed", "vitesse_rotation", "rpm"]),
            drilling_company: names(&["drilling_company", "company", "entreprise"]),
            deviation_azimuth: names(&["deviation_azimuth"]),
            deviation_inclination: names(&["deviation_inclination", "deviation_inclinaison"]),
        }
    }
}

impl ColumnMapping {
    pub fn numeric(&self, field: NumericFeature) -> &[String] {
        match field {
            NumericFeature::FinalDepth => &self.final_depth,
            NumericFeature::InitialAzimuth => &self.initial_azimuth,
            NumericFeature::InitialInclination => &self.initial_inclination,
            NumericFeature::RotationSpeed => &self.rotation_speed,
        }
    }

    pub fn categorical(&self, field: CategoricalFeature) -> &[String] {
        match field {
            CategoricalFeature::Lithology => &self.lithology,
            CategoricalFeature::DrillingCompany => &self.drilling_company,
        }
    }

    pub fn target(&self, target: Target) -> &[String] {
        match target {
            Target::Azimuth => &self.deviation_azimuth,
            Target::Inclination => &self.deviation_inclination,
        }
    }
}

/// Index of the first accepted name present in the header.
fn find_column(header: &[String], accepted: &[String]) -> Option<usize> {
    accepted.iter().find_map(|name| {
        let name = name.trim();
        header.iter().position(|h| h.trim().eq_ignore_ascii_case(name))
    })
}

fn require_column(
    header: &[String],
    accepted: &[String],
    field: &'static str,
) -> Result<usize, IngestError> {
    find_column(header, accepted).ok_or_else(|| IngestError::MissingColumn {
        field,
        accepted: accepted.join(", "),
    })
}

/// Split one CSV line, honouring double quotes and `""` escapes.
pub(crate) fn csv_split(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

// ============================================================================
// Reading
// ============================================================================

/// Load a dataset from a CSV file.
pub fn load_csv(path: impl AsRef<Path>, mapping: &ColumnMapping) -> Result<Dataset, IngestError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let dataset = parse_csv(BufReader::new(file), mapping)?;
    info!(path = %path.display(), rows = dataset.len(), "Loaded dataset");
    Ok(dataset)
}

/// Parse CSV text from any buffered reader.
pub fn parse_csv<R: BufRead>(reader: R, mapping: &ColumnMapping) -> Result<Dataset, IngestError> {
    let mut lines = reader.lines().enumerate();

    let header = loop {
        match lines.next() {
            Some((_, line)) => {
                let line = line?;
                let line = line.trim_start_matches('\u{feff}');
                if !line.trim().is_empty() {
                    break csv_split(line);
                }
            }
            None => return Err(IngestError::Empty),
        }
    };

    let numeric_cols = NumericFeature::ALL
        .iter()
        .map(|&f| Ok((f, require_column(&header, mapping.numeric(f), f.name())?)))
        .collect::<Result<Vec<_>, IngestError>>()?;
    let target_cols = Target::ALL
        .iter()
        .map(|&t| Ok((t, require_column(&header, mapping.target(t), t.name())?)))
        .collect::<Result<Vec<_>, IngestError>>()?;
    let category_cols: Vec<(CategoricalFeature, Option<usize>)> = CategoricalFeature::ALL
        .iter()
        .map(|&f| (f, find_column(&header, mapping.categorical(f))))
        .collect();
    for (field, col) in &category_cols {
        if col.is_none() {
            debug!(field = field.name(), default = field.default_label(), "Categorical column absent");
        }
    }

    let mut records = Vec::new();
    for (idx, line) in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = idx + 1;
        let cells = csv_split(&line);

        let parse = |col: usize| -> Result<f64, IngestError> {
            let raw = cells.get(col).map_or("", |s| s.trim());
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| IngestError::InvalidValue {
                    line: line_no,
                    column: header[col].trim().to_string(),
                    value: raw.to_string(),
                })
        };

        let mut record = DrillRecord {
            final_depth: 0.0,
            initial_azimuth: 0.0,
            initial_inclination: 0.0,
            lithology: String::new(),
            rotation_speed: 0.0,
            drilling_company: String::new(),
            deviation_azimuth: 0.0,
            deviation_inclination: 0.0,
        };
        for &(field, col) in &numeric_cols {
            *record.feature_mut(field) = parse(col)?;
        }
        for &(target, col) in &target_cols {
            *record.target_mut(target) = parse(col)?;
        }
        for &(field, col) in &category_cols {
            if let Some(value) = col.and_then(|c| cells.get(c)) {
                *record.category_mut(field) = value.trim().to_string();
            }
        }
        records.push(record);
    }

    // Blank labels are replaced with defaults here.
    Ok(Dataset::new(records))
}

// ============================================================================
// Writing
// ============================================================================

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Canonical header in schema order.
pub fn header() -> Vec<&'static str> {
    vec![
        NumericFeature::FinalDepth.name(),
        NumericFeature::InitialAzimuth.name(),
        NumericFeature::InitialInclination.name(),
        CategoricalFeature::Lithology.name(),
        NumericFeature::RotationSpeed.name(),
        CategoricalFeature::DrillingCompany.name(),
        Target::Azimuth.name(),
        Target::Inclination.name(),
    ]
}

/// Write a dataset with the canonical schema header.
pub fn write_csv<W: Write>(dataset: &Dataset, mut writer: W) -> io::Result<()> {
    writeln!(writer, "{}", header().join(","))?;
    for r in dataset {
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{}",
            r.final_depth,
            r.initial_azimuth,
            r.initial_inclination,
            quote(&r.lithology),
            r.rotation_speed,
            quote(&r.drilling_company),
            r.deviation_azimuth,
            r.deviation_inclination,
        )?;
    }
    writer.flush()
}
