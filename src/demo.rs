//! Synthetic demonstration dataset
//!
//! Deviations grow linearly with depth, collar orientation and rotation
//! speed, with fixed per-lithology and per-contractor offsets and Gaussian
//! scatter:
//!
//! ```text
//! Δaz  = 0.05 d + 0.02 az + 0.10 inc + 0.03 rpm + N(0, 10) + lith_az  + comp_az
//! Δinc = 0.03 d − 0.01 az + 0.05 inc + 0.02 rpm + N(0, 5)  + lith_inc + comp_inc
//! ```

use rand::prelude::*;
use rand_distr::StandardNormal;

use crate::types::{Dataset, DrillRecord};

pub const DEFAULT_DEMO_ROWS: usize = 1000;
pub const DEFAULT_DEMO_SEED: u64 = 42;

/// (name, azimuth offset °, inclination offset °)
pub const LITHOLOGY_EFFECTS: [(&str, f64, f64); 5] = [
    ("Granite", 2.0, 1.0),
    ("Schist", -1.5, 3.0),
    ("Gneiss", 0.5, -2.0),
    ("Limestone", -1.0, -1.5),
    ("Basalt", 3.0, 2.5),
];

/// (name, azimuth offset °, inclination offset °)
pub const COMPANY_EFFECTS: [(&str, f64, f64); 5] = [
    ("ForageTech", 1.5, 0.8),
    ("MineXpert", -1.0, -0.5),
    ("DrillPro", 0.0, 2.0),
    ("GeoForage", -2.0, -1.0),
    ("TerraDrill", 2.5, 1.5),
];

const AZIMUTH_SCATTER_DEG: f64 = 10.0;
const INCLINATION_SCATTER_DEG: f64 = 5.0;

/// Generate `n` demo records from `seed`.
///
/// Columns are drawn one at a time in schema order, then the scatter terms.
pub fn generate(n: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);

    let depth: Vec<f64> = (0..n).map(|_| rng.gen_range(100.0..1000.0)).collect();
    let azimuth: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..360.0)).collect();
    let inclination: Vec<f64> = (0..n).map(|_| rng.gen_range(-90.0..0.0)).collect();
    let rpm: Vec<f64> = (0..n).map(|_| rng.gen_range(50.0..200.0)).collect();
    let lithology: Vec<usize> = (0..n).map(|_| rng.gen_range(0..LITHOLOGY_EFFECTS.len())).collect();
    let company: Vec<usize> = (0..n).map(|_| rng.gen_range(0..COMPANY_EFFECTS.len())).collect();

    let az_scatter: Vec<f64> = (0..n)
        .map(|_| AZIMUTH_SCATTER_DEG * rng.sample::<f64, _>(StandardNormal))
        .collect();
    let inc_scatter: Vec<f64> = (0..n)
        .map(|_| INCLINATION_SCATTER_DEG * rng.sample::<f64, _>(StandardNormal))
        .collect();

    (0..n)
        .map(|i| {
            let (lith_name, lith_az, lith_inc) = LITHOLOGY_EFFECTS[lithology[i]];
            let (comp_name, comp_az, comp_inc) = COMPANY_EFFECTS[company[i]];
            let (d, az, inc, speed) = (depth[i], azimuth[i], inclination[i], rpm[i]);
            DrillRecord {
                final_depth: d,
                initial_azimuth: az,
                initial_inclination: inc,
                lithology: lith_name.to_string(),
                rotation_speed: speed,
                drilling_company: comp_name.to_string(),
                deviation_azimuth: 0.05 * d + 0.02 * az + 0.1 * inc + 0.03 * speed
                    + az_scatter[i]
                    + lith_az
                    + comp_az,
                deviation_inclination: 0.03 * d - 0.01 * az + 0.05 * inc + 0.02 * speed
                    + inc_scatter[i]
                    + lith_inc
                    + comp_inc,
            }
        })
        .collect()
}
