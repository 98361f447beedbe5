//! Drill-hole trajectory simulation
//!
//! Turns a planned collar orientation plus predicted angular deviations into
//! an interpolated 3-D path and an offset from the undeviated (ideal) hole.
//!
//! Coordinates are collar-relative, in metres:
//! - east  = d × cos(inc) × sin(az)
//! - north = d × cos(inc) × cos(az)
//! - up    = d × sin(inc)      (negative inclination points down)
//!
//! Azimuth is interpolated linearly in degrees between the collar and final
//! values without taking the short way round 360°; a path that crosses north
//! sweeps through the long arc.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inclination bounds (degrees): horizontal to straight down.
pub const MIN_INCLINATION: f64 = -90.0;
pub const MAX_INCLINATION: f64 = 0.0;

#[derive(Debug, Error, PartialEq)]
pub enum TrajectoryError {
    #[error("Invalid trajectory geometry: {0}")]
    InvalidGeometry(String),
}

/// Collar-relative position (m).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub east: f64,
    pub north: f64,
    pub up: f64,
}

impl Position {
    pub const ORIGIN: Position = Position { east: 0.0, north: 0.0, up: 0.0 };

    pub fn distance_to(&self, other: &Position) -> f64 {
        ((self.east - other.east).powi(2)
            + (self.north - other.north).powi(2)
            + (self.up - other.up).powi(2))
        .sqrt()
    }
}

/// One sample along the hole.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    /// Along-hole depth (m)
    pub depth: f64,
    /// Degrees
    pub azimuth: f64,
    /// Degrees
    pub inclination: f64,
    pub position: Position,
}

/// Ordered samples from collar to final depth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn end(&self) -> Option<&TrajectoryPoint> {
        self.points.last()
    }
}

/// End-of-hole figures derived from a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySummary {
    /// Degrees, in [0, 360)
    pub final_azimuth: f64,
    /// Degrees, in [-90, 0]
    pub final_inclination: f64,
    /// Simulated end of hole
    pub end: Position,
    /// End of hole with no deviation
    pub ideal_end: Position,
    /// Straight-line distance between `end` and `ideal_end` (m)
    pub deviation_distance: f64,
    /// Horizontal component of the offset (m)
    pub lateral_offset: f64,
    /// Vertical component of the offset (m, positive = shallower than planned)
    pub vertical_offset: f64,
}

// ============================================================================
// Geometry
// ============================================================================

/// Spherical (depth, azimuth°, inclination°) to collar-relative coordinates.
pub fn to_cartesian(depth: f64, azimuth_deg: f64, inclination_deg: f64) -> Position {
    let az = azimuth_deg.to_radians();
    let inc = inclination_deg.to_radians();
    Position {
        east: depth * inc.cos() * az.sin(),
        north: depth * inc.cos() * az.cos(),
        up: depth * inc.sin(),
    }
}

/// Euclidean remainder into [0, 360).
pub fn wrap_azimuth(azimuth_deg: f64) -> f64 {
    let wrapped = azimuth_deg.rem_euclid(360.0);
    // rem_euclid can round tiny negatives up to exactly 360
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

pub fn clamp_inclination(inclination_deg: f64) -> f64 {
    inclination_deg.clamp(MIN_INCLINATION, MAX_INCLINATION)
}

fn lerp(start: f64, end: f64, t: f64) -> f64 {
    if t >= 1.0 {
        end
    } else {
        start + t * (end - start)
    }
}

/// Simulate the hole path for a predicted deviation.
///
/// `num_points` samples are spaced evenly over [0, final_depth]; fewer than two
/// are raised to two when the depth is positive. A zero depth yields a single
/// point at the collar. The collar azimuth is wrapped and the collar
/// inclination clamped before anything is computed.
pub fn simulate(
    initial_azimuth: f64,
    initial_inclination: f64,
    final_depth: f64,
    delta_azimuth: f64,
    delta_inclination: f64,
    num_points: usize,
) -> Result<(Trajectory, TrajectorySummary), TrajectoryError> {
    let inputs = [
        ("initial_azimuth", initial_azimuth),
        ("initial_inclination", initial_inclination),
        ("final_depth", final_depth),
        ("delta_azimuth", delta_azimuth),
        ("delta_inclination", delta_inclination),
    ];
    if let Some((name, value)) = inputs.iter().find(|(_, v)| !v.is_finite()) {
        return Err(TrajectoryError::InvalidGeometry(format!("{name} is not finite ({value})")));
    }
    if final_depth < 0.0 {
        return Err(TrajectoryError::InvalidGeometry(format!(
            "final_depth must be non-negative, got {final_depth}"
        )));
    }

    // collar orientation normalized first so the ideal path shares its frame
    let initial_azimuth = wrap_azimuth(initial_azimuth);
    let initial_inclination = clamp_inclination(initial_inclination);

    let final_azimuth = wrap_azimuth(initial_azimuth + delta_azimuth);
    let final_inclination = clamp_inclination(initial_inclination + delta_inclination);

    let points = if final_depth == 0.0 {
        vec![TrajectoryPoint {
            depth: 0.0,
            azimuth: initial_azimuth,
            inclination: initial_inclination,
            position: Position::ORIGIN,
        }]
    } else {
        let count = num_points.max(2);
        let last = (count - 1) as f64;
        (0..count)
            .map(|i| {
                let t = i as f64 / last;
                let depth = lerp(0.0, final_depth, t);
                let azimuth = lerp(initial_azimuth, final_azimuth, t);
                let inclination = lerp(initial_inclination, final_inclination, t);
                TrajectoryPoint {
                    depth,
                    azimuth,
                    inclination,
                    position: to_cartesian(depth, azimuth, inclination),
                }
            })
            .collect()
    };

    let end = points.last().map_or(Position::ORIGIN, |p| p.position);
    let ideal_end = to_cartesian(final_depth, initial_azimuth, initial_inclination);
    let summary = TrajectorySummary {
        final_azimuth,
        final_inclination,
        end,
        ideal_end,
        deviation_distance: end.distance_to(&ideal_end),
        lateral_offset: (end.east - ideal_end.east).hypot(end.north - ideal_end.north),
        vertical_offset: end.up - ideal_end.up,
    };

    Ok((Trajectory { points }, summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_deviation_lands_on_ideal_endpoint() {
        let (traj, summary) = simulate(45.0, -60.0, 500.0, 0.0, 0.0, 100).expect("simulate");
        assert_eq!(traj.len(), 100);
        assert_eq!(summary.end, summary.ideal_end);
        assert_eq!(summary.deviation_distance, 0.0);
    }

    #[test]
    fn test_unnormalized_collar_still_lands_on_ideal_endpoint() {
        for (azimuth, inclination) in [(360.0, -60.0), (-45.0, -30.0), (725.0, -100.0)] {
            let (_, summary) =
                simulate(azimuth, inclination, 500.0, 0.0, 0.0, 100).expect("simulate");
            assert_eq!(summary.deviation_distance, 0.0, "collar ({azimuth}, {inclination})");
            assert_eq!(summary.end, summary.ideal_end);
        }
    }

    #[test]
    fn test_azimuth_wraps_past_north() {
        let (_, summary) = simulate(350.0, -45.0, 100.0, 20.0, 0.0, 10).expect("simulate");
        assert!((summary.final_azimuth - 10.0).abs() < 1e-9);
        let (_, summary) = simulate(10.0, -45.0, 100.0, -30.0, 0.0, 10).expect("simulate");
        assert!((summary.final_azimuth - 340.0).abs() < 1e-9);
        assert_eq!(wrap_azimuth(-1e-20), 0.0);
        assert_eq!(wrap_azimuth(720.0), 0.0);
    }

    #[test]
    fn test_inclination_clamped() {
        let (_, summary) = simulate(0.0, -100.0, 100.0, 0.0, -5.0, 10).expect("simulate");
        assert_eq!(summary.final_inclination, -90.0);
        let (_, summary) = simulate(0.0, -5.0, 100.0, 0.0, 20.0, 10).expect("simulate");
        assert_eq!(summary.final_inclination, 0.0);
    }

    #[test]
    fn test_zero_depth_single_collar_point() {
        let (traj, summary) = simulate(120.0, -70.0, 0.0, 4.0, 2.0, 100).expect("simulate");
        assert_eq!(traj.len(), 1);
        assert_eq!(traj.points()[0].position, Position::ORIGIN);
        assert_eq!(summary.deviation_distance, 0.0);
    }

    #[test]
    fn test_depths_evenly_spaced_and_end_exact() {
        let (traj, _) = simulate(0.0, -90.0, 300.0, 0.0, 0.0, 4).expect("simulate");
        for (p, expected) in traj.points().iter().zip([0.0, 100.0, 200.0, 300.0]) {
            assert!((p.depth - expected).abs() < 1e-9);
        }
        assert_eq!(traj.points()[3].depth, 300.0);
        // straight down
        let end = traj.end().expect("end point").position;
        assert!((end.up + 300.0).abs() < 1e-9);
        assert!(end.east.abs() < 1e-9 && end.north.abs() < 1e-9);
    }

    #[test]
    fn test_too_few_points_raised_to_two() {
        for n in [0, 1] {
            let (traj, _) = simulate(0.0, -45.0, 50.0, 1.0, 1.0, n).expect("simulate");
            assert_eq!(traj.len(), 2);
            assert_eq!(traj.points()[0].depth, 0.0);
            assert_eq!(traj.points()[1].depth, 50.0);
        }
    }

    #[test]
    fn test_offset_components() {
        // vertical hole tilted toward horizontal: pure lateral + vertical offset
        let (_, summary) = simulate(0.0, -90.0, 100.0, 0.0, 90.0, 10).expect("simulate");
        assert!((summary.end.north - 100.0).abs() < 1e-9);
        assert!((summary.lateral_offset - 100.0).abs() < 1e-9);
        assert!((summary.vertical_offset - 100.0).abs() < 1e-9);
        assert!((summary.deviation_distance - 100.0 * 2.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        assert!(matches!(
            simulate(0.0, -45.0, -1.0, 0.0, 0.0, 10),
            Err(TrajectoryError::InvalidGeometry(_))
        ));
        assert!(matches!(
            simulate(f64::NAN, -45.0, 10.0, 0.0, 0.0, 10),
            Err(TrajectoryError::InvalidGeometry(_))
        ));
        assert!(matches!(
            simulate(0.0, -45.0, 10.0, f64::INFINITY, 0.0, 10),
            Err(TrajectoryError::InvalidGeometry(_))
        ));
    }
}
