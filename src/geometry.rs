//! 3D positions, orientations and bearing math
//!
//! All coordinates share the scene frame reported by the localization backend.
//! The horizontal plane is x–z; y points up. Yaw is measured clockwise from +z,
//! so a target at +x sits at yaw 90.

use serde::{Deserialize, Serialize};

/// A point in the shared scene frame (meters)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position3D {
    /// Create a position
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl std::fmt::Display for Position3D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// Facing direction in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    /// Horizontal rotation, clockwise from +z
    pub yaw: f64,
    /// Vertical tilt
    #[serde(default)]
    pub pitch: f64,
}

impl Orientation {
    /// Create an orientation
    #[must_use]
    pub const fn new(yaw: f64, pitch: f64) -> Self {
        Self { yaw, pitch }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "yaw {:.1}°, pitch {:.1}°", self.yaw, self.pitch)
    }
}

/// 3D Euclidean distance between two positions
///
/// Non-finite results collapse to 0.
#[must_use]
pub fn distance(a: &Position3D, b: &Position3D) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    let dz = a.z - b.z;
    finite_or_zero((dx * dx + dy * dy + dz * dz).sqrt())
}

/// Distance between two positions projected onto the x–z plane
///
/// Non-finite results collapse to 0.
#[must_use]
pub fn horizontal_distance(a: &Position3D, b: &Position3D) -> f64 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    finite_or_zero(dx.hypot(dz))
}

/// Bearing of `to` as seen from `from`, using the yaw convention
///
/// Returns degrees in (−180, 180]. Coincident points yield 0.
#[must_use]
pub fn bearing_to(from: &Position3D, to: &Position3D) -> f64 {
    let dx = to.x - from.x;
    let dz = to.z - from.z;
    normalize_angle(dx.atan2(dz).to_degrees())
}

/// Fold an angle in degrees into (−180, 180]
///
/// Non-finite input yields 0.
#[must_use]
pub fn normalize_angle(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }

    let mut angle = degrees % 360.0;
    if angle > 180.0 {
        angle -= 360.0;
    } else if angle <= -180.0 {
        angle += 360.0;
    }
    angle
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_distance_is_symmetric() {
        let a = Position3D::new(1.0, 2.0, 3.0);
        let b = Position3D::new(-4.0, 0.5, 7.0);

        assert!((distance(&a, &b) - distance(&b, &a)).abs() < EPS);
        assert!((distance(&a, &b) - 43.25_f64.sqrt()).abs() < EPS);
    }

    #[test]
    fn test_non_finite_distances_collapse_to_zero() {
        let origin = Position3D::new(0.0, 0.0, 0.0);
        let far = Position3D::new(f64::INFINITY, 0.0, 1.0);
        let broken = Position3D::new(f64::NAN, 1.0, 1.0);

        assert!(distance(&origin, &far).abs() < EPS);
        assert!(horizontal_distance(&origin, &far).abs() < EPS);
        assert!(distance(&origin, &broken).abs() < EPS);
        assert!(horizontal_distance(&broken, &origin).abs() < EPS);
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let a = Position3D::new(3.5, -1.0, 9.0);
        assert!(distance(&a, &a).abs() < EPS);
        assert!(horizontal_distance(&a, &a).abs() < EPS);
    }

    #[test]
    fn test_horizontal_distance_ignores_height() {
        let a = Position3D::new(0.0, 0.0, 0.0);
        let b = Position3D::new(3.0, 0.0, 4.0);
        let b_raised = Position3D::new(3.0, 12.0, 4.0);
        let a_lowered = Position3D::new(0.0, -7.5, 0.0);

        assert!((horizontal_distance(&a, &b) - 5.0).abs() < EPS);
        assert!((horizontal_distance(&a, &b_raised) - 5.0).abs() < EPS);
        assert!((horizontal_distance(&a_lowered, &b) - 5.0).abs() < EPS);
    }

    #[test]
    fn test_nan_distance_collapses_to_zero() {
        let a = Position3D::new(f64::NAN, 0.0, 0.0);
        let b = Position3D::new(1.0, 0.0, 0.0);
        assert!(distance(&a, &b).abs() < EPS);
        assert!(horizontal_distance(&a, &b).abs() < EPS);
    }

    #[test]
    fn test_bearing_follows_yaw_convention() {
        let origin = Position3D::new(0.0, 0.0, 0.0);

        assert!(bearing_to(&origin, &Position3D::new(0.0, 0.0, 5.0)).abs() < EPS);
        assert!((bearing_to(&origin, &Position3D::new(5.0, 0.0, 0.0)) - 90.0).abs() < EPS);
        assert!((bearing_to(&origin, &Position3D::new(-5.0, 0.0, 0.0)) + 90.0).abs() < EPS);
        assert!((bearing_to(&origin, &Position3D::new(0.0, 0.0, -5.0)) - 180.0).abs() < EPS);
        assert!((bearing_to(&origin, &Position3D::new(-0.0, 0.0, -5.0)) - 180.0).abs() < EPS);
    }

    #[test]
    fn test_bearing_of_coincident_points_is_stable() {
        let p = Position3D::new(1.0, 1.0, 1.0);
        assert!(bearing_to(&p, &p).abs() < EPS);
        assert!(bearing_to(&p, &Position3D::new(1.0, 9.0, 1.0)).abs() < EPS);
    }

    #[test]
    fn test_normalize_angle_range() {
        assert!((normalize_angle(180.0) - 180.0).abs() < EPS);
        assert!((normalize_angle(-180.0) - 180.0).abs() < EPS);
        assert!((normalize_angle(190.0) + 170.0).abs() < EPS);
        assert!((normalize_angle(-190.0) - 170.0).abs() < EPS);
        assert!((normalize_angle(720.0 + 45.0) - 45.0).abs() < EPS);
        assert!((normalize_angle(-540.0) - 180.0).abs() < EPS);
        assert!(normalize_angle(f64::NAN).abs() < EPS);

        for raw in [-1000.0, -359.0, -181.0, -0.5, 0.0, 179.9, 360.0, 1234.5] {
            let a = normalize_angle(raw);
            assert!(a > -180.0 && a <= 180.0, "{raw} folded to {a}");
        }
    }

    #[test]
    fn test_orientation_pitch_defaults_when_missing() {
        let orientation: Orientation = serde_json::from_str(r#"{"yaw": 30.0}"#).unwrap();
        assert!((orientation.yaw - 30.0).abs() < EPS);
        assert!(orientation.pitch.abs() < EPS);
    }
}
