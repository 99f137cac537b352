//! 2-D vector primitives and speed/course conversion

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// Planar vector used for both positions (m) and velocities (m/s)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn norm_squared(self) -> f64 {
        self.dot(self)
    }

    /// Euclidean length, computed with `hypot` to avoid intermediate overflow
    pub fn norm(self) -> f64 {
        self.x.hypot(self.y)
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Convert speed and course into a Cartesian velocity.
///
/// Course is in degrees, measured counter-clockwise from the +x axis
/// (0° = +x, 90° = +y). This is the mathematical convention, not a
/// compass bearing.
pub fn course_to_velocity(speed: f64, course_deg: f64) -> Vec2 {
    let rad = course_deg * std::f64::consts::PI / 180.0;
    Vec2::new(speed * rad.cos(), speed * rad.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_to_velocity_axes() {
        let east = course_to_velocity(10.0, 0.0);
        assert!((east.x - 10.0).abs() < 1e-12);
        assert!(east.y.abs() < 1e-12);

        let north = course_to_velocity(10.0, 90.0);
        assert!(north.x.abs() < 1e-12);
        assert!((north.y - 10.0).abs() < 1e-12);

        let west = course_to_velocity(5.0, 180.0);
        assert!((west.x + 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_ownship_default_course() {
        // 20 m/s at 30°
        let v = course_to_velocity(20.0, 30.0);
        assert!((v.x - 17.320508075688775).abs() < 1e-9);
        assert!((v.y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_vector_ops() {
        let a = Vec2::new(3.0, 4.0);
        let b = Vec2::new(1.0, -2.0);
        assert_eq!(a - b, Vec2::new(2.0, 6.0));
        assert_eq!(a + b * 2.0, Vec2::new(5.0, 0.0));
        assert_eq!(a.dot(b), -5.0);
        assert_eq!(a.norm(), 5.0);
        assert_eq!(a.norm_squared(), 25.0);
    }
}
