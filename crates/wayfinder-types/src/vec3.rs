//! A minimal 3-D vector type shared across the wayfinder crates.
//!
//! Probe directions, hit points, surface normals, and head positions are all
//! plain [`Vec3`] values; no scene-graph or engine math library is involved.

use serde::{Deserialize, Serialize};

/// A 3-D vector (or point) with `f32` components.
///
/// `y` is the vertical axis: `Vec3::UP` is `(0, 1, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    /// The zero vector.
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };
    /// World-up.
    pub const UP: Vec3 = Vec3 { x: 0.0, y: 1.0, z: 0.0 };
    /// World-right, used as a fallback rotation axis when a candidate axis
    /// is parallel to [`Vec3::UP`].
    pub const RIGHT: Vec3 = Vec3 { x: 1.0, y: 0.0, z: 0.0 };

    /// Create a new vector.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Dot product.
    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product.
    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Euclidean length.
    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Distance to `other`.
    pub fn distance(self, other: Vec3) -> f32 {
        (self - other).length()
    }

    /// Return a unit-length copy, or [`Vec3::ZERO`] when the length is too
    /// small to normalize safely.
    pub fn normalized(self) -> Vec3 {
        let len = self.length();
        if len < 1e-6 { Vec3::ZERO } else { self * (1.0 / len) }
    }

    /// Linear interpolation from `self` to `other` by `t` (unclamped).
    pub fn lerp(self, other: Vec3, t: f32) -> Vec3 {
        self + (other - self) * t
    }

    /// Angle between `self` and `other` in radians.
    ///
    /// Returns `0.0` when either vector is (near-)zero.
    pub fn angle_between(self, other: Vec3) -> f32 {
        let denom = self.length() * other.length();
        if denom < 1e-12 {
            return 0.0;
        }
        (self.dot(other) / denom).clamp(-1.0, 1.0).acos()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl std::ops::Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_of_orthogonal_vectors_is_zero() {
        assert_eq!(Vec3::UP.dot(Vec3::RIGHT), 0.0);
    }

    #[test]
    fn cross_follows_right_hand_rule() {
        let z = Vec3::RIGHT.cross(Vec3::UP);
        assert!((z.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normalized_returns_unit_length() {
        let v = Vec3::new(3.0, 4.0, 0.0).normalized();
        assert!((v.length() - 1.0).abs() < 1e-6);
        assert!((v.x - 0.6).abs() < 1e-6);
    }

    #[test]
    fn normalized_zero_vector_is_zero() {
        assert_eq!(Vec3::ZERO.normalized(), Vec3::ZERO);
    }

    #[test]
    fn lerp_midpoint() {
        let mid = Vec3::ZERO.lerp(Vec3::new(2.0, 0.0, 0.0), 0.5);
        assert!((mid.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 6.0, 3.0);
        assert!((a.distance(b) - 5.0).abs() < 1e-6);
        assert!((b.distance(a) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn angle_between_perpendicular_is_half_pi() {
        let angle = Vec3::UP.angle_between(Vec3::RIGHT);
        assert!((angle - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn angle_between_zero_vector_is_zero() {
        assert_eq!(Vec3::ZERO.angle_between(Vec3::UP), 0.0);
    }
}
