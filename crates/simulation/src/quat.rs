//! Quaternion helpers for motion on the unit sphere
//!
//! A position quaternion places a point on the sphere by rotating
//! [`REFERENCE_POINT`]. Velocity quaternions are rotations per frame; raising
//! one to a fractional power scales its angle and keeps its axis, which is
//! what dead reckoning between frames needs.

use glam::{DQuat, DVec3};

/// Point on the sphere represented by the identity position
pub const REFERENCE_POINT: DVec3 = DVec3::Z;

const DEGENERATE_LENGTH_SQUARED: f64 = 1e-24;
const AXIS_EPSILON: f64 = 1e-15;

/// Sphere-motion operations on unit quaternions
pub trait SphereQuat: Sized {
    /// Rotation `self` followed by `other`, renormalized
    fn compose(self, other: Self) -> Self;

    /// Scales the rotation angle by `t`, keeping the axis
    fn pow(self, t: f64) -> Self;

    /// Unit-length copy; non-finite or zero quaternions become the identity
    fn renormalized(self) -> Self;

    /// Point on the unit sphere this position quaternion stands for
    fn sphere_point(self) -> DVec3;

    /// Great-circle angle in radians between two position quaternions
    fn angular_distance(self, other: Self) -> f64;
}

impl SphereQuat for DQuat {
    fn compose(self, other: DQuat) -> DQuat {
        (self * other).renormalized()
    }

    fn pow(self, t: f64) -> DQuat {
        let mut q = self.renormalized();
        // q and -q are the same rotation; take the short way round
        if q.w < 0.0 {
            q = -q;
        }

        let v = DVec3::new(q.x, q.y, q.z);
        let sin_half = v.length();
        if sin_half < AXIS_EPSILON {
            return DQuat::IDENTITY;
        }

        let half_angle = sin_half.atan2(q.w);
        DQuat::from_axis_angle(v / sin_half, 2.0 * half_angle * t).renormalized()
    }

    fn renormalized(self) -> DQuat {
        let length_squared = self.length_squared();
        if !length_squared.is_finite() || length_squared < DEGENERATE_LENGTH_SQUARED {
            return DQuat::IDENTITY;
        }
        self / length_squared.sqrt()
    }

    fn sphere_point(self) -> DVec3 {
        self.renormalized() * REFERENCE_POINT
    }

    fn angular_distance(self, other: DQuat) -> f64 {
        let a = self.sphere_point();
        let b = other.sphere_point();
        // atan2 keeps precision for the tiny angles reconciliation compares
        a.cross(b).length().atan2(a.dot(b))
    }
}
