//! Six degree-of-freedom pose in the estimator's internal convention.

use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::core::math::{euler_yxz, rotation_yxz};

/// Rigid-body pose: Euler rotation `(rot_x, rot_y, rot_z)` plus position.
///
/// This is the representation the motion estimator and the fusion math work
/// in. It is never put on the wire directly; published messages carry a
/// [`Quaternion`] in the external axis convention instead
/// (see [`crate::core::convention`]).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose6D {
    /// Rotation about x in radians
    pub rot_x: f64,
    /// Rotation about y in radians
    pub rot_y: f64,
    /// Rotation about z in radians
    pub rot_z: f64,
    /// X position in meters
    pub x: f64,
    /// Y position in meters
    pub y: f64,
    /// Z position in meters
    pub z: f64,
}

impl Pose6D {
    /// Create a new pose.
    #[inline]
    pub fn new(rot_x: f64, rot_y: f64, rot_z: f64, x: f64, y: f64, z: f64) -> Self {
        Self {
            rot_x,
            rot_y,
            rot_z,
            x,
            y,
            z,
        }
    }

    /// Identity pose.
    #[inline]
    pub fn identity() -> Self {
        Self::default()
    }

    /// Build a pose from a rotation matrix and a position.
    pub fn from_rotation(rotation: &Rotation3<f64>, position: &Vector3<f64>) -> Self {
        let (rot_x, rot_y, rot_z) = euler_yxz(rotation);
        Self::new(rot_x, rot_y, rot_z, position.x, position.y, position.z)
    }

    /// Rotation matrix `Ry · Rx · Rz`.
    #[inline]
    pub fn rotation(&self) -> Rotation3<f64> {
        rotation_yxz(self.rot_x, self.rot_y, self.rot_z)
    }

    /// Position vector.
    #[inline]
    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Compose two poses: `self ⊕ other`.
    ///
    /// ```text
    /// R = R_self · R_other
    /// t = t_self + R_self · t_other
    /// ```
    pub fn compose(&self, other: &Pose6D) -> Pose6D {
        let r = self.rotation();
        Pose6D::from_rotation(
            &(r * other.rotation()),
            &(self.position() + r * other.position()),
        )
    }

    /// Inverse transform.
    pub fn inverse(&self) -> Pose6D {
        let r_inv = self.rotation().inverse();
        Pose6D::from_rotation(&r_inv, &(-(r_inv * self.position())))
    }

    /// Map a point from this pose's local frame into the parent frame.
    #[inline]
    pub fn transform_point(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.rotation() * point + self.position()
    }

    /// Scale every component linearly, used to interpolate along a sweep.
    #[inline]
    pub fn scaled(&self, s: f64) -> Pose6D {
        Pose6D::new(
            self.rot_x * s,
            self.rot_y * s,
            self.rot_z * s,
            self.x * s,
            self.y * s,
            self.z * s,
        )
    }
}

/// Orientation quaternion in the published axis convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    /// Create a quaternion from its components.
    #[inline]
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Identity quaternion (no rotation).
    #[inline]
    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}
