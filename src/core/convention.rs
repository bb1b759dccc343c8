//! Remapping between the estimator's axis convention and the published one.
//!
//! The estimator works in an optical-style frame (z forward, x left, y up)
//! with Euler angles `(rot_x, rot_y, rot_z)`. Consumers of the published
//! streams expect a quaternion in the usual body convention. The mapping is
//! fixed and must be reproduced exactly so that downstream consumers recover
//! the same physical orientation:
//!
//! ```text
//! internal (rx, ry, rz)
//!   q  = quat_from_rpy(roll = rz, pitch = -rx, yaw = -ry)
//!   q' = (x: -q.y, y: -q.z, z: q.x, w: q.w)        published
//!
//! published q'
//!   q  = (x: q'.z, y: -q'.x, z: -q'.y, w: q'.w)
//!   (roll, pitch, yaw) = rpy(q)
//!   (rx, ry, rz) = (-pitch, -yaw, roll)              internal
//! ```
//!
//! RPY follows the fixed-axis convention `R = Rz(yaw)·Ry(pitch)·Rx(roll)`.

use nalgebra::{Quaternion as NaQuaternion, UnitQuaternion};

use crate::core::types::{Pose6D, Quaternion};

/// Convert internal Euler angles to a published-convention quaternion.
pub fn to_published(rot_x: f64, rot_y: f64, rot_z: f64) -> Quaternion {
    let q = UnitQuaternion::from_euler_angles(rot_z, -rot_x, -rot_y);
    Quaternion::new(-q.j, -q.k, q.i, q.w)
}

/// Convert a published-convention quaternion back to internal Euler angles.
///
/// Non-unit input is normalized first.
pub fn from_published(q: &Quaternion) -> (f64, f64, f64) {
    // nalgebra's constructor takes (w, i, j, k).
    let internal = UnitQuaternion::from_quaternion(NaQuaternion::new(q.w, q.z, -q.x, -q.y));
    let (roll, pitch, yaw) = internal.euler_angles();
    (-pitch, -yaw, roll)
}

/// Published orientation of a pose.
#[inline]
pub fn pose_orientation(pose: &Pose6D) -> Quaternion {
    to_published(pose.rot_x, pose.rot_y, pose.rot_z)
}

/// Rebuild an internal pose from a published orientation and position.
#[inline]
pub fn pose_from_published(orientation: &Quaternion, position: [f64; 3]) -> Pose6D {
    let (rot_x, rot_y, rot_z) = from_published(orientation);
    Pose6D::new(rot_x, rot_y, rot_z, position[0], position[1], position[2])
}
