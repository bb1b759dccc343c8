//! Rotation primitives for the sweep-odometry convention.
//!
//! Rotations are stored as three Euler angles `(rot_x, rot_y, rot_z)` and
//! composed as `R = Ry(rot_y) · Rx(rot_x) · Rz(rot_z)`: a point is rotated
//! about z first, then x, then y.

use nalgebra::{Rotation3, Vector3};
use std::f64::consts::PI;

/// Normalize angle to [-π, π].
#[inline]
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// Build the rotation matrix for the given Euler angles.
pub fn rotation_yxz(rot_x: f64, rot_y: f64, rot_z: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::y_axis(), rot_y)
        * Rotation3::from_axis_angle(&Vector3::x_axis(), rot_x)
        * Rotation3::from_axis_angle(&Vector3::z_axis(), rot_z)
}

/// Recover `(rot_x, rot_y, rot_z)` from a rotation matrix.
///
/// ```text
/// R[1][2] = -sin(rx)
/// R[0][2] =  sin(ry)·cos(rx),  R[2][2] = cos(ry)·cos(rx)
/// R[1][0] =  cos(rx)·sin(rz),  R[1][1] = cos(rx)·cos(rz)
/// ```
pub fn euler_yxz(rotation: &Rotation3<f64>) -> (f64, f64, f64) {
    let m = rotation.matrix();
    let rot_x = (-m[(1, 2)]).clamp(-1.0, 1.0).asin();
    let rot_y = m[(0, 2)].atan2(m[(2, 2)]);
    let rot_z = m[(1, 0)].atan2(m[(1, 1)]);
    (rot_x, rot_y, rot_z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_normalize_angle() {
        assert_relative_eq!(normalize_angle(3.0 * PI), PI, epsilon = 1e-9);
        assert_relative_eq!(normalize_angle(-FRAC_PI_2), -FRAC_PI_2);
        assert_relative_eq!(normalize_angle(2.0 * PI + 0.25), 0.25, epsilon = 1e-9);
    }

    #[test]
    fn test_rotation_order_is_z_then_x_then_y() {
        // Rz(90°) takes x to y, Rx(90°) then takes y to z, Ry(0) is identity.
        let r = rotation_yxz(FRAC_PI_2, 0.0, FRAC_PI_2);
        let p = r * Vector3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(p, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_euler_roundtrip() {
        for &(rx, ry, rz) in &[
            (0.1, -0.4, 2.9),
            (-1.2, 3.0, -0.7),
            (0.0, 0.0, 0.0),
            (1.4, -2.2, 0.3),
        ] {
            let (ex, ey, ez) = euler_yxz(&rotation_yxz(rx, ry, rz));
            assert_relative_eq!(ex, rx, epsilon = 1e-9);
            assert_relative_eq!(ey, ry, epsilon = 1e-9);
            assert_relative_eq!(ez, rz, epsilon = 1e-9);
        }
    }
}
