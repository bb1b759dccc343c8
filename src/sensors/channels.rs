//! Input channel identities and the per-sweep motion record.

use serde::{Deserialize, Serialize};

use crate::core::types::{Point3D, PointCloud};

/// One of the six sweep-derived inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelId {
    /// Sharpest corner points.
    CornerSharp,
    /// Corner points, less strict selection.
    CornerLessSharp,
    /// Flattest surface points.
    SurfFlat,
    /// Surface points, less strict selection. Reference stamp for the frame.
    SurfLessFlat,
    /// Full-resolution sweep.
    FullRes,
    /// Motion-compensation record for the sweep.
    ImuTrans,
}

impl ChannelId {
    /// All channels, in slot order.
    pub const ALL: [ChannelId; 6] = [
        ChannelId::CornerSharp,
        ChannelId::CornerLessSharp,
        ChannelId::SurfFlat,
        ChannelId::SurfLessFlat,
        ChannelId::FullRes,
        ChannelId::ImuTrans,
    ];

    /// Channel whose stamp the others are compared against.
    pub const REFERENCE: ChannelId = ChannelId::SurfLessFlat;

    /// Slot index in `ALL`.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// True for the five geometric clouds. The motion record is positional
    /// and must not be filtered.
    pub fn is_point_cloud(self) -> bool {
        self != ChannelId::ImuTrans
    }

    /// Default topic name.
    pub fn default_topic(self) -> &'static str {
        match self {
            ChannelId::CornerSharp => "laser_cloud_sharp",
            ChannelId::CornerLessSharp => "laser_cloud_less_sharp",
            ChannelId::SurfFlat => "laser_cloud_flat",
            ChannelId::SurfLessFlat => "laser_cloud_less_flat",
            ChannelId::FullRes => "velodyne_cloud_2",
            ChannelId::ImuTrans => "imu_trans",
        }
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.default_topic())
    }
}

/// Motion of the platform over one sweep, as measured by the IMU.
///
/// Scan registration ships this as a four-point cloud:
///
/// | Point | x | y | z |
/// |-------|---|---|---|
/// | 0 | pitch at sweep start | yaw at sweep start | roll at sweep start |
/// | 1 | pitch at sweep end | yaw at sweep end | roll at sweep end |
/// | 2 | shift from start x | y | z |
/// | 3 | velocity from start x | y | z |
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImuTrans {
    pub pitch_start: f64,
    pub yaw_start: f64,
    pub roll_start: f64,
    pub pitch_end: f64,
    pub yaw_end: f64,
    pub roll_end: f64,
    pub shift_from_start: [f64; 3],
    pub velocity_from_start: [f64; 3],
}

impl ImuTrans {
    /// Decode from the four-point cloud. Missing points read as zero.
    pub fn from_cloud(cloud: &PointCloud) -> Self {
        let at = |i: usize| -> [f64; 3] {
            cloud
                .points
                .get(i)
                .map(|p| [p.x as f64, p.y as f64, p.z as f64])
                .unwrap_or([0.0; 3])
        };
        let start = at(0);
        let end = at(1);

        Self {
            pitch_start: start[0],
            yaw_start: start[1],
            roll_start: start[2],
            pitch_end: end[0],
            yaw_end: end[1],
            roll_end: end[2],
            shift_from_start: at(2),
            velocity_from_start: at(3),
        }
    }

    /// Encode as the four-point cloud.
    pub fn to_cloud(&self) -> PointCloud {
        let p = |v: [f64; 3]| Point3D::new(v[0] as f32, v[1] as f32, v[2] as f32, 0.0);
        PointCloud::from_points(vec![
            p([self.pitch_start, self.yaw_start, self.roll_start]),
            p([self.pitch_end, self.yaw_end, self.roll_end]),
            p(self.shift_from_start),
            p(self.velocity_from_start),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_channel_indices_match_slots() {
        for (i, channel) in ChannelId::ALL.iter().enumerate() {
            assert_eq!(channel.index(), i);
        }
        assert_eq!(ChannelId::REFERENCE.default_topic(), "laser_cloud_less_flat");
    }

    #[test]
    fn test_imu_trans_cloud_roundtrip() {
        let record = ImuTrans {
            pitch_start: 0.01,
            yaw_start: -0.02,
            roll_start: 0.03,
            pitch_end: 0.04,
            yaw_end: 0.05,
            roll_end: -0.06,
            shift_from_start: [0.1, 0.0, 0.25],
            velocity_from_start: [1.0, -0.5, 0.0],
        };
        let decoded = ImuTrans::from_cloud(&record.to_cloud());
        assert_relative_eq!(decoded.yaw_end, 0.05, epsilon = 1e-6);
        assert_relative_eq!(decoded.shift_from_start[2], 0.25, epsilon = 1e-6);
        assert_relative_eq!(decoded.velocity_from_start[1], -0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_imu_trans_short_cloud_reads_zero() {
        let cloud = PointCloud::from_points(vec![Point3D::new(0.5, 0.0, 0.0, 0.0)]);
        let decoded = ImuTrans::from_cloud(&cloud);
        assert_relative_eq!(decoded.pitch_start, 0.5);
        assert_eq!(decoded.shift_from_start, [0.0; 3]);
    }
}
