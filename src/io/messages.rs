//! Published message types.
//!
//! These mirror the shapes downstream consumers expect: an odometry message
//! with quaternion orientation, a stamped point cloud and a frame transform.

use serde::{Deserialize, Serialize};

use crate::core::convention;
use crate::core::types::{PointCloud, Pose6D, Quaternion, Twist};

/// Stamped pose + twist, in the published axis convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdometryMsg {
    /// Timestamp in microseconds since epoch
    pub timestamp_us: u64,
    /// Parent frame
    pub frame_id: String,
    /// Child frame
    pub child_frame_id: String,
    pub orientation: Quaternion,
    /// Position [x, y, z] in meters
    pub position: [f64; 3],
    pub twist: Twist,
    /// Pose covariance diagonal (x, y, z, rot x, rot y, rot z)
    pub covariance_diagonal: [f64; 6],
}

impl OdometryMsg {
    /// Build a message from an internal pose.
    pub fn from_pose(
        pose: &Pose6D,
        timestamp_us: u64,
        frame_id: &str,
        child_frame_id: &str,
    ) -> Self {
        Self {
            timestamp_us,
            frame_id: frame_id.to_string(),
            child_frame_id: child_frame_id.to_string(),
            orientation: convention::pose_orientation(pose),
            position: [pose.x, pose.y, pose.z],
            twist: Twist::zero(),
            covariance_diagonal: [0.0; 6],
        }
    }

    /// Decode the pose back into the internal convention.
    pub fn pose(&self) -> Pose6D {
        convention::pose_from_published(&self.orientation, self.position)
    }

    /// Full 6×6 row-major covariance with the diagonal filled in.
    pub fn covariance_matrix(&self) -> [f64; 36] {
        let mut cov = [0.0; 36];
        for (i, value) in self.covariance_diagonal.iter().enumerate() {
            cov[i * 7] = *value;
        }
        cov
    }
}

/// Stamped point cloud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudMsg {
    /// Timestamp in microseconds since epoch
    pub timestamp_us: u64,
    pub frame_id: String,
    pub cloud: PointCloud,
}

/// Frame transform broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformMsg {
    /// Timestamp in microseconds since epoch
    pub timestamp_us: u64,
    pub frame_id: String,
    pub child_frame_id: String,
    pub rotation: Quaternion,
    /// Translation [x, y, z] in meters
    pub translation: [f64; 3],
}

impl TransformMsg {
    /// Transform carrying the same pose as an odometry message.
    pub fn from_odometry(msg: &OdometryMsg) -> Self {
        Self {
            timestamp_us: msg.timestamp_us,
            frame_id: msg.frame_id.clone(),
            child_frame_id: msg.child_frame_id.clone(),
            rotation: msg.orientation,
            translation: msg.position,
        }
    }
}
