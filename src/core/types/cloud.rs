//! 3D point cloud types for sweep payloads.

use serde::{Deserialize, Serialize};

/// A single lidar return.
///
/// Scan registration packs the ring index into the integer part of
/// `intensity` and the relative time within the sweep into its fractional
/// part, so `intensity` is not a reflectance value here.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: f32,
}

impl Point3D {
    /// Create a new point.
    #[inline]
    pub fn new(x: f32, y: f32, z: f32, intensity: f32) -> Self {
        Self { x, y, z, intensity }
    }

    /// Whether all three coordinates are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Unordered set of points.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointCloud {
    pub points: Vec<Point3D>,
}

impl PointCloud {
    /// Create an empty cloud.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cloud from points.
    pub fn from_points(points: Vec<Point3D>) -> Self {
        Self { points }
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the cloud has no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Drop points with NaN or infinite coordinates.
    ///
    /// Returns the number of points removed.
    pub fn remove_nan(&mut self) -> usize {
        let before = self.points.len();
        self.points.retain(Point3D::is_finite);
        before - self.points.len()
    }
}
