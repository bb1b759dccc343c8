//! Velocity attached to the corrected-pose stream.

use serde::{Deserialize, Serialize};

/// Angular and linear velocity.
///
/// Only the map corrector fills this in; fusion copies it onto the fused
/// output unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Twist {
    /// Angular velocity [x, y, z]
    pub angular: [f64; 3],
    /// Linear velocity [x, y, z]
    pub linear: [f64; 3],
}

impl Twist {
    /// Create a new twist.
    #[inline]
    pub fn new(angular: [f64; 3], linear: [f64; 3]) -> Self {
        Self { angular, linear }
    }

    /// Zero velocity.
    #[inline]
    pub fn zero() -> Self {
        Self::default()
    }
}
