//! Motion estimator interface and the IMU-driven reference estimator.
//!
//! The estimator turns a synchronized sweep into a pose increment. Feature
//! matching lives behind [`MotionEstimator`] so that alternative estimators
//! can be swapped in without touching synchronization or fusion.

use std::sync::Arc;

use nalgebra::Vector3;

use crate::core::math::normalize_angle;
use crate::core::types::{Point3D, PointCloud, Pose6D};
use crate::error::{ConfigError, ConfigResult};
use crate::sensors::{ChannelId, ImuTrans, SynchronizedFrame};

/// Convergence and timing policy handed to the estimator at construction.
///
/// `scan_period` is used by every estimator for per-point timing. The
/// iteration budget and abort thresholds only drive estimators that iterate
/// a feature match. [`ImuShiftEstimator`] carries them unused so that the
/// policy stays visible through [`MotionEstimator::config`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorConfig {
    /// Duration of one sweep in seconds.
    pub scan_period: f64,
    /// Iteration budget per sweep.
    pub max_iterations: usize,
    /// Translation change (cm) below which iterations stop.
    pub delta_t_abort: f64,
    /// Rotation change (deg) below which iterations stop.
    pub delta_r_abort: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            scan_period: 0.1,
            max_iterations: 25,
            delta_t_abort: 0.1,
            delta_r_abort: 0.1,
        }
    }
}

impl EstimatorConfig {
    /// Reject non-positive thresholds and empty iteration budgets.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.scan_period > 0.0 && self.scan_period.is_finite()) {
            return Err(ConfigError::invalid(
                "odometry.scan_period",
                self.scan_period,
                "> 0",
            ));
        }
        if self.max_iterations < 1 {
            return Err(ConfigError::invalid(
                "odometry.max_iterations",
                self.max_iterations,
                ">= 1",
            ));
        }
        if !(self.delta_t_abort > 0.0) {
            return Err(ConfigError::invalid(
                "odometry.delta_t_abort",
                self.delta_t_abort,
                "> 0",
            ));
        }
        if !(self.delta_r_abort > 0.0) {
            return Err(ConfigError::invalid(
                "odometry.delta_r_abort",
                self.delta_r_abort,
                "> 0",
            ));
        }
        Ok(())
    }
}

/// Result of estimating one sweep.
#[derive(Debug, Clone)]
pub struct Estimate {
    /// Motion over this sweep.
    pub increment: Pose6D,
    /// Pose at sweep end relative to the first sweep.
    pub accumulated: Pose6D,
    /// Corner points of this sweep, kept for matching the next one.
    pub corner_last: Arc<PointCloud>,
    /// Surface points of this sweep, kept for matching the next one.
    pub surface_last: Arc<PointCloud>,
}

/// Computes sweep-to-sweep motion from a synchronized frame.
pub trait MotionEstimator: Send {
    /// Estimate the motion over the sweep in `frame`.
    ///
    /// `imu` is the decoded motion-compensation record of the same sweep.
    fn estimate(&mut self, frame: &SynchronizedFrame, imu: &ImuTrans) -> Estimate;

    /// Re-project a sweep's points into the sensor frame at sweep end,
    /// using the increment of the last [`estimate`](Self::estimate) call.
    fn transform_to_end(&self, cloud: &mut PointCloud);

    /// Convergence policy this estimator runs with.
    fn config(&self) -> &EstimatorConfig;
}

/// Estimator that trusts the IMU motion record for the sweep increment.
///
/// No geometric matching is performed; the increment is the orientation
/// change between sweep start and end plus the IMU shift. Useful for replay
/// and as a stand-in while a matching estimator is not wired up.
#[derive(Debug)]
pub struct ImuShiftEstimator {
    config: EstimatorConfig,
    increment: Pose6D,
    accumulated: Pose6D,
}

impl ImuShiftEstimator {
    /// Create a new estimator at the origin.
    pub fn new(config: EstimatorConfig) -> Self {
        log::debug!(
            "IMU shift estimator: scan period {}s, matching policy unused \
             ({} iterations, abort {} cm / {} deg)",
            config.scan_period,
            config.max_iterations,
            config.delta_t_abort,
            config.delta_r_abort
        );
        Self {
            config,
            increment: Pose6D::identity(),
            accumulated: Pose6D::identity(),
        }
    }

    /// Fraction of the sweep at which `point` was measured, in [0, 1].
    fn relative_time(&self, point: &Point3D) -> f64 {
        let frac = (point.intensity - point.intensity.floor()) as f64;
        (frac / self.config.scan_period).clamp(0.0, 1.0)
    }
}

impl MotionEstimator for ImuShiftEstimator {
    fn estimate(&mut self, frame: &SynchronizedFrame, imu: &ImuTrans) -> Estimate {
        self.increment = Pose6D::new(
            normalize_angle(imu.pitch_end - imu.pitch_start),
            normalize_angle(imu.yaw_end - imu.yaw_start),
            normalize_angle(imu.roll_end - imu.roll_start),
            imu.shift_from_start[0],
            imu.shift_from_start[1],
            imu.shift_from_start[2],
        );
        self.accumulated = self.accumulated.compose(&self.increment);

        Estimate {
            increment: self.increment,
            accumulated: self.accumulated,
            corner_last: Arc::clone(frame.cloud(ChannelId::CornerLessSharp)),
            surface_last: Arc::clone(frame.cloud(ChannelId::SurfLessFlat)),
        }
    }

    fn transform_to_end(&self, cloud: &mut PointCloud) {
        // A point measured at fraction s sits at pose s·T in the start frame;
        // the sweep-end frame is T.
        let end_inv = self.increment.inverse();
        for point in &mut cloud.points {
            let s = self.relative_time(point);
            let in_start = self
                .increment
                .scaled(s)
                .transform_point(&Vector3::new(point.x as f64, point.y as f64, point.z as f64));
            let in_end = end_inv.transform_point(&in_start);
            point.x = in_end.x as f32;
            point.y = in_end.y as f32;
            point.z = in_end.z as f32;
        }
    }

    fn config(&self) -> &EstimatorConfig {
        &self.config
    }
}
