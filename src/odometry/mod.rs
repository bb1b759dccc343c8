//! Laser odometry stage.
//!
//! - [`MotionEstimator`]: sweep-to-sweep motion from a synchronized frame
//! - [`ImuShiftEstimator`]: estimator driven by the per-sweep IMU record
//! - [`OdometryOrchestrator`]: the fixed-rate step that ties synchronizer,
//!   estimator and publisher together

mod estimator;
mod orchestrator;

pub use estimator::{Estimate, EstimatorConfig, ImuShiftEstimator, MotionEstimator};
pub use orchestrator::{
    OdometryOrchestrator, OrchestratorConfig, TickOutcome, should_publish_clouds,
};
