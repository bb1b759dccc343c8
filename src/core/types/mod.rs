//! Core data types.
//!
//! - [`Timestamped<T>`]: Generic timestamp wrapper
//! - [`Pose6D`]: Euler + position pose in the estimator's convention
//! - [`Quaternion`]: Orientation in the published convention
//! - [`Twist`]: Angular and linear velocity
//! - [`Point3D`], [`PointCloud`]: Sweep payloads

mod cloud;
mod pose;
mod timestamped;
mod twist;

pub use cloud::{Point3D, PointCloud};
pub use pose::{Pose6D, Quaternion};
pub use timestamped::Timestamped;
pub use twist::Twist;
