//! Daemon threads.
//!
//! - `OdometryThread`: fixed-rate synchronizer polling and estimation
//! - `FusionThread`: fuses laser odometry with map corrections
//! - `ReplayThread`: feeds a recorded bag into the pipeline
//! - `RecordThread`: writes published messages to a bag
//!
//! All loops exit when the shared `running` flag is cleared.

mod fusion_thread;
mod odometry_thread;
mod record_thread;
mod replay_thread;

pub use fusion_thread::FusionThread;
pub use odometry_thread::OdometryThread;
pub use record_thread::RecordThread;
pub use replay_thread::{ReplayConfig, ReplayThread};
