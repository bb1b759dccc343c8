//! Sensor-side processing: channel identities and sweep synchronization.
//!
//! - [`ChannelId`]: The six sweep-derived inputs
//! - [`ImuTrans`]: Per-sweep motion-compensation record
//! - [`StreamSynchronizer`]: Freshness + alignment gate for the estimator

mod channels;
mod synchronizer;

pub use channels::{ChannelId, ImuTrans};
pub use synchronizer::{SYNC_TOLERANCE_US, StreamSynchronizer, SyncStats, SynchronizedFrame};
