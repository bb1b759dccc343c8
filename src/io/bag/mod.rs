//! Bag file recording and playback.
//!
//! Bags capture the six raw channel inputs (for offline replay through the
//! odometry pipeline) and any published pose or cloud message.
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │ Header (64 bytes, little-endian)                 │
//! │ - Magic: "GBAG" (4 bytes)                        │
//! │ - Version: u16                                   │
//! │ - Flags: u16                                     │
//! │ - Start time: u64 (microseconds)                 │
//! │ - End time: u64 (microseconds)                   │
//! │ - Message count: u64                             │
//! │ - Index offset: u64 (0 if no index)              │
//! │ - Reserved: 24 bytes                             │
//! ├──────────────────────────────────────────────────┤
//! │ Message Stream                                   │
//! │ [len:u32][postcard payload]...                   │
//! └──────────────────────────────────────────────────┘
//! ```

mod player;
mod recorder;
mod types;

pub use player::BagPlayer;
pub use recorder::BagRecorder;
pub use types::{BAG_MAGIC, BAG_VERSION, BagHeader, BagInfo, BagMessage, HEADER_SIZE};
