//! Bag file format types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::types::{PointCloud, Timestamped};
use crate::io::messages::{CloudMsg, OdometryMsg};
use crate::sensors::ChannelId;

/// Magic bytes at start of bag file.
pub const BAG_MAGIC: [u8; 4] = *b"GBAG";

/// Current bag file format version.
pub const BAG_VERSION: u16 = 1;

/// Size of the bag file header in bytes.
pub const HEADER_SIZE: usize = 64;

/// Largest record the player accepts.
pub const MAX_RECORD_BYTES: usize = 64 * 1024 * 1024;

/// Bag file header (64 bytes fixed size, little-endian fields).
#[derive(Debug, Clone, PartialEq)]
pub struct BagHeader {
    /// Magic bytes: "GBAG"
    pub magic: [u8; 4],
    pub version: u16,
    pub flags: u16,
    /// Timestamp of first message (microseconds)
    pub start_time_us: u64,
    /// Timestamp of last message (microseconds)
    pub end_time_us: u64,
    pub message_count: u64,
    /// Byte offset to index section (0 if no index)
    pub index_offset: u64,
    pub reserved: [u8; 24],
}

impl BagHeader {
    pub fn new() -> Self {
        Self {
            magic: BAG_MAGIC,
            version: BAG_VERSION,
            flags: 0,
            start_time_us: 0,
            end_time_us: 0,
            message_count: 0,
            index_offset: 0,
            reserved: [0; 24],
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == BAG_MAGIC
    }

    pub fn duration_us(&self) -> u64 {
        self.end_time_us.saturating_sub(self.start_time_us)
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_us() as f64 / 1_000_000.0
    }

    /// Encode into the on-disk layout.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..6].copy_from_slice(&self.version.to_le_bytes());
        buf[6..8].copy_from_slice(&self.flags.to_le_bytes());
        buf[8..16].copy_from_slice(&self.start_time_us.to_le_bytes());
        buf[16..24].copy_from_slice(&self.end_time_us.to_le_bytes());
        buf[24..32].copy_from_slice(&self.message_count.to_le_bytes());
        buf[32..40].copy_from_slice(&self.index_offset.to_le_bytes());
        buf[40..].copy_from_slice(&self.reserved);
        buf
    }

    /// Decode the on-disk layout. Magic is not checked here.
    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Self {
        let u16_at = |i: usize| u16::from_le_bytes([buf[i], buf[i + 1]]);
        let u64_at = |i: usize| {
            let mut b = [0u8; 8];
            b.copy_from_slice(&buf[i..i + 8]);
            u64::from_le_bytes(b)
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&buf[0..4]);
        let mut reserved = [0u8; 24];
        reserved.copy_from_slice(&buf[40..]);

        Self {
            magic,
            version: u16_at(4),
            flags: u16_at(6),
            start_time_us: u64_at(8),
            end_time_us: u64_at(16),
            message_count: u64_at(24),
            index_offset: u64_at(32),
            reserved,
        }
    }
}

impl Default for BagHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Message types stored in bag files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BagMessage {
    /// Raw sweep-derived input for one synchronizer channel
    Channel {
        channel: ChannelId,
        cloud: Timestamped<PointCloud>,
    },
    /// Pose on a named topic (laser odometry, corrected or fused)
    Odometry { topic: String, msg: OdometryMsg },
    /// Published cloud on a named topic
    Cloud { topic: String, msg: CloudMsg },
}

impl BagMessage {
    /// Get the timestamp of this message in microseconds.
    pub fn timestamp_us(&self) -> u64 {
        match self {
            BagMessage::Channel { cloud, .. } => cloud.timestamp_us,
            BagMessage::Odometry { msg, .. } => msg.timestamp_us,
            BagMessage::Cloud { msg, .. } => msg.timestamp_us,
        }
    }

    pub fn is_channel(&self) -> bool {
        matches!(self, BagMessage::Channel { .. })
    }
}

/// Summary returned after recording.
#[derive(Debug, Clone)]
pub struct BagInfo {
    pub path: PathBuf,
    pub duration_us: u64,
    pub message_count: u64,
    pub file_size_bytes: u64,
    /// Number of raw channel messages
    pub channel_count: u64,
    /// Number of published pose and cloud messages
    pub published_count: u64,
}

impl BagInfo {
    pub fn duration_secs(&self) -> f64 {
        self.duration_us as f64 / 1_000_000.0
    }

    /// Average message rate in Hz.
    pub fn message_rate_hz(&self) -> f64 {
        if self.duration_us == 0 {
            0.0
        } else {
            self.message_count as f64 / self.duration_secs()
        }
    }
}
