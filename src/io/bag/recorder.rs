//! Bag file recorder.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::types::{BagHeader, BagInfo, BagMessage, HEADER_SIZE};
use crate::core::types::{PointCloud, Timestamped};
use crate::error::BagResult;
use crate::io::bus::BusMessage;
use crate::sensors::ChannelId;

/// Writes length-prefixed postcard records after a reserved header.
///
/// Call [`finish`](Self::finish) to write the header; a bag that is never
/// finished has a zeroed header and is rejected by the player.
pub struct BagRecorder {
    writer: BufWriter<File>,
    path: PathBuf,
    message_count: u64,
    channel_count: u64,
    published_count: u64,
    start_time_us: Option<u64>,
    end_time_us: u64,
}

impl BagRecorder {
    /// Create a new bag file, truncating any existing one.
    pub fn create(path: impl AsRef<Path>) -> BagResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(&[0u8; HEADER_SIZE])?;

        Ok(Self {
            writer,
            path,
            message_count: 0,
            channel_count: 0,
            published_count: 0,
            start_time_us: None,
            end_time_us: 0,
        })
    }

    /// Record a raw channel input.
    pub fn record_channel(
        &mut self,
        channel: ChannelId,
        cloud: &Timestamped<PointCloud>,
    ) -> BagResult<()> {
        self.record_message(&BagMessage::Channel {
            channel,
            cloud: cloud.clone(),
        })
    }

    /// Record a message seen on the bus. Transforms are not stored.
    pub fn record_bus(&mut self, topic: &str, msg: &BusMessage) -> BagResult<()> {
        let record = match msg {
            BusMessage::Odometry(m) => BagMessage::Odometry {
                topic: topic.to_string(),
                msg: m.clone(),
            },
            BusMessage::Cloud(m) => BagMessage::Cloud {
                topic: topic.to_string(),
                msg: m.clone(),
            },
            BusMessage::Transform(_) => return Ok(()),
        };
        self.record_message(&record)
    }

    /// Record a generic bag message.
    pub fn record_message(&mut self, msg: &BagMessage) -> BagResult<()> {
        let timestamp = msg.timestamp_us();
        if self.start_time_us.is_none() {
            self.start_time_us = Some(timestamp);
        }
        self.end_time_us = timestamp;

        let bytes = postcard::to_allocvec(msg)?;
        self.writer.write_all(&(bytes.len() as u32).to_le_bytes())?;
        self.writer.write_all(&bytes)?;

        self.message_count += 1;
        if msg.is_channel() {
            self.channel_count += 1;
        } else {
            self.published_count += 1;
        }
        Ok(())
    }

    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    pub fn duration_us(&self) -> u64 {
        self.end_time_us
            .saturating_sub(self.start_time_us.unwrap_or(0))
    }

    /// Write the header and close the file.
    pub fn finish(mut self) -> BagResult<BagInfo> {
        self.writer.flush()?;
        let file_size = self.writer.stream_position()?;

        let header = BagHeader {
            start_time_us: self.start_time_us.unwrap_or(0),
            end_time_us: self.end_time_us,
            message_count: self.message_count,
            ..BagHeader::new()
        };

        self.writer.seek(SeekFrom::Start(0))?;
        self.writer.write_all(&header.to_bytes())?;
        self.writer.flush()?;

        let duration_us = self.duration_us();
        Ok(BagInfo {
            path: self.path,
            duration_us,
            message_count: self.message_count,
            file_size_bytes: file_size,
            channel_count: self.channel_count,
            published_count: self.published_count,
        })
    }
}
