//! Bag file player.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::time::{Duration, Instant};

use super::types::{BagHeader, BagMessage, HEADER_SIZE, MAX_RECORD_BYTES};
use crate::error::{BagError, BagResult};

/// Reads bag records back, either as fast as possible or paced to the
/// recorded timing scaled by a speed factor.
pub struct BagPlayer {
    reader: BufReader<File>,
    header: BagHeader,
    playback_start: Option<(Instant, u64)>,
    playback_speed: f32,
    messages_read: u64,
}

impl BagPlayer {
    /// Open a bag file for playback.
    pub fn open(path: impl AsRef<Path>) -> BagResult<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut header_buffer = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header_buffer)?;
        let header = BagHeader::from_bytes(&header_buffer);

        if !header.is_valid() {
            return Err(BagError::InvalidFormat(
                "invalid bag file magic bytes".to_string(),
            ));
        }

        Ok(Self {
            reader,
            header,
            playback_start: None,
            playback_speed: 0.0,
            messages_read: 0,
        })
    }

    pub fn header(&self) -> &BagHeader {
        &self.header
    }

    pub fn message_count(&self) -> u64 {
        self.header.message_count
    }

    pub fn messages_read(&self) -> u64 {
        self.messages_read
    }

    /// Set playback speed.
    ///
    /// - 0.0 = as fast as possible
    /// - 1.0 = real-time
    /// - 2.0 = 2x speed
    pub fn set_speed(&mut self, speed: f32) {
        self.playback_speed = speed;
    }

    pub fn speed(&self) -> f32 {
        self.playback_speed
    }

    /// Read next message without timing delay. `None` at end of file.
    pub fn next_immediate(&mut self) -> BagResult<Option<BagMessage>> {
        let mut len_bytes = [0u8; 4];
        match self.reader.read_exact(&mut len_bytes) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let len = u32::from_le_bytes(len_bytes) as usize;
        if len > MAX_RECORD_BYTES {
            return Err(BagError::InvalidFormat(format!(
                "record too large: {} bytes",
                len
            )));
        }

        let mut payload = vec![0u8; len];
        self.reader.read_exact(&mut payload)?;
        let msg: BagMessage = postcard::from_bytes(&payload)?;

        self.messages_read += 1;
        Ok(Some(msg))
    }

    /// Read next message, blocking to match recorded timing when the
    /// speed is positive.
    pub fn next_paced(&mut self) -> BagResult<Option<BagMessage>> {
        let msg = self.next_immediate()?;
        if let Some(ref msg) = msg
            && self.playback_speed > 0.0
        {
            self.wait_for_timing(msg.timestamp_us());
        }
        Ok(msg)
    }

    fn wait_for_timing(&mut self, msg_time_us: u64) {
        let Some((start, first_us)) = self.playback_start else {
            self.playback_start = Some((Instant::now(), msg_time_us));
            return;
        };

        let offset_us = msg_time_us.saturating_sub(first_us);
        let target = Duration::from_micros((offset_us as f64 / self.playback_speed as f64) as u64);
        let elapsed = start.elapsed();
        if target > elapsed {
            std::thread::sleep(target - elapsed);
        }
    }

    /// Reset to beginning of file.
    pub fn rewind(&mut self) -> BagResult<()> {
        self.reader.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
        self.playback_start = None;
        self.messages_read = 0;
        Ok(())
    }
}

impl Iterator for BagPlayer {
    type Item = BagResult<BagMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_immediate().transpose()
    }
}
