//! Six-channel sweep synchronizer.
//!
//! Each sweep is split by scan registration into six artifacts that arrive
//! independently, in any order, from the delivery thread. The synchronizer
//! keeps only the newest value per channel (last writer wins, no queue) and
//! reports a frame as ready once all six are fresh and stamped within
//! [`SYNC_TOLERANCE_US`] of the less-flat surface channel.
//!
//! # Concurrency
//!
//! All six slots live behind a single mutex. An arrival replaces the
//! payload, the stamp and the freshness flag in one critical section, so a
//! reader never sees a payload paired with another arrival's stamp.
//! [`StreamSynchronizer::take_frame`] checks readiness, snapshots the
//! payloads and clears the flags under the same lock: an arrival racing with
//! consumption lands either inside the snapshot or after it, fresh for the
//! next frame.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::types::{PointCloud, Timestamped};
use crate::sensors::channels::ChannelId;

/// Maximum stamp difference against the reference channel (5 ms, exclusive).
pub const SYNC_TOLERANCE_US: u64 = 5_000;

#[derive(Debug, Default, Clone)]
struct ChannelSlot {
    /// Last payload, kept after consumption until overwritten.
    latest: Option<Timestamped<Arc<PointCloud>>>,
    fresh: bool,
}

/// Arrival counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    /// Arrivals per channel, in [`ChannelId::ALL`] order.
    pub arrivals: [u64; 6],
    /// Fresh payloads replaced before any frame consumed them.
    pub overwritten: u64,
    /// Frames handed out.
    pub frames: u64,
}

#[derive(Debug, Default)]
struct SyncState {
    slots: [ChannelSlot; 6],
    stats: SyncStats,
}

impl SyncState {
    fn is_ready(&self) -> bool {
        if !self.slots.iter().all(|s| s.fresh) {
            return false;
        }
        let Some(reference) = &self.slots[ChannelId::REFERENCE.index()].latest else {
            return false;
        };
        self.slots.iter().all(|slot| {
            slot.latest
                .as_ref()
                .is_some_and(|p| p.skew_us(reference) < SYNC_TOLERANCE_US)
        })
    }

    fn clear_flags(&mut self) {
        for slot in &mut self.slots {
            slot.fresh = false;
        }
    }
}

/// Complete, time-aligned set of sweep artifacts.
#[derive(Debug, Clone)]
pub struct SynchronizedFrame {
    /// Stamp of the less-flat surface channel.
    pub timestamp_us: u64,
    corner_sharp: Arc<PointCloud>,
    corner_less_sharp: Arc<PointCloud>,
    surf_flat: Arc<PointCloud>,
    surf_less_flat: Arc<PointCloud>,
    full_res: Arc<PointCloud>,
    imu_trans: Arc<PointCloud>,
}

impl SynchronizedFrame {
    /// Payload of one channel.
    pub fn cloud(&self, channel: ChannelId) -> &Arc<PointCloud> {
        match channel {
            ChannelId::CornerSharp => &self.corner_sharp,
            ChannelId::CornerLessSharp => &self.corner_less_sharp,
            ChannelId::SurfFlat => &self.surf_flat,
            ChannelId::SurfLessFlat => &self.surf_less_flat,
            ChannelId::FullRes => &self.full_res,
            ChannelId::ImuTrans => &self.imu_trans,
        }
    }
}

/// Freshness and alignment gate in front of the motion estimator.
///
/// Shared between the delivery thread (arrivals) and the odometry control
/// loop (consumption); every method takes `&self`.
#[derive(Debug, Default)]
pub struct StreamSynchronizer {
    state: Mutex<SyncState>,
}

impl StreamSynchronizer {
    /// Create an empty synchronizer. No channel is fresh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the newest payload for a channel and mark it fresh.
    ///
    /// Any unconsumed previous payload on the same channel is replaced.
    /// Non-finite points are dropped from the geometric clouds before
    /// storing. The motion record is stored as-is since it is decoded by
    /// point index.
    pub fn on_channel_arrived(&self, channel: ChannelId, timestamp_us: u64, mut cloud: PointCloud) {
        if channel.is_point_cloud() {
            let removed = cloud.remove_nan();
            if removed > 0 {
                log::trace!("{}: dropped {} non-finite points", channel, removed);
            }
        }
        let payload = Timestamped::new(cloud, timestamp_us).map(Arc::new);

        let mut state = self.state.lock();
        let idx = channel.index();
        state.stats.arrivals[idx] += 1;
        if state.slots[idx].fresh {
            state.stats.overwritten += 1;
        }
        let slot = &mut state.slots[idx];
        slot.latest = Some(payload);
        slot.fresh = true;
    }

    /// True iff all six channels are fresh and within tolerance of the
    /// reference stamp.
    pub fn is_frame_ready(&self) -> bool {
        self.state.lock().is_ready()
    }

    /// Clear every freshness flag.
    ///
    /// Stored payloads stay readable until overwritten. Prefer
    /// [`take_frame`](Self::take_frame), which checks and clears atomically.
    pub fn consume_frame(&self) {
        self.state.lock().clear_flags();
    }

    /// Check readiness, snapshot the payloads and clear the flags in one step.
    ///
    /// Returns `None` when the frame is not ready; nothing is cleared then.
    pub fn take_frame(&self) -> Option<SynchronizedFrame> {
        let mut state = self.state.lock();
        if !state.is_ready() {
            return None;
        }

        let get = |channel: ChannelId| -> Option<Timestamped<Arc<PointCloud>>> {
            state.slots[channel.index()].latest.clone()
        };
        let reference = get(ChannelId::REFERENCE)?;
        let frame = SynchronizedFrame {
            timestamp_us: reference.timestamp_us,
            corner_sharp: get(ChannelId::CornerSharp)?.data,
            corner_less_sharp: get(ChannelId::CornerLessSharp)?.data,
            surf_flat: get(ChannelId::SurfFlat)?.data,
            surf_less_flat: reference.data,
            full_res: get(ChannelId::FullRes)?.data,
            imu_trans: get(ChannelId::ImuTrans)?.data,
        };

        state.clear_flags();
        state.stats.frames += 1;
        Some(frame)
    }

    /// Stamp of the latest payload on a channel, if any arrived.
    pub fn timestamp_us(&self, channel: ChannelId) -> Option<u64> {
        self.state.lock().slots[channel.index()]
            .latest
            .as_ref()
            .map(|p| p.timestamp_us)
    }

    /// Latest payload on a channel, fresh or not.
    pub fn latest(&self, channel: ChannelId) -> Option<Timestamped<Arc<PointCloud>>> {
        self.state.lock().slots[channel.index()].latest.clone()
    }

    /// Whether a channel has an unconsumed payload.
    pub fn is_fresh(&self, channel: ChannelId) -> bool {
        self.state.lock().slots[channel.index()].fresh
    }

    /// Arrival counters.
    pub fn stats(&self) -> SyncStats {
        self.state.lock().stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Point3D;

    fn cloud(n: usize) -> PointCloud {
        PointCloud::from_points(vec![Point3D::new(1.0, 0.0, 0.0, 0.0); n])
    }

    /// Deliver all six channels; `skew` offsets the stamp of `skewed`.
    fn deliver_all(sync: &StreamSynchronizer, base_us: u64, skewed: ChannelId, skew: u64) {
        for channel in ChannelId::ALL {
            let ts = if channel == skewed { base_us + skew } else { base_us };
            sync.on_channel_arrived(channel, ts, cloud(3));
        }
    }

    #[test]
    fn test_not_ready_until_all_channels_fresh() {
        let sync = StreamSynchronizer::new();
        for channel in &ChannelId::ALL[..5] {
            sync.on_channel_arrived(*channel, 1_000_000, cloud(1));
            assert!(!sync.is_frame_ready());
        }
        sync.on_channel_arrived(ChannelId::ImuTrans, 1_000_000, cloud(4));
        assert!(sync.is_frame_ready());
    }

    #[test]
    fn test_ready_exactly_once_per_input_set() {
        let sync = StreamSynchronizer::new();
        let base = 2_000_000;
        for (i, channel) in ChannelId::ALL.iter().enumerate() {
            sync.on_channel_arrived(*channel, base + i as u64 * 800, cloud(2));
        }
        assert!(sync.is_frame_ready());

        sync.consume_frame();
        assert!(!sync.is_frame_ready());

        // Five of six channels refreshed: still not ready.
        for channel in &ChannelId::ALL[1..] {
            sync.on_channel_arrived(*channel, base + 100_000, cloud(2));
        }
        assert!(!sync.is_frame_ready());

        sync.on_channel_arrived(ChannelId::CornerSharp, base + 100_000, cloud(2));
        assert!(sync.is_frame_ready());
    }

    #[test]
    fn test_tolerance_boundary() {
        let sync = StreamSynchronizer::new();
        deliver_all(&sync, 5_000_000, ChannelId::FullRes, 5_000);
        assert!(!sync.is_frame_ready(), "5.000 ms skew must be rejected");

        let sync = StreamSynchronizer::new();
        deliver_all(&sync, 5_000_000, ChannelId::FullRes, 4_999);
        assert!(sync.is_frame_ready(), "4.999 ms skew must be accepted");
    }

    #[test]
    fn test_tolerance_is_against_reference_not_pairwise() {
        // Two channels 8 ms apart, each within 4 ms of the reference.
        let sync = StreamSynchronizer::new();
        let base = 10_000_000;
        for channel in ChannelId::ALL {
            let ts = match channel {
                ChannelId::CornerSharp => base - 4_000,
                ChannelId::FullRes => base + 4_000,
                _ => base,
            };
            sync.on_channel_arrived(channel, ts, cloud(1));
        }
        assert!(sync.is_frame_ready());
    }

    #[test]
    fn test_last_writer_wins() {
        let sync = StreamSynchronizer::new();
        sync.on_channel_arrived(ChannelId::SurfFlat, 1_000, cloud(1));
        sync.on_channel_arrived(ChannelId::SurfFlat, 2_000, cloud(7));

        let latest = sync.latest(ChannelId::SurfFlat).unwrap();
        assert_eq!(latest.timestamp_us, 2_000);
        assert_eq!(latest.data.len(), 7);
        assert_eq!(sync.stats().overwritten, 1);
        assert_eq!(sync.stats().arrivals[ChannelId::SurfFlat.index()], 2);
    }

    #[test]
    fn test_misaligned_stale_channel_blocks_until_overwritten() {
        let sync = StreamSynchronizer::new();
        deliver_all(&sync, 1_000_000, ChannelId::ImuTrans, 20_000);
        assert!(!sync.is_frame_ready());

        sync.on_channel_arrived(ChannelId::ImuTrans, 1_000_500, cloud(4));
        assert!(sync.is_frame_ready());
    }

    #[test]
    fn test_take_frame_snapshots_and_clears() {
        let sync = StreamSynchronizer::new();
        assert!(sync.take_frame().is_none());

        deliver_all(&sync, 3_000_000, ChannelId::CornerSharp, 1_000);
        let frame = sync.take_frame().expect("frame should be ready");
        assert_eq!(frame.timestamp_us, 3_000_000);
        assert_eq!(frame.cloud(ChannelId::FullRes).len(), 3);

        assert!(sync.take_frame().is_none());
        for channel in ChannelId::ALL {
            assert!(!sync.is_fresh(channel));
            // Payloads stay visible after consumption.
            assert!(sync.latest(channel).is_some());
        }
        assert_eq!(sync.stats().frames, 1);
    }

    #[test]
    fn test_take_frame_leaves_flags_when_not_ready() {
        let sync = StreamSynchronizer::new();
        sync.on_channel_arrived(ChannelId::SurfLessFlat, 1_000, cloud(1));
        assert!(sync.take_frame().is_none());
        assert!(sync.is_fresh(ChannelId::SurfLessFlat));
    }

    #[test]
    fn test_arrival_drops_non_finite_points() {
        let sync = StreamSynchronizer::new();
        let mut c = cloud(2);
        c.points.push(Point3D::new(f32::NAN, 0.0, 0.0, 0.0));
        sync.on_channel_arrived(ChannelId::CornerSharp, 1_000, c);
        assert_eq!(sync.latest(ChannelId::CornerSharp).unwrap().data.len(), 2);
    }

    #[test]
    fn test_motion_record_keeps_non_finite_slots() {
        use crate::sensors::channels::ImuTrans;

        let sync = StreamSynchronizer::new();
        let record = PointCloud::from_points(vec![
            Point3D::new(f32::NAN, f32::NAN, f32::NAN, 0.0),
            Point3D::new(0.1, 0.2, 0.3, 0.0),
            Point3D::new(0.0, 0.0, 1.0, 0.0),
            Point3D::new(5.0, 5.0, 5.0, 0.0),
        ]);
        sync.on_channel_arrived(ChannelId::ImuTrans, 1_000, record);

        let stored = sync.latest(ChannelId::ImuTrans).unwrap();
        assert_eq!(stored.data.len(), 4);
        let imu = ImuTrans::from_cloud(&stored.data);
        assert!((imu.pitch_end - 0.1).abs() < 1e-6);
        assert_eq!(imu.shift_from_start, [0.0, 0.0, 1.0]);
        assert_eq!(imu.velocity_from_start, [5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_concurrent_arrivals_are_never_lost() {
        use std::thread;

        let sync = Arc::new(StreamSynchronizer::new());
        let rounds = 200u64;

        let producer = {
            let sync = Arc::clone(&sync);
            thread::spawn(move || {
                for r in 0..rounds {
                    for channel in ChannelId::ALL {
                        sync.on_channel_arrived(channel, r * 100_000, cloud(1));
                    }
                }
            })
        };

        let mut taken = 0u64;
        while !producer.is_finished() {
            if sync.take_frame().is_some() {
                taken += 1;
            }
        }
        producer.join().unwrap();
        if sync.take_frame().is_some() {
            taken += 1;
        }

        let stats = sync.stats();
        assert_eq!(stats.frames, taken);
        assert!(taken >= 1 && taken <= rounds);
        assert_eq!(stats.arrivals, [rounds; 6]);
    }
}
