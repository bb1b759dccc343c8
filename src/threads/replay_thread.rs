//! Bag replay thread.
//!
//! Plays a recorded bag into the pipeline: channel records, and clouds
//! recorded on one of the input topics, go to the synchronizer. Corrected
//! poses go to the bus. Recorded outputs of the pipeline itself are skipped
//! since replay regenerates them.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::TopicNames;
use crate::error::BagResult;
use crate::io::bag::{BagMessage, BagPlayer};
use crate::io::{BusMessage, Publisher};
use crate::sensors::StreamSynchronizer;

/// Replay settings.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub path: PathBuf,
    /// Start over at end of file
    pub loop_playback: bool,
    /// Speed factor, 0 for as fast as possible
    pub speed: f32,
    /// Input topics routed to the synchronizer, and the corrected pose
    /// topic forwarded to the bus
    pub topics: TopicNames,
    /// Time left for the pipeline to drain before shutdown at end of file
    pub drain_grace: Duration,
}

/// Handle to the replay thread.
pub struct ReplayThread {
    handle: JoinHandle<()>,
}

impl ReplayThread {
    /// Open the bag and spawn the replay loop.
    ///
    /// The bag is opened before spawning so that a missing or corrupt file
    /// is reported to the caller.
    pub fn spawn(
        config: ReplayConfig,
        synchronizer: Arc<StreamSynchronizer>,
        publisher: Arc<dyn Publisher>,
        running: Arc<AtomicBool>,
    ) -> BagResult<Self> {
        let mut player = BagPlayer::open(&config.path)?;
        player.set_speed(config.speed);
        log::info!(
            "Replaying {} ({} messages, {:.1}s) at {}x",
            config.path.display(),
            player.message_count(),
            player.header().duration_secs(),
            player.speed()
        );

        let handle = thread::Builder::new()
            .name("replay".into())
            .spawn(move || {
                run_replay_loop(config, player, synchronizer, publisher, running);
            })?;

        Ok(Self { handle })
    }

    /// Wait for the thread to finish.
    pub fn join(self) {
        if let Err(e) = self.handle.join() {
            log::error!("Replay thread panicked: {:?}", e);
        }
    }
}

/// Deliver one bag record. Returns false if it was skipped.
pub(crate) fn deliver(
    msg: BagMessage,
    topics: &TopicNames,
    synchronizer: &StreamSynchronizer,
    publisher: &dyn Publisher,
) -> bool {
    match msg {
        BagMessage::Channel { channel, cloud } => {
            synchronizer.on_channel_arrived(channel, cloud.timestamp_us, cloud.data);
            true
        }
        BagMessage::Cloud { topic, msg } => match topics.input_channel(&topic) {
            Some(channel) => {
                synchronizer.on_channel_arrived(channel, msg.timestamp_us, msg.cloud);
                true
            }
            None => {
                log::trace!("Replay: skipping recorded {} at {} us", topic, msg.timestamp_us);
                false
            }
        },
        BagMessage::Odometry { topic, msg } => {
            if topic == topics.map_odom {
                publisher.publish(&topic, BusMessage::Odometry(msg));
                true
            } else {
                log::trace!("Replay: skipping recorded {} at {} us", topic, msg.timestamp_us);
                false
            }
        }
    }
}

fn run_replay_loop(
    config: ReplayConfig,
    mut player: BagPlayer,
    synchronizer: Arc<StreamSynchronizer>,
    publisher: Arc<dyn Publisher>,
    running: Arc<AtomicBool>,
) {
    log::info!("Replay thread started");
    let mut passes: u64 = 0;

    while running.load(Ordering::Relaxed) {
        match player.next_paced() {
            Ok(Some(msg)) => {
                deliver(
                    msg,
                    &config.topics,
                    &synchronizer,
                    publisher.as_ref(),
                );
            }
            Ok(None) => {
                passes += 1;
                if config.loop_playback {
                    log::info!("Bag playback pass {} complete, rewinding", passes);
                    if let Err(e) = player.rewind() {
                        log::error!("Failed to rewind bag: {}", e);
                        break;
                    }
                } else {
                    log::info!("Bag playback complete");
                    thread::sleep(config.drain_grace);
                    running.store(false, Ordering::Relaxed);
                    break;
                }
            }
            Err(e) => {
                log::warn!("Dropping rest of bag after read error: {}", e);
                running.store(false, Ordering::Relaxed);
                break;
            }
        }
    }

    log::info!("Replay thread stopped after {} records", player.messages_read());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Point3D, PointCloud, Pose6D, Timestamped};
    use crate::io::{Bus, CloudMsg, OdometryMsg};
    use crate::sensors::ChannelId;

    #[test]
    fn test_deliver_routes_records() {
        let topics = TopicNames::default();
        let sync = StreamSynchronizer::new();
        let bus = Bus::new();
        let rx = bus.subscribe(&topics.map_odom, 4);

        let channel = BagMessage::Channel {
            channel: ChannelId::ImuTrans,
            cloud: Timestamped::new(PointCloud::new(), 500),
        };
        assert!(deliver(channel, &topics, &sync, &bus));
        assert_eq!(sync.timestamp_us(ChannelId::ImuTrans), Some(500));

        let msg = OdometryMsg::from_pose(&Pose6D::identity(), 600, "camera_init", "aft_mapped");
        let corrected = BagMessage::Odometry {
            topic: topics.map_odom.clone(),
            msg,
        };
        assert!(deliver(corrected, &topics, &sync, &bus));
        assert_eq!(rx.try_recv().unwrap().timestamp_us(), 600);

        let msg = OdometryMsg::from_pose(&Pose6D::identity(), 700, "camera_init", "laser_odom");
        let output = BagMessage::Odometry {
            topic: topics.laser_odom.clone(),
            msg,
        };
        assert!(!deliver(output, &topics, &sync, &bus));
    }

    #[test]
    fn test_deliver_routes_clouds_by_input_topic() {
        let mut topics = TopicNames::default();
        topics.cloud_in = "velodyne_points_registered".into();
        let sync = StreamSynchronizer::new();
        let bus = Bus::new();

        let cloud = |topic: &str, ts: u64| BagMessage::Cloud {
            topic: topic.into(),
            msg: CloudMsg {
                timestamp_us: ts,
                frame_id: "camera".into(),
                cloud: PointCloud::from_points(vec![Point3D::new(1.0, 2.0, 3.0, 0.0)]),
            },
        };

        assert!(deliver(cloud("velodyne_points_registered", 800), &topics, &sync, &bus));
        assert_eq!(sync.timestamp_us(ChannelId::FullRes), Some(800));

        // The default name no longer feeds any channel.
        assert!(!deliver(cloud("velodyne_cloud_2", 900), &topics, &sync, &bus));
        assert_eq!(sync.timestamp_us(ChannelId::FullRes), Some(800));

        // Pipeline outputs are never fed back.
        assert!(!deliver(cloud(&topics.surf_last, 950), &topics, &sync, &bus));
        assert_eq!(sync.stats().arrivals.iter().sum::<u64>(), 1);
    }
}
