//! In-process topic bus.
//!
//! Producers publish by topic name; each subscriber owns a bounded
//! crossbeam channel. Publishing never blocks: when a subscriber's queue is
//! full the message is dropped for that subscriber only, which keeps the
//! odometry loop real-time when a consumer stalls.

use std::collections::HashMap;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::RwLock;

use super::messages::{CloudMsg, OdometryMsg, TransformMsg};

/// Topic used for frame transform broadcasts.
pub const TRANSFORM_TOPIC: &str = "tf";

/// Anything that can travel on the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum BusMessage {
    Odometry(OdometryMsg),
    Cloud(CloudMsg),
    Transform(TransformMsg),
}

impl BusMessage {
    /// Stamp of the carried message.
    pub fn timestamp_us(&self) -> u64 {
        match self {
            BusMessage::Odometry(m) => m.timestamp_us,
            BusMessage::Cloud(m) => m.timestamp_us,
            BusMessage::Transform(m) => m.timestamp_us,
        }
    }

    /// Get as odometry if this is that type.
    pub fn as_odometry(&self) -> Option<&OdometryMsg> {
        match self {
            BusMessage::Odometry(m) => Some(m),
            _ => None,
        }
    }

    /// Get as cloud if this is that type.
    pub fn as_cloud(&self) -> Option<&CloudMsg> {
        match self {
            BusMessage::Cloud(m) => Some(m),
            _ => None,
        }
    }
}

/// Output sink for the odometry and fusion stages.
pub trait Publisher: Send + Sync {
    /// Publish a message on a topic. Must not block.
    fn publish(&self, topic: &str, msg: BusMessage);
}

/// Topic bus backed by bounded crossbeam channels.
#[derive(Debug, Default)]
pub struct Bus {
    topics: RwLock<HashMap<String, Vec<Sender<BusMessage>>>>,
}

impl Bus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a topic with the given queue depth.
    pub fn subscribe(&self, topic: &str, queue_depth: usize) -> Receiver<BusMessage> {
        let (tx, rx) = bounded(queue_depth.max(1));
        self.topics
            .write()
            .entry(topic.to_string())
            .or_default()
            .push(tx);
        rx
    }

    /// Number of live subscribers on a topic.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.read().get(topic).map_or(0, Vec::len)
    }
}

impl Publisher for Bus {
    fn publish(&self, topic: &str, msg: BusMessage) {
        let mut topics = self.topics.write();
        let Some(subscribers) = topics.get_mut(topic) else {
            return;
        };
        subscribers.retain(|tx| match tx.try_send(msg.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::warn!("{}: subscriber queue full, dropping message", topic);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Pose6D;

    fn odom(ts: u64) -> BusMessage {
        BusMessage::Odometry(OdometryMsg::from_pose(&Pose6D::identity(), ts, "a", "b"))
    }

    #[test]
    fn test_publish_fans_out() {
        let bus = Bus::new();
        let a = bus.subscribe("laser_odom_to_init", 5);
        let b = bus.subscribe("laser_odom_to_init", 5);
        let other = bus.subscribe("integrated_to_init", 5);

        bus.publish("laser_odom_to_init", odom(10));

        assert_eq!(a.try_recv().unwrap().timestamp_us(), 10);
        assert_eq!(b.try_recv().unwrap().timestamp_us(), 10);
        assert!(other.try_recv().is_err());
    }

    #[test]
    fn test_publish_without_subscribers_is_ignored() {
        let bus = Bus::new();
        bus.publish("nobody", odom(1));
        assert_eq!(bus.subscriber_count("nobody"), 0);
    }

    #[test]
    fn test_full_queue_drops_newest() {
        let bus = Bus::new();
        let rx = bus.subscribe("t", 2);
        for ts in 0..5 {
            bus.publish("t", odom(ts));
        }
        let stamps: Vec<u64> = rx.try_iter().map(|m| m.timestamp_us()).collect();
        assert_eq!(stamps, vec![0, 1]);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let bus = Bus::new();
        let keep = bus.subscribe("t", 4);
        drop(bus.subscribe("t", 4));
        assert_eq!(bus.subscriber_count("t"), 2);

        bus.publish("t", odom(3));
        assert_eq!(bus.subscriber_count("t"), 1);
        assert_eq!(keep.try_recv().unwrap().timestamp_us(), 3);
    }
}
