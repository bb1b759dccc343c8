//! Odometry control step.
//!
//! One [`tick`](OdometryOrchestrator::tick) takes at most one synchronized
//! frame, runs the motion estimator on it without any lock held, and
//! publishes the accumulated pose. Point clouds are heavier and only go out
//! on every `io_ratio`-th processed frame.

use std::sync::Arc;

use crate::config::{FrameNames, TopicNames};
use crate::error::{ConfigError, ConfigResult};
use crate::io::{BusMessage, CloudMsg, OdometryMsg, Publisher, TRANSFORM_TOPIC, TransformMsg};
use crate::odometry::estimator::MotionEstimator;
use crate::sensors::{ChannelId, ImuTrans, StreamSynchronizer};

/// Publishing settings of the odometry stage.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Publish clouds every `io_ratio` processed frames (1 = every frame).
    pub io_ratio: u32,
    pub frames: FrameNames,
    pub topics: TopicNames,
    /// Broadcast the odometry pose as a frame transform.
    pub publish_transforms: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            io_ratio: 2,
            frames: FrameNames::default(),
            topics: TopicNames::default(),
            publish_transforms: true,
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.io_ratio < 1 {
            return Err(ConfigError::invalid(
                "odometry.io_ratio",
                self.io_ratio,
                ">= 1",
            ));
        }
        Ok(())
    }
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No aligned frame was available.
    Idle,
    /// A frame was estimated and its pose published.
    Processed {
        frame_count: u64,
        clouds_published: bool,
    },
}

/// Whether the frame with 1-based index `frame_count` carries clouds.
///
/// Frames 1, 1 + R, 1 + 2R, ... publish when `io_ratio` is R >= 2.
#[inline]
pub fn should_publish_clouds(frame_count: u64, io_ratio: u32) -> bool {
    io_ratio < 2 || frame_count % io_ratio as u64 == 1
}

/// Drives the synchronizer, the estimator and the publisher.
pub struct OdometryOrchestrator {
    config: OrchestratorConfig,
    synchronizer: Arc<StreamSynchronizer>,
    estimator: Box<dyn MotionEstimator>,
    publisher: Arc<dyn Publisher>,
    frame_count: u64,
}

impl OdometryOrchestrator {
    /// Create an orchestrator. Fails on invalid publishing or estimator
    /// settings.
    pub fn new(
        config: OrchestratorConfig,
        synchronizer: Arc<StreamSynchronizer>,
        estimator: Box<dyn MotionEstimator>,
        publisher: Arc<dyn Publisher>,
    ) -> ConfigResult<Self> {
        config.validate()?;
        estimator.config().validate()?;

        Ok(Self {
            config,
            synchronizer,
            estimator,
            publisher,
            frame_count: 0,
        })
    }

    /// Number of frames processed so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Process the pending frame, if any.
    pub fn tick(&mut self) -> TickOutcome {
        let Some(frame) = self.synchronizer.take_frame() else {
            return TickOutcome::Idle;
        };

        let imu = ImuTrans::from_cloud(frame.cloud(ChannelId::ImuTrans));
        let estimate = self.estimator.estimate(&frame, &imu);
        self.frame_count += 1;

        let stamp = frame.timestamp_us;
        let frames = &self.config.frames;
        let topics = &self.config.topics;

        let odom = OdometryMsg::from_pose(
            &estimate.accumulated,
            stamp,
            &frames.init_frame,
            &frames.odom_frame,
        );
        if self.config.publish_transforms {
            self.publisher.publish(
                TRANSFORM_TOPIC,
                BusMessage::Transform(TransformMsg::from_odometry(&odom)),
            );
        }
        self.publisher
            .publish(&topics.laser_odom, BusMessage::Odometry(odom));

        let clouds_published = should_publish_clouds(self.frame_count, self.config.io_ratio);
        if clouds_published {
            let mut full_res = (**frame.cloud(ChannelId::FullRes)).clone();
            self.estimator.transform_to_end(&mut full_res);

            let outputs = [
                (&topics.corner_last, (*estimate.corner_last).clone()),
                (&topics.surf_last, (*estimate.surface_last).clone()),
                (&topics.full_res, full_res),
            ];
            for (topic, cloud) in outputs {
                self.publisher.publish(
                    topic,
                    BusMessage::Cloud(CloudMsg {
                        timestamp_us: stamp,
                        frame_id: frames.lidar_frame.clone(),
                        cloud,
                    }),
                );
            }
        }

        log::trace!(
            "frame {} at {} us, clouds: {}",
            self.frame_count,
            stamp,
            clouds_published
        );

        TickOutcome::Processed {
            frame_count: self.frame_count,
            clouds_published,
        }
    }
}
