//! Two-rate pose fusion.
//!
//! Laser odometry arrives every sweep but drifts. The map corrector
//! publishes a globally consistent pose a few times per second, together
//! with the odometry pose it was computed against (the anchor). Fusion
//! applies the latest correction to the odometry motion accumulated since
//! that anchor:
//!
//! ```text
//! fused = aft_mapped ⊕ bef_mapped⁻¹ ⊕ odometry
//! ```
//!
//! Output is produced only when odometry arrives and carries the odometry
//! stamp. A correction only replaces the offset used by the next output, so
//! a stalled corrector leaves fusion running on the last offset it saw.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;

use crate::config::{FrameNames, TopicNames};
use crate::core::types::{Pose6D, Twist};
use crate::io::{BusMessage, OdometryMsg, Publisher, TRANSFORM_TOPIC, TransformMsg};

/// Where the anchor of a correction comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorMode {
    /// The corrected message's twist carries the anchor pose
    /// (angular = rotation, linear = position), as the map corrector
    /// emits it.
    #[default]
    Twist,
    /// The anchor is the last odometry pose seen before the correction.
    LatestOdometry,
}

/// Settings of the fusion stage.
#[derive(Debug, Clone)]
pub struct FusionConfig {
    /// Diagonal of the published pose covariance.
    pub covariance_diagonal: [f64; 6],
    pub anchor: AnchorMode,
    pub frames: FrameNames,
    pub topics: TopicNames,
    pub publish_transforms: bool,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            covariance_diagonal: [0.0; 6],
            anchor: AnchorMode::default(),
            frames: FrameNames::default(),
            topics: TopicNames::default(),
            publish_transforms: true,
        }
    }
}

/// Latest correction from the map corrector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CorrectionState {
    /// Corrected pose in the map frame.
    pub aft_mapped: Pose6D,
    /// Odometry pose the correction was computed against.
    pub bef_mapped: Pose6D,
    /// Velocity reported with the correction.
    pub twist: Twist,
}

/// Apply the correction `bef -> aft` to the odometry pose `sum`.
///
/// ```text
/// R = R_aft · R_befᵀ · R_sum
/// t = t_aft − R · R_sumᵀ · (t_bef − t_sum)
/// ```
///
/// With `bef == aft` the result is `sum`.
pub fn transform_associate_to_map(sum: &Pose6D, bef: &Pose6D, aft: &Pose6D) -> Pose6D {
    let r_sum = sum.rotation();
    let r_mapped = aft.rotation() * bef.rotation().inverse() * r_sum;
    let t_mapped =
        aft.position() - r_mapped * (r_sum.inverse() * (bef.position() - sum.position()));
    Pose6D::from_rotation(&r_mapped, &t_mapped)
}

#[derive(Debug, Default)]
struct FusionState {
    last_odometry: Pose6D,
    correction: CorrectionState,
    corrections_received: u64,
}

/// Fuses the laser odometry stream with map corrections.
///
/// Both handlers take `&self` and may be called from different threads.
pub struct PoseFusion {
    config: FusionConfig,
    publisher: Arc<dyn Publisher>,
    state: Mutex<FusionState>,
}

impl PoseFusion {
    pub fn new(config: FusionConfig, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            config,
            publisher,
            state: Mutex::new(FusionState::default()),
        }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Handle a laser odometry pose: publish and return the fused pose.
    pub fn on_odometry_pose(&self, msg: &OdometryMsg) -> OdometryMsg {
        let sum = msg.pose();

        // Publishing under the lock keeps output order equal to input order.
        let mut state = self.state.lock();
        state.last_odometry = sum;
        let correction = state.correction;

        let mapped =
            transform_associate_to_map(&sum, &correction.bef_mapped, &correction.aft_mapped);

        let mut fused = OdometryMsg::from_pose(
            &mapped,
            msg.timestamp_us,
            &self.config.frames.init_frame,
            &self.config.frames.lidar_frame,
        );
        fused.twist = correction.twist;
        fused.covariance_diagonal = self.config.covariance_diagonal;

        self.publisher.publish(
            &self.config.topics.integrated_odom,
            BusMessage::Odometry(fused.clone()),
        );
        if self.config.publish_transforms {
            self.publisher.publish(
                TRANSFORM_TOPIC,
                BusMessage::Transform(TransformMsg::from_odometry(&fused)),
            );
        }
        drop(state);

        fused
    }

    /// Handle a corrected pose. Takes effect at the next odometry pose.
    pub fn on_corrected_pose(&self, msg: &OdometryMsg) {
        let mut state = self.state.lock();
        let bef_mapped = match self.config.anchor {
            AnchorMode::Twist => {
                let [rx, ry, rz] = msg.twist.angular;
                let [x, y, z] = msg.twist.linear;
                Pose6D::new(rx, ry, rz, x, y, z)
            }
            AnchorMode::LatestOdometry => state.last_odometry,
        };

        state.correction = CorrectionState {
            aft_mapped: msg.pose(),
            bef_mapped,
            twist: msg.twist,
        };
        state.corrections_received += 1;
        log::trace!("correction at {} us", msg.timestamp_us);
    }

    /// Most recent correction, identity if none arrived yet.
    pub fn correction(&self) -> CorrectionState {
        self.state.lock().correction
    }

    /// Most recent odometry pose.
    pub fn last_odometry(&self) -> Pose6D {
        self.state.lock().last_odometry
    }

    pub fn corrections_received(&self) -> u64 {
        self.state.lock().corrections_received
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Bus;
    use approx::assert_relative_eq;

    fn odom(pose: Pose6D, ts: u64) -> OdometryMsg {
        OdometryMsg::from_pose(&pose, ts, "camera_init", "laser_odom")
    }

    /// Corrected message in the map corrector's convention: twist carries
    /// the anchor.
    fn corrected(aft: Pose6D, bef: Pose6D, ts: u64) -> OdometryMsg {
        let mut msg = OdometryMsg::from_pose(&aft, ts, "camera_init", "aft_mapped");
        msg.twist = Twist::new([bef.rot_x, bef.rot_y, bef.rot_z], [bef.x, bef.y, bef.z]);
        msg
    }

    fn assert_pose_eq(a: &Pose6D, b: &Pose6D) {
        assert_relative_eq!(a.rot_x, b.rot_x, epsilon = 1e-9);
        assert_relative_eq!(a.rot_y, b.rot_y, epsilon = 1e-9);
        assert_relative_eq!(a.rot_z, b.rot_z, epsilon = 1e-9);
        assert_relative_eq!(a.x, b.x, epsilon = 1e-9);
        assert_relative_eq!(a.y, b.y, epsilon = 1e-9);
        assert_relative_eq!(a.z, b.z, epsilon = 1e-9);
    }

    #[test]
    fn test_associate_identity_correction() {
        let sum = Pose6D::new(0.1, 0.4, -0.2, 1.0, 2.0, 3.0);
        let out = transform_associate_to_map(&sum, &Pose6D::identity(), &Pose6D::identity());
        assert_pose_eq(&out, &sum);

        let anchor = Pose6D::new(-0.3, 1.1, 0.05, -4.0, 0.5, 2.0);
        let out = transform_associate_to_map(&sum, &anchor, &anchor);
        assert_pose_eq(&out, &sum);
    }

    #[test]
    fn test_associate_matches_composition() {
        let sum = Pose6D::new(0.1, 0.4, -0.2, 1.0, 2.0, 3.0);
        let bef = Pose6D::new(0.05, 0.3, -0.1, 0.8, 1.5, 2.0);
        let aft = Pose6D::new(0.07, 0.35, -0.12, 1.0, 1.4, 2.2);

        let expected = aft.compose(&bef.inverse()).compose(&sum);
        assert_pose_eq(&transform_associate_to_map(&sum, &bef, &aft), &expected);
    }

    #[test]
    fn test_no_correction_passes_odometry_through() {
        let fusion = PoseFusion::new(FusionConfig::default(), Arc::new(Bus::new()));
        for i in 1..=5u64 {
            let pose = Pose6D::new(0.0, 0.1 * i as f64, 0.0, 0.0, 0.0, i as f64);
            let fused = fusion.on_odometry_pose(&odom(pose, i * 100_000));
            assert_eq!(fused.timestamp_us, i * 100_000);
            assert_pose_eq(&fused.pose(), &pose);
        }
    }

    #[test]
    fn test_correction_applies_from_next_odometry() {
        let bus = Arc::new(Bus::new());
        let rx = bus.subscribe("integrated_to_init", 8);
        let fusion = PoseFusion::new(FusionConfig::default(), bus.clone());

        let p1 = Pose6D::new(0.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        let f1 = fusion.on_odometry_pose(&odom(p1, 100_000));

        // The corrector found the platform 0.5 m further along x at p1.
        let aft = Pose6D::new(0.0, 0.0, 0.0, 0.5, 0.0, 1.0);
        fusion.on_corrected_pose(&corrected(aft, p1, 150_000));

        let p2 = Pose6D::new(0.0, 0.0, 0.0, 0.0, 0.0, 2.0);
        let f2 = fusion.on_odometry_pose(&odom(p2, 200_000));
        let p3 = Pose6D::new(0.0, 0.0, 0.0, 0.0, 0.0, 3.0);
        let f3 = fusion.on_odometry_pose(&odom(p3, 300_000));

        assert_pose_eq(&f1.pose(), &p1);
        assert_relative_eq!(f2.position[0], 0.5, epsilon = 1e-9);
        assert_relative_eq!(f2.position[2], 2.0, epsilon = 1e-9);
        assert_relative_eq!(f3.position[0], 0.5, epsilon = 1e-9);
        assert_relative_eq!(f3.position[2], 3.0, epsilon = 1e-9);

        let stamps: Vec<u64> = rx.try_iter().map(|m| m.timestamp_us()).collect();
        assert_eq!(stamps, vec![100_000, 200_000, 300_000]);
    }

    #[test]
    fn test_correction_does_not_publish() {
        let bus = Arc::new(Bus::new());
        let rx = bus.subscribe("integrated_to_init", 8);
        let tf_rx = bus.subscribe(TRANSFORM_TOPIC, 8);
        let fusion = PoseFusion::new(FusionConfig::default(), bus.clone());

        fusion.on_corrected_pose(&corrected(Pose6D::identity(), Pose6D::identity(), 1));
        assert!(rx.try_recv().is_err());
        assert!(tf_rx.try_recv().is_err());
        assert_eq!(fusion.corrections_received(), 1);
    }

    #[test]
    fn test_rotated_correction() {
        let fusion = PoseFusion::new(FusionConfig::default(), Arc::new(Bus::new()));

        // Odometry thinks it is at the origin; the map says it is yawed
        // 0.3 rad about y. Motion of 1 m along z afterwards must follow
        // the corrected heading.
        let aft = Pose6D::new(0.0, 0.3, 0.0, 0.0, 0.0, 0.0);
        fusion.on_corrected_pose(&corrected(aft, Pose6D::identity(), 10));

        let fused = fusion.on_odometry_pose(&odom(Pose6D::new(0.0, 0.0, 0.0, 0.0, 0.0, 1.0), 20));
        let pose = fused.pose();
        assert_relative_eq!(pose.rot_y, 0.3, epsilon = 1e-9);
        assert_relative_eq!(pose.x, 0.3_f64.sin(), epsilon = 1e-9);
        assert_relative_eq!(pose.z, 0.3_f64.cos(), epsilon = 1e-9);
    }

    #[test]
    fn test_latest_odometry_anchor() {
        let config = FusionConfig {
            anchor: AnchorMode::LatestOdometry,
            ..Default::default()
        };
        let fusion = PoseFusion::new(config, Arc::new(Bus::new()));

        let p1 = Pose6D::new(0.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        fusion.on_odometry_pose(&odom(p1, 100));

        // Twist is ignored for anchoring in this mode.
        let aft = Pose6D::new(0.0, 0.0, 0.0, 0.0, 1.0, 1.0);
        fusion.on_corrected_pose(&corrected(aft, Pose6D::new(0.0, 0.0, 0.0, 9.0, 9.0, 9.0), 150));
        assert_pose_eq(&fusion.correction().bef_mapped, &p1);

        let fused = fusion.on_odometry_pose(&odom(Pose6D::new(0.0, 0.0, 0.0, 0.0, 0.0, 2.0), 200));
        assert_relative_eq!(fused.position[1], 1.0, epsilon = 1e-9);
        assert_relative_eq!(fused.position[2], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_output_frames_twist_and_covariance() {
        let config = FusionConfig {
            covariance_diagonal: [0.1, 0.2, 0.3, 0.01, 0.02, 0.03],
            ..Default::default()
        };
        let bus = Arc::new(Bus::new());
        let tf_rx = bus.subscribe(TRANSFORM_TOPIC, 4);
        let fusion = PoseFusion::new(config, bus.clone());

        // Anchor equal to the corrected pose: zero offset, non-zero twist.
        let anchor = Pose6D::new(0.0, 0.0, 0.0, 1.0, 2.0, 3.0);
        let correction = corrected(anchor, anchor, 5);
        fusion.on_corrected_pose(&correction);

        let fused = fusion.on_odometry_pose(&odom(Pose6D::identity(), 10));
        assert_eq!(fused.frame_id, "camera_init");
        assert_eq!(fused.child_frame_id, "camera");
        assert_eq!(fused.twist, correction.twist);

        let cov = fused.covariance_matrix();
        assert_eq!(cov[0], 0.1);
        assert_eq!(cov[14], 0.3);
        assert_eq!(cov[35], 0.03);
        assert_eq!(cov[1], 0.0);

        let tf = tf_rx.try_recv().unwrap();
        assert_eq!(tf.timestamp_us(), 10);
    }

    #[test]
    fn test_concurrent_streams() {
        let fusion = Arc::new(PoseFusion::new(FusionConfig::default(), Arc::new(Bus::new())));

        let corrector = {
            let fusion = Arc::clone(&fusion);
            std::thread::spawn(move || {
                for i in 0..200u64 {
                    let p = Pose6D::new(0.0, 0.0, 0.0, 0.0, 0.0, i as f64);
                    fusion.on_corrected_pose(&corrected(p, p, i));
                }
            })
        };

        // Every correction is an identity offset, so output equals input.
        for i in 0..200u64 {
            let p = Pose6D::new(0.0, 0.01 * i as f64, 0.0, 1.0, 0.0, i as f64);
            let fused = fusion.on_odometry_pose(&odom(p, i));
            assert_relative_eq!(fused.position[2], i as f64, epsilon = 1e-6);
            assert_relative_eq!(fused.position[0], 1.0, epsilon = 1e-6);
        }
        corrector.join().unwrap();
        assert_eq!(fusion.corrections_received(), 200);
    }
}
