//! Fusion of laser odometry with map corrections.

mod pose_fusion;

pub use pose_fusion::{
    AnchorMode, CorrectionState, FusionConfig, PoseFusion, transform_associate_to_map,
};
