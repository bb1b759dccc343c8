//! GatiLOAM - sweep synchronization and two-rate pose fusion for LOAM-style
//! lidar odometry.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 threads/  + main                    │  ← Daemon
//! │        (odometry loop, fusion, replay, record)      │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                      io/                            │  ← Infrastructure
//! │            (messages, bus, bag files)               │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │              odometry/      fusion/                 │  ← Pipeline
//! │   (estimator, orchestrator)  (pose fusion)          │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                   sensors/                          │  ← Input gating
//! │          (channels, stream synchronizer)            │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │        (types, rotation math, axis convention)      │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Data flow
//!
//! ```text
//! six channels ─► StreamSynchronizer ─► OdometryOrchestrator ─► laser_odom_to_init ─┐
//!                                            │                                      ▼
//!                                            └─► clouds (every io_ratio)      PoseFusion ─► integrated_to_init
//!                                                                                   ▲
//!                                                   map corrector ─► aft_mapped_to_init
//! ```

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;

// ============================================================================
// Layer 2: Input gating (depends on core)
// ============================================================================
pub mod sensors;

// ============================================================================
// Layer 3: Pipeline stages (depends on core, sensors, io messages)
// ============================================================================
pub mod fusion;
pub mod odometry;

// ============================================================================
// Layer 4: I/O infrastructure
// ============================================================================
pub mod io;

// ============================================================================
// Layer 5: Threads and process support
// ============================================================================
pub mod config;
pub mod error;
pub mod threads;
pub mod utils;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

pub use core::types::{Point3D, PointCloud, Pose6D, Quaternion, Timestamped, Twist};

pub use sensors::{ChannelId, ImuTrans, StreamSynchronizer, SynchronizedFrame};

pub use odometry::{
    Estimate, EstimatorConfig, ImuShiftEstimator, MotionEstimator, OdometryOrchestrator,
    OrchestratorConfig, TickOutcome,
};

pub use fusion::{AnchorMode, CorrectionState, FusionConfig, PoseFusion};

pub use io::bag::{BagInfo, BagMessage, BagPlayer, BagRecorder};
pub use io::{Bus, BusMessage, CloudMsg, OdometryMsg, Publisher, TransformMsg};

pub use config::Config;
pub use error::{BagError, ConfigError};
