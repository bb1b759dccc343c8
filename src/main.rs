//! GatiLOAM daemon.
//!
//! Replays a recorded bag of sweep artifacts through the synchronizer and
//! odometry stage, fuses the result with recorded map corrections, and
//! optionally records everything published.
//!
//! # Usage
//!
//! ```bash
//! # With default config lookup (gati-loam.toml, /etc/gati-loam.toml)
//! gati-loam
//!
//! # With custom config file
//! gati-loam --config gati-loam.toml
//!
//! # Override the bag to replay
//! gati-loam --bag sweeps.bag --speed 0
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use clap::Parser;

use gati_loam::config::Config;
use gati_loam::fusion::PoseFusion;
use gati_loam::io::bag::BagRecorder;
use gati_loam::io::{Bus, Publisher};
use gati_loam::odometry::{ImuShiftEstimator, OdometryOrchestrator};
use gati_loam::sensors::StreamSynchronizer;
use gati_loam::threads::{FusionThread, OdometryThread, RecordThread, ReplayConfig, ReplayThread};
use gati_loam::utils::setup_ctrl_c_handler;

/// Subscription depth for the fusion inputs (laser odometry, corrections).
const POSE_QUEUE_DEPTH: usize = 5;
/// Subscription depth for recorded topics.
const RECORD_QUEUE_DEPTH: usize = 64;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "gati-loam")]
#[command(about = "LOAM sweep synchronization, laser odometry and pose fusion")]
struct Args {
    /// Configuration file (default: gati-loam.toml, then /etc/gati-loam.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bag file to replay, overrides [bag] file
    #[arg(short, long)]
    bag: Option<String>,

    /// Replay speed factor (0 = as fast as possible), overrides [bag] speed
    #[arg(long)]
    speed: Option<f32>,

    /// Record published messages to this bag, overrides [bag] record
    #[arg(short, long)]
    record: Option<String>,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = Args::parse();

    let mut config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(bag) = args.bag {
        config.bag.file = Some(bag);
    }
    if let Some(speed) = args.speed {
        config.bag.speed = speed;
    }
    if let Some(record) = args.record {
        config.bag.record = Some(record);
    }

    if let Err(e) = config.validate() {
        log::error!("{}", e);
        return ExitCode::FAILURE;
    }
    config.log_overrides();

    log::info!("gati-loam starting");
    log::info!(
        "  Odometry: scan period {}s, io ratio {}, {} Hz",
        config.odometry.scan_period,
        config.odometry.io_ratio,
        config.odometry.tick_rate_hz
    );
    log::info!(
        "  Fusion: anchor {:?}, transforms {}",
        config.fusion.anchor,
        if config.output.transforms {
            "enabled"
        } else {
            "disabled"
        }
    );

    let running = match setup_ctrl_c_handler() {
        Ok(running) => running,
        Err(e) => {
            log::error!("Failed to set Ctrl-C handler: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = run_daemon(&config, running) {
        log::error!("Daemon error: {}", e);
        return ExitCode::FAILURE;
    }

    log::info!("gati-loam shutdown complete");
    ExitCode::SUCCESS
}

// ============================================================================
// Daemon
// ============================================================================

fn run_daemon(config: &Config, running: Arc<AtomicBool>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(bag_file) = config.bag.file.clone() else {
        return Err("no input: set [bag] file or pass --bag".into());
    };

    let bus = Arc::new(Bus::new());
    let synchronizer = Arc::new(StreamSynchronizer::new());
    let topics = &config.topics;

    // Subscriptions are created before any producer starts.
    let odometry_rx = bus.subscribe(&topics.laser_odom, POSE_QUEUE_DEPTH);
    let corrected_rx = bus.subscribe(&topics.map_odom, POSE_QUEUE_DEPTH);

    let record_thread = match &config.bag.record {
        Some(path) => {
            let recorder = BagRecorder::create(path)?;
            let subscriptions = [
                &topics.laser_odom,
                &topics.map_odom,
                &topics.integrated_odom,
                &topics.corner_last,
                &topics.surf_last,
                &topics.full_res,
            ]
            .into_iter()
            .map(|topic| (topic.clone(), bus.subscribe(topic, RECORD_QUEUE_DEPTH)))
            .collect();
            log::info!("  Recording to {}", path);
            Some(RecordThread::spawn(recorder, subscriptions, running.clone())?)
        }
        None => None,
    };

    let publisher: Arc<dyn Publisher> = bus.clone();

    let fusion = Arc::new(PoseFusion::new(config.fusion()?, publisher.clone()));
    let fusion_thread = FusionThread::spawn(fusion, odometry_rx, corrected_rx, running.clone())?;

    let orchestrator = OdometryOrchestrator::new(
        config.orchestrator(),
        synchronizer.clone(),
        Box::new(ImuShiftEstimator::new(config.estimator())),
        publisher.clone(),
    )?;
    let odometry_thread = OdometryThread::spawn(
        orchestrator,
        synchronizer.clone(),
        config.odometry.tick_rate_hz,
        running.clone(),
    )?;

    let replay_config = ReplayConfig {
        path: PathBuf::from(bag_file),
        loop_playback: config.bag.loop_playback,
        speed: config.bag.speed,
        topics: topics.clone(),
        drain_grace: Duration::from_millis(500),
    };
    let replay_thread = ReplayThread::spawn(replay_config, synchronizer, publisher, running.clone())?;

    log::info!("All threads running");

    replay_thread.join();
    odometry_thread.join();
    fusion_thread.join();
    if let Some(thread) = record_thread {
        thread.join();
    }

    Ok(())
}
