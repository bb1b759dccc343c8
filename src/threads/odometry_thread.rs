//! Fixed-rate odometry control loop.
//!
//! Polls the synchronizer at `tick_rate_hz`. A tick with no aligned frame
//! returns immediately; a tick that runs the estimator may take longer than
//! the period, in which case the next tick starts right away.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::MIN_TICK_RATE_HZ;
use crate::odometry::{OdometryOrchestrator, TickOutcome};
use crate::sensors::StreamSynchronizer;

/// Interval between synchronizer statistics log lines.
const STATS_INTERVAL: Duration = Duration::from_secs(5);

/// Handle to the odometry thread.
pub struct OdometryThread {
    handle: JoinHandle<()>,
}

impl OdometryThread {
    /// Spawn the control loop.
    pub fn spawn(
        orchestrator: OdometryOrchestrator,
        synchronizer: Arc<StreamSynchronizer>,
        tick_rate_hz: f64,
        running: Arc<AtomicBool>,
    ) -> std::io::Result<Self> {
        let handle = thread::Builder::new()
            .name("odometry".into())
            .spawn(move || {
                run_odometry_loop(orchestrator, synchronizer, tick_rate_hz, running);
            })?;

        Ok(Self { handle })
    }

    /// Wait for the thread to finish.
    pub fn join(self) {
        if let Err(e) = self.handle.join() {
            log::error!("Odometry thread panicked: {:?}", e);
        }
    }
}

fn run_odometry_loop(
    mut orchestrator: OdometryOrchestrator,
    synchronizer: Arc<StreamSynchronizer>,
    tick_rate_hz: f64,
    running: Arc<AtomicBool>,
) {
    log::info!("Odometry thread started ({} Hz)", tick_rate_hz);

    let period = Duration::from_secs_f64(1.0 / tick_rate_hz.max(MIN_TICK_RATE_HZ));
    let mut last_stats = Instant::now();

    while running.load(Ordering::Relaxed) {
        let tick_start = Instant::now();

        if let TickOutcome::Processed {
            frame_count,
            clouds_published,
        } = orchestrator.tick()
        {
            log::trace!("Processed frame {} (clouds: {})", frame_count, clouds_published);
        }

        if last_stats.elapsed() >= STATS_INTERVAL {
            let stats = synchronizer.stats();
            log::debug!(
                "Synchronizer: {} frames, {} overwritten, arrivals {:?}",
                stats.frames,
                stats.overwritten,
                stats.arrivals
            );
            last_stats = Instant::now();
        }

        let elapsed = tick_start.elapsed();
        if elapsed < period {
            thread::sleep(period - elapsed);
        }
    }

    log::info!(
        "Odometry thread stopped after {} frames",
        orchestrator.frame_count()
    );
}
