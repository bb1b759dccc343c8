//! Fusion thread.
//!
//! Waits on the laser odometry and corrected pose subscriptions. Each
//! odometry pose produces one fused output; corrections only update state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, select};

use crate::fusion::PoseFusion;
use crate::io::BusMessage;

/// Handle to the fusion thread.
pub struct FusionThread {
    handle: JoinHandle<()>,
}

impl FusionThread {
    /// Spawn the fusion loop.
    ///
    /// - `odometry_rx`: laser odometry subscription (fast stream)
    /// - `corrected_rx`: map corrector subscription (slow stream)
    pub fn spawn(
        fusion: Arc<PoseFusion>,
        odometry_rx: Receiver<BusMessage>,
        corrected_rx: Receiver<BusMessage>,
        running: Arc<AtomicBool>,
    ) -> std::io::Result<Self> {
        let handle = thread::Builder::new()
            .name("fusion".into())
            .spawn(move || {
                run_fusion_loop(fusion, odometry_rx, corrected_rx, running);
            })?;

        Ok(Self { handle })
    }

    /// Wait for the thread to finish.
    pub fn join(self) {
        if let Err(e) = self.handle.join() {
            log::error!("Fusion thread panicked: {:?}", e);
        }
    }
}

fn run_fusion_loop(
    fusion: Arc<PoseFusion>,
    odometry_rx: Receiver<BusMessage>,
    corrected_rx: Receiver<BusMessage>,
    running: Arc<AtomicBool>,
) {
    log::info!("Fusion thread started");
    let mut fused_count: u64 = 0;

    while running.load(Ordering::Relaxed) {
        select! {
            recv(odometry_rx) -> msg => match msg {
                Ok(msg) => fused_count += fuse_odometry(&fusion, msg),
                Err(_) => break,
            },
            recv(corrected_rx) -> msg => match msg {
                Ok(BusMessage::Odometry(corrected)) => fusion.on_corrected_pose(&corrected),
                Ok(other) => log::warn!("Fusion: unexpected message on correction topic: {:?}", other),
                Err(_) => break,
            },
            default(Duration::from_millis(10)) => {}
        }
    }

    // Poses already queued still get a fused output.
    for msg in odometry_rx.try_iter() {
        fused_count += fuse_odometry(&fusion, msg);
    }

    let last = fusion.last_odometry();
    log::info!(
        "Fusion thread stopped ({} fused, {} corrections, last odometry at [{:.2}, {:.2}, {:.2}])",
        fused_count,
        fusion.corrections_received(),
        last.x,
        last.y,
        last.z
    );
}

/// Fuse one message from the odometry topic. Returns the number fused.
fn fuse_odometry(fusion: &PoseFusion, msg: BusMessage) -> u64 {
    match msg {
        BusMessage::Odometry(odom) => {
            fusion.on_odometry_pose(&odom);
            1
        }
        other => {
            log::warn!("Fusion: unexpected message on odometry topic: {:?}", other);
            0
        }
    }
}
