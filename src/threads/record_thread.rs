//! Records bus traffic to a bag file.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Select};

use crate::io::BusMessage;
use crate::io::bag::BagRecorder;

/// Handle to the record thread.
pub struct RecordThread {
    handle: JoinHandle<()>,
}

impl RecordThread {
    /// Spawn a recorder over `(topic, subscription)` pairs.
    pub fn spawn(
        recorder: BagRecorder,
        subscriptions: Vec<(String, Receiver<BusMessage>)>,
        running: Arc<AtomicBool>,
    ) -> std::io::Result<Self> {
        let handle = thread::Builder::new()
            .name("record".into())
            .spawn(move || {
                run_record_loop(recorder, subscriptions, running);
            })?;

        Ok(Self { handle })
    }

    /// Wait for the thread to finish.
    pub fn join(self) {
        if let Err(e) = self.handle.join() {
            log::error!("Record thread panicked: {:?}", e);
        }
    }
}

fn run_record_loop(
    mut recorder: BagRecorder,
    subscriptions: Vec<(String, Receiver<BusMessage>)>,
    running: Arc<AtomicBool>,
) {
    log::info!("Record thread started ({} topics)", subscriptions.len());

    let mut select = Select::new();
    for (_, rx) in &subscriptions {
        select.recv(rx);
    }

    while running.load(Ordering::Relaxed) {
        let Ok(oper) = select.select_timeout(Duration::from_millis(10)) else {
            continue;
        };
        let index = oper.index();
        let (topic, rx) = &subscriptions[index];
        match oper.recv(rx) {
            Ok(msg) => {
                if let Err(e) = recorder.record_bus(topic, &msg) {
                    log::warn!("Dropping {} message: {}", topic, e);
                }
            }
            Err(_) => {
                select.remove(index);
            }
        }
    }

    // Drain what is already queued.
    for (topic, rx) in &subscriptions {
        for msg in rx.try_iter() {
            if let Err(e) = recorder.record_bus(topic, &msg) {
                log::warn!("Dropping {} message: {}", topic, e);
            }
        }
    }

    match recorder.finish() {
        Ok(info) => log::info!(
            "Recorded {} messages ({:.1}s, {:.1} msg/s) to {}",
            info.message_count,
            info.duration_secs(),
            info.message_rate_hz(),
            info.path.display()
        ),
        Err(e) => log::error!("Failed to finish bag: {}", e),
    }
}
