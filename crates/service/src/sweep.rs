//! Background alert sweep worker.
//!
//! Periodically runs a full derived re-evaluation of every item and lot so
//! time-driven conditions (lot expirations crossing the horizon) surface
//! without waiting for the next ledger commit. The sweep is idempotent, so
//! overlapping with the event-triggered evaluation path is harmless.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use tracing::{debug, warn};

use crate::service::InventoryService;

/// Handle to control and join the sweep thread.
#[derive(Debug)]
pub struct SweepHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl SweepHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

pub struct AlertSweeper;

impl AlertSweeper {
    /// Spawn the sweep thread; interval comes from the service config.
    pub fn spawn(service: Arc<InventoryService>) -> SweepHandle {
        let interval = service.config().sweep_interval();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join = thread::Builder::new()
            .name("alert-sweep".to_string())
            .spawn(move || {
                loop {
                    // The shutdown channel doubles as the tick timer.
                    match shutdown_rx.recv_timeout(interval) {
                        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                        Err(mpsc::RecvTimeoutError::Timeout) => {}
                    }
                    match service.sweep() {
                        Ok(()) => debug!("alert sweep completed"),
                        Err(err) => warn!(error = %err, "alert sweep failed"),
                    }
                }
            })
            .ok();

        if join.is_none() {
            warn!("failed to spawn alert sweep thread");
        }

        SweepHandle {
            shutdown: shutdown_tx,
            join,
        }
    }
}
