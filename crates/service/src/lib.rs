//! Application layer: the `InventoryService` façade, the in-memory movement
//! store, per-item keyed locking, runtime configuration and the background
//! alert sweep worker.

pub mod config;
pub mod locks;
pub mod service;
pub mod store;
pub mod sweep;

pub use config::ServiceConfig;
pub use locks::{ItemLock, LockTable};
pub use service::{EntryRequest, ExitRequest, InventoryService, LotSpec};
pub use store::{MovementStore, StoredStockEvent};
pub use sweep::{AlertSweeper, SweepHandle};
