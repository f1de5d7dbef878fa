//! Movement ledger domain module (event-sourced).
//!
//! The append-only record of stock-affecting events is the single source of
//! truth for quantities: item stock, lot balances and the weighted-average
//! unit cost are all deterministic folds over an item's movement stream.
//! This crate is pure domain logic (no IO, no locking, no storage); the
//! service layer wraps it in per-item serialized transactions.

pub mod movement;
pub mod stock;

pub use movement::{Movement, MovementDirection, MovementFilter, MovementKind};
pub use stock::{
    EntryLot, EntryRecorded, ExitRecorded, LotOpened, LotState, RecordEntry, RecordExit,
    StockCommand, StockEvent, StockPosition,
};
