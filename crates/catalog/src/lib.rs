//! Raw-material catalog and adjustment-type registry.
//!
//! Items carry ledger-projected stock/cost fields; lots are not stored here
//! at all — they are derived from the movement stream by the ledger crate.

pub mod adjustment;
pub mod item;

pub use adjustment::{AdjustmentType, AdjustmentTypeRegistry};
pub use item::{Item, ItemCatalog};
