//! Alert engine: low-stock, lot-expiration and adjustment-audit
//! notifications derived from catalog and ledger state.

pub mod alert;
pub mod engine;

pub use alert::{Alert, AlertCounts, AlertFilter, AlertKind, AlertSubject};
pub use engine::{AlertEngine, DEFAULT_EXPIRATION_HORIZON_DAYS};
