//! Domain error model.

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type used across the domain layer.
pub type InventoryResult<T> = Result<T, InventoryError>;

/// Domain-level error taxonomy.
///
/// Keep this focused on deterministic, business failures (validation,
/// stock rules, uniqueness, referential integrity). Infrastructure faults
/// are folded into `Internal` and surfaced generically at the edge.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// Malformed input (empty names, non-positive quantities, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Conversion attempted between units of different physical categories.
    #[error("category mismatch: {0}")]
    CategoryMismatch(String),

    /// No direct conversion edge between the two units.
    ///
    /// Edges are never composed transitively; the caller must define the
    /// missing edge explicitly.
    #[error("no direct conversion: {0}")]
    NoDirectConversion(String),

    /// Exit quantity exceeds the item's current stock.
    #[error("insufficient stock (available {available}, requested {requested})")]
    InsufficientStock {
        available: Decimal,
        requested: Decimal,
    },

    /// Exit quantity exceeds the targeted lot's remaining quantity.
    #[error("insufficient lot quantity (available {available}, requested {requested})")]
    InsufficientLotQuantity {
        available: Decimal,
        requested: Decimal,
    },

    /// Actor lacks the elevated claim required by the adjustment type.
    #[error("unauthorized")]
    Unauthorized,

    /// The conversion edge pair already exists.
    #[error("duplicate conversion edge: {0}")]
    DuplicateEdge(String),

    /// Lot code already used for this item.
    #[error("duplicate lot code: {0}")]
    DuplicateCode(String),

    /// Deletion blocked: movements reference the record.
    #[error("referenced by movements")]
    HasMovements,

    /// Deletion blocked: at least one lot still holds quantity.
    #[error("item has open lots")]
    HasOpenLots,

    /// A requested record was not found.
    #[error("not found")]
    NotFound,

    /// A bounded transaction timed out (e.g. lock contention).
    ///
    /// Transient: safe for the *caller* to retry; never retried internally.
    #[error("transaction timed out")]
    Timeout,

    /// Optimistic concurrency check failed (stale stream version).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure fault (lock poisoning, serialization, ...).
    #[error("internal error: {0}")]
    Internal(String),
}

impl InventoryError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn category_mismatch(msg: impl Into<String>) -> Self {
        Self::CategoryMismatch(msg.into())
    }

    pub fn no_direct_conversion(msg: impl Into<String>) -> Self {
        Self::NoDirectConversion(msg.into())
    }

    pub fn duplicate_edge(msg: impl Into<String>) -> Self {
        Self::DuplicateEdge(msg.into())
    }

    pub fn duplicate_code(msg: impl Into<String>) -> Self {
        Self::DuplicateCode(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// True for failures that may succeed on a plain retry.
    ///
    /// Business-rule rejections are deterministic: retrying them without new
    /// information cannot succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Conflict(_) | Self::Internal(_))
    }
}
