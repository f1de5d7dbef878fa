//! Observability bootstrap for hosts embedding the inventory core.

pub mod tracing;

pub use crate::tracing::init;
