//! Measurement units and the direct-conversion table.
//!
//! This crate contains the Unit Registry and Conversion Table: unit
//! definitions grouped by physical category, plus directed conversion
//! factors maintained as symmetric pairs. Conversion is a pure read.

pub mod conversion;
pub mod unit;

pub use conversion::{ConversionEdge, ConversionTable};
pub use unit::{MeasurementUnit, UnitCategory, UnitRegistry};
