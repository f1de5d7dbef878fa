//! Directed conversion edges between units of the same physical category.
//!
//! The table maintains a symmetry invariant: an edge `(A -> B, f)` exists if
//! and only if the reciprocal `(B -> A, 1/f)` exists. Both directions are
//! created and removed as a pair, under one write lock.
//!
//! No transitive composition is performed: converting between two units with
//! no direct edge fails with `NoDirectConversion`.

use std::collections::HashMap;
use std::sync::RwLock;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use almacen_core::{InventoryError, InventoryResult, UnitId, ValueObject};

use crate::unit::MeasurementUnit;

/// A stored, directed conversion factor:
/// `quantity_destination = quantity_origin * factor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionEdge {
    pub origin: UnitId,
    pub destination: UnitId,
    pub factor: Decimal,
}

impl ValueObject for ConversionEdge {}

/// In-memory conversion table.
#[derive(Debug, Default)]
pub struct ConversionTable {
    edges: RwLock<HashMap<(UnitId, UnitId), Decimal>>,
}

impl ConversionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define the edge and its reciprocal in one atomic step.
    pub fn define(
        &self,
        origin: &MeasurementUnit,
        destination: &MeasurementUnit,
        factor: Decimal,
    ) -> InventoryResult<()> {
        if factor <= Decimal::ZERO {
            return Err(InventoryError::validation("conversion factor must be positive"));
        }
        if origin.id == destination.id {
            return Err(InventoryError::validation("conversion endpoints must differ"));
        }
        if origin.category != destination.category {
            return Err(InventoryError::category_mismatch(format!(
                "{} ({}) vs {} ({})",
                origin.abbreviation, origin.category, destination.abbreviation, destination.category
            )));
        }

        let reciprocal = Decimal::ONE
            .checked_div(factor)
            .ok_or_else(|| InventoryError::validation("conversion factor out of range"))?;

        let mut edges = self.write()?;
        if edges.contains_key(&(origin.id, destination.id))
            || edges.contains_key(&(destination.id, origin.id))
        {
            return Err(InventoryError::duplicate_edge(format!(
                "{} -> {}",
                origin.abbreviation, destination.abbreviation
            )));
        }

        edges.insert((origin.id, destination.id), factor);
        edges.insert((destination.id, origin.id), reciprocal);
        Ok(())
    }

    /// Remove both directions atomically.
    pub fn remove(&self, origin: UnitId, destination: UnitId) -> InventoryResult<()> {
        let mut edges = self.write()?;
        if edges.remove(&(origin, destination)).is_none() {
            return Err(InventoryError::NotFound);
        }
        // The reciprocal is always present when the forward edge is: the pair
        // is only ever written/removed under this same lock.
        edges.remove(&(destination, origin));
        Ok(())
    }

    /// Convert using the stored direct edge. Purely functional.
    ///
    /// Same-unit conversion is the identity; any other pair without a direct
    /// edge fails (edges are never composed through an intermediate unit).
    pub fn convert(
        &self,
        quantity: Decimal,
        origin: UnitId,
        destination: UnitId,
    ) -> InventoryResult<Decimal> {
        if origin == destination {
            return Ok(quantity);
        }

        let edges = self.read()?;
        let factor = edges
            .get(&(origin, destination))
            .copied()
            .ok_or_else(|| {
                InventoryError::no_direct_conversion(format!("{origin} -> {destination}"))
            })?;

        quantity
            .checked_mul(factor)
            .ok_or_else(|| InventoryError::validation("converted quantity out of range"))
    }

    pub fn factor(&self, origin: UnitId, destination: UnitId) -> InventoryResult<Option<Decimal>> {
        Ok(self.read()?.get(&(origin, destination)).copied())
    }

    /// True when any edge touches `unit` (used for the immutability guard).
    pub fn references_unit(&self, unit: UnitId) -> InventoryResult<bool> {
        Ok(self
            .read()?
            .keys()
            .any(|(o, d)| *o == unit || *d == unit))
    }

    pub fn list(&self) -> InventoryResult<Vec<ConversionEdge>> {
        let mut all: Vec<_> = self
            .read()?
            .iter()
            .map(|((origin, destination), factor)| ConversionEdge {
                origin: *origin,
                destination: *destination,
                factor: *factor,
            })
            .collect();
        all.sort_by_key(|e| (e.origin, e.destination));
        Ok(all)
    }

    fn read(
        &self,
    ) -> InventoryResult<std::sync::RwLockReadGuard<'_, HashMap<(UnitId, UnitId), Decimal>>> {
        self.edges
            .read()
            .map_err(|_| InventoryError::internal("conversion table lock poisoned"))
    }

    fn write(
        &self,
    ) -> InventoryResult<std::sync::RwLockWriteGuard<'_, HashMap<(UnitId, UnitId), Decimal>>> {
        self.edges
            .write()
            .map_err(|_| InventoryError::internal("conversion table lock poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::UnitCategory;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn unit(abbr: &str, category: UnitCategory) -> MeasurementUnit {
        MeasurementUnit {
            id: UnitId::new(),
            name: abbr.to_string(),
            abbreviation: abbr.to_string(),
            category,
            active: true,
        }
    }

    #[test]
    fn define_creates_both_directions() {
        let table = ConversionTable::new();
        let kg = unit("kg", UnitCategory::Mass);
        let g = unit("g", UnitCategory::Mass);

        table.define(&kg, &g, dec!(1000)).unwrap();

        assert_eq!(table.convert(dec!(2), kg.id, g.id).unwrap(), dec!(2000));
        assert_eq!(table.convert(dec!(2000), g.id, kg.id).unwrap(), dec!(2));
    }

    #[test]
    fn category_mismatch_is_rejected() {
        let table = ConversionTable::new();
        let kg = unit("kg", UnitCategory::Mass);
        let l = unit("l", UnitCategory::Volume);

        let err = table.define(&kg, &l, dec!(1)).unwrap_err();
        assert!(matches!(err, InventoryError::CategoryMismatch(_)));
    }

    #[test]
    fn duplicate_edge_is_rejected_in_either_direction() {
        let table = ConversionTable::new();
        let kg = unit("kg", UnitCategory::Mass);
        let g = unit("g", UnitCategory::Mass);

        table.define(&kg, &g, dec!(1000)).unwrap();
        assert!(matches!(
            table.define(&kg, &g, dec!(1000)).unwrap_err(),
            InventoryError::DuplicateEdge(_)
        ));
        assert!(matches!(
            table.define(&g, &kg, dec!(0.001)).unwrap_err(),
            InventoryError::DuplicateEdge(_)
        ));
    }

    #[test]
    fn non_positive_factor_is_rejected() {
        let table = ConversionTable::new();
        let kg = unit("kg", UnitCategory::Mass);
        let g = unit("g", UnitCategory::Mass);

        assert!(matches!(
            table.define(&kg, &g, dec!(0)).unwrap_err(),
            InventoryError::Validation(_)
        ));
        assert!(matches!(
            table.define(&kg, &g, dec!(-5)).unwrap_err(),
            InventoryError::Validation(_)
        ));
    }

    #[test]
    fn self_conversion_is_identity() {
        let table = ConversionTable::new();
        let kg = unit("kg", UnitCategory::Mass);
        assert_eq!(table.convert(dec!(7.5), kg.id, kg.id).unwrap(), dec!(7.5));
    }

    #[test]
    fn missing_edge_fails_without_graph_search() {
        let table = ConversionTable::new();
        let kg = unit("kg", UnitCategory::Mass);
        let g = unit("g", UnitCategory::Mass);
        let mg = unit("mg", UnitCategory::Mass);

        table.define(&kg, &g, dec!(1000)).unwrap();
        table.define(&g, &mg, dec!(1000)).unwrap();

        // kg -> mg is reachable through g, but composition is not performed.
        assert!(matches!(
            table.convert(dec!(1), kg.id, mg.id).unwrap_err(),
            InventoryError::NoDirectConversion(_)
        ));
    }

    #[test]
    fn symmetry_invariant_holds_in_listing() {
        let table = ConversionTable::new();
        let kg = unit("kg", UnitCategory::Mass);
        let g = unit("g", UnitCategory::Mass);

        table.define(&kg, &g, dec!(1000)).unwrap();
        let edges = table.list().unwrap();
        assert_eq!(edges.len(), 2);
        for edge in &edges {
            let reciprocal = edges
                .iter()
                .find(|e| e.origin == edge.destination && e.destination == edge.origin)
                .expect("reciprocal edge present");
            assert_eq!(reciprocal.factor, Decimal::ONE / edge.factor);
        }

        table.remove(g.id, kg.id).unwrap();
        assert!(table.list().unwrap().is_empty());
        assert_eq!(table.remove(kg.id, g.id).unwrap_err(), InventoryError::NotFound);
    }

    proptest! {
        /// Round-trip property: converting there and back recovers the
        /// original quantity within decimal rounding tolerance.
        #[test]
        fn convert_round_trip(
            mantissa in 1i64..1_000_000_000i64,
            scale in 0u32..4,
            q_mantissa in 0i64..1_000_000_000i64,
            q_scale in 0u32..4,
        ) {
            let table = ConversionTable::new();
            let a = unit("a", UnitCategory::Volume);
            let b = unit("b", UnitCategory::Volume);

            let factor = Decimal::new(mantissa, scale);
            let quantity = Decimal::new(q_mantissa, q_scale);
            table.define(&a, &b, factor).unwrap();

            let there = table.convert(quantity, a.id, b.id).unwrap();
            let back = table.convert(there, b.id, a.id).unwrap();

            let tolerance = quantity.abs() * Decimal::new(1, 12) + Decimal::new(1, 12);
            prop_assert!((back - quantity).abs() <= tolerance);
        }
    }
}
