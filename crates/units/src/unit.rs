use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use almacen_core::{Entity, InventoryError, InventoryResult, UnitId};

/// Physical category of a measurement unit.
///
/// Conversions are only meaningful inside one category; the conversion table
/// rejects cross-category edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitCategory {
    Mass,
    Volume,
    Count,
    Length,
    Area,
}

impl core::fmt::Display for UnitCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            UnitCategory::Mass => "mass",
            UnitCategory::Volume => "volume",
            UnitCategory::Count => "count",
            UnitCategory::Length => "length",
            UnitCategory::Area => "area",
        };
        f.write_str(s)
    }
}

/// A measurement unit (kg, g, l, unidad, ...).
///
/// Immutable once referenced by a conversion edge or an item; the service
/// layer enforces that guard since references live outside this registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementUnit {
    pub id: UnitId,
    pub name: String,
    pub abbreviation: String,
    pub category: UnitCategory,
    pub active: bool,
}

impl Entity for MeasurementUnit {
    type Id = UnitId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// In-memory unit registry.
#[derive(Debug, Default)]
pub struct UnitRegistry {
    units: RwLock<HashMap<UnitId, MeasurementUnit>>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &self,
        name: impl Into<String>,
        abbreviation: impl Into<String>,
        category: UnitCategory,
    ) -> InventoryResult<MeasurementUnit> {
        let name = name.into();
        let abbreviation = abbreviation.into();
        if name.trim().is_empty() {
            return Err(InventoryError::validation("unit name cannot be empty"));
        }
        if abbreviation.trim().is_empty() {
            return Err(InventoryError::validation("unit abbreviation cannot be empty"));
        }

        let unit = MeasurementUnit {
            id: UnitId::new(),
            name,
            abbreviation,
            category,
            active: true,
        };

        let mut units = self.write()?;
        units.insert(unit.id, unit.clone());
        Ok(unit)
    }

    pub fn get(&self, id: UnitId) -> InventoryResult<Option<MeasurementUnit>> {
        Ok(self.read()?.get(&id).cloned())
    }

    /// Lookup that treats absence as a domain `NotFound`.
    pub fn require(&self, id: UnitId) -> InventoryResult<MeasurementUnit> {
        self.get(id)?.ok_or(InventoryError::NotFound)
    }

    pub fn list(&self) -> InventoryResult<Vec<MeasurementUnit>> {
        let mut all: Vec<_> = self.read()?.values().cloned().collect();
        all.sort_by_key(|u| u.id);
        Ok(all)
    }

    /// Rename a unit. The caller must have verified the unit is unreferenced.
    pub fn update(
        &self,
        id: UnitId,
        name: impl Into<String>,
        abbreviation: impl Into<String>,
    ) -> InventoryResult<MeasurementUnit> {
        let name = name.into();
        let abbreviation = abbreviation.into();
        if name.trim().is_empty() || abbreviation.trim().is_empty() {
            return Err(InventoryError::validation("unit name/abbreviation cannot be empty"));
        }

        let mut units = self.write()?;
        let unit = units.get_mut(&id).ok_or(InventoryError::NotFound)?;
        unit.name = name;
        unit.abbreviation = abbreviation;
        Ok(unit.clone())
    }

    /// Soft-delete: the unit stays resolvable for historical data.
    pub fn deactivate(&self, id: UnitId) -> InventoryResult<()> {
        let mut units = self.write()?;
        let unit = units.get_mut(&id).ok_or(InventoryError::NotFound)?;
        unit.active = false;
        Ok(())
    }

    /// Hard removal. The caller must have verified the unit is unreferenced.
    pub fn remove(&self, id: UnitId) -> InventoryResult<()> {
        let mut units = self.write()?;
        units.remove(&id).ok_or(InventoryError::NotFound)?;
        Ok(())
    }

    fn read(
        &self,
    ) -> InventoryResult<std::sync::RwLockReadGuard<'_, HashMap<UnitId, MeasurementUnit>>> {
        self.units
            .read()
            .map_err(|_| InventoryError::internal("unit registry lock poisoned"))
    }

    fn write(
        &self,
    ) -> InventoryResult<std::sync::RwLockWriteGuard<'_, HashMap<UnitId, MeasurementUnit>>> {
        self.units
            .write()
            .map_err(|_| InventoryError::internal("unit registry lock poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_require_round_trip() {
        let registry = UnitRegistry::new();
        let kg = registry.create("kilogramo", "kg", UnitCategory::Mass).unwrap();
        let found = registry.require(kg.id).unwrap();
        assert_eq!(found, kg);
        assert!(found.active);
    }

    #[test]
    fn empty_name_is_rejected() {
        let registry = UnitRegistry::new();
        let err = registry.create("  ", "kg", UnitCategory::Mass).unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));
    }

    #[test]
    fn deactivate_keeps_unit_resolvable() {
        let registry = UnitRegistry::new();
        let kg = registry.create("kilogramo", "kg", UnitCategory::Mass).unwrap();
        registry.deactivate(kg.id).unwrap();
        assert!(!registry.require(kg.id).unwrap().active);
    }

    #[test]
    fn require_missing_is_not_found() {
        let registry = UnitRegistry::new();
        assert_eq!(registry.require(UnitId::new()).unwrap_err(), InventoryError::NotFound);
    }
}
