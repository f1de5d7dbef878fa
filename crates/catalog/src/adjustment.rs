use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use almacen_core::{AdjustmentTypeId, Entity, InventoryError, InventoryResult};

/// A labeled reason for a non-consumption exit (spoilage, correction, ...).
///
/// `affects_cost` tags the resulting movements for cost-impact reporting;
/// `requires_authorization` gates the exit behind an elevated actor claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentType {
    pub id: AdjustmentTypeId,
    pub name: String,
    pub description: String,
    pub affects_cost: bool,
    pub requires_authorization: bool,
    pub active: bool,
}

impl Entity for AdjustmentType {
    type Id = AdjustmentTypeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// In-memory adjustment-type registry.
#[derive(Debug, Default)]
pub struct AdjustmentTypeRegistry {
    types: RwLock<HashMap<AdjustmentTypeId, AdjustmentType>>,
}

impl AdjustmentTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        affects_cost: bool,
        requires_authorization: bool,
    ) -> InventoryResult<AdjustmentType> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(InventoryError::validation("adjustment type name cannot be empty"));
        }

        let adjustment = AdjustmentType {
            id: AdjustmentTypeId::new(),
            name,
            description: description.into(),
            affects_cost,
            requires_authorization,
            active: true,
        };

        let mut types = self.write()?;
        types.insert(adjustment.id, adjustment.clone());
        Ok(adjustment)
    }

    pub fn get(&self, id: AdjustmentTypeId) -> InventoryResult<Option<AdjustmentType>> {
        Ok(self.read()?.get(&id).cloned())
    }

    pub fn require(&self, id: AdjustmentTypeId) -> InventoryResult<AdjustmentType> {
        self.get(id)?.ok_or(InventoryError::NotFound)
    }

    pub fn list(&self) -> InventoryResult<Vec<AdjustmentType>> {
        let mut all: Vec<_> = self.read()?.values().cloned().collect();
        all.sort_by_key(|t| t.id);
        Ok(all)
    }

    pub fn update(
        &self,
        id: AdjustmentTypeId,
        name: impl Into<String>,
        description: impl Into<String>,
        affects_cost: bool,
        requires_authorization: bool,
    ) -> InventoryResult<AdjustmentType> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(InventoryError::validation("adjustment type name cannot be empty"));
        }

        let mut types = self.write()?;
        let adjustment = types.get_mut(&id).ok_or(InventoryError::NotFound)?;
        adjustment.name = name;
        adjustment.description = description.into();
        adjustment.affects_cost = affects_cost;
        adjustment.requires_authorization = requires_authorization;
        Ok(adjustment.clone())
    }

    pub fn deactivate(&self, id: AdjustmentTypeId) -> InventoryResult<()> {
        let mut types = self.write()?;
        let adjustment = types.get_mut(&id).ok_or(InventoryError::NotFound)?;
        adjustment.active = false;
        Ok(())
    }

    /// Hard removal. The service rejects this with `HasMovements` while any
    /// movement still references the type.
    pub fn remove(&self, id: AdjustmentTypeId) -> InventoryResult<()> {
        let mut types = self.write()?;
        types.remove(&id).ok_or(InventoryError::NotFound)?;
        Ok(())
    }

    fn read(
        &self,
    ) -> InventoryResult<std::sync::RwLockReadGuard<'_, HashMap<AdjustmentTypeId, AdjustmentType>>>
    {
        self.types
            .read()
            .map_err(|_| InventoryError::internal("adjustment registry lock poisoned"))
    }

    fn write(
        &self,
    ) -> InventoryResult<std::sync::RwLockWriteGuard<'_, HashMap<AdjustmentTypeId, AdjustmentType>>>
    {
        self.types
            .write()
            .map_err(|_| InventoryError::internal("adjustment registry lock poisoned"))
    }
}
