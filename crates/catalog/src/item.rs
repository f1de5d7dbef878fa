use std::collections::HashMap;
use std::sync::RwLock;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use almacen_core::{Entity, InventoryError, InventoryResult, ItemId, UnitId};

/// A raw-material definition.
///
/// `current_stock` and `unit_cost` are projections of the movement ledger:
/// the ledger is the source of truth and the service layer refreshes these
/// fields after every committed transaction. They exist so list/detail
/// queries never have to rehydrate a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    /// Unit of record: every movement quantity is expressed in this unit.
    pub unit: UnitId,
    pub minimum_stock: Decimal,
    pub current_stock: Decimal,
    /// Weighted-average cost per unit of record, adjusted only by entries.
    pub unit_cost: Decimal,
    pub active: bool,
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// In-memory item catalog.
#[derive(Debug, Default)]
pub struct ItemCatalog {
    items: RwLock<HashMap<ItemId, Item>>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        unit: UnitId,
        minimum_stock: Decimal,
        unit_cost: Decimal,
    ) -> InventoryResult<Item> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(InventoryError::validation("item name cannot be empty"));
        }
        if minimum_stock < Decimal::ZERO {
            return Err(InventoryError::validation("minimum stock cannot be negative"));
        }
        if unit_cost < Decimal::ZERO {
            return Err(InventoryError::validation("unit cost cannot be negative"));
        }

        let item = Item {
            id: ItemId::new(),
            name,
            description: description.into(),
            unit,
            minimum_stock,
            current_stock: Decimal::ZERO,
            unit_cost,
            active: true,
        };

        let mut items = self.write()?;
        items.insert(item.id, item.clone());
        Ok(item)
    }

    pub fn get(&self, id: ItemId) -> InventoryResult<Option<Item>> {
        Ok(self.read()?.get(&id).cloned())
    }

    pub fn require(&self, id: ItemId) -> InventoryResult<Item> {
        self.get(id)?.ok_or(InventoryError::NotFound)
    }

    pub fn list(&self) -> InventoryResult<Vec<Item>> {
        let mut all: Vec<_> = self.read()?.values().cloned().collect();
        all.sort_by_key(|i| i.id);
        Ok(all)
    }

    pub fn update(
        &self,
        id: ItemId,
        name: impl Into<String>,
        description: impl Into<String>,
        minimum_stock: Decimal,
    ) -> InventoryResult<Item> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(InventoryError::validation("item name cannot be empty"));
        }
        if minimum_stock < Decimal::ZERO {
            return Err(InventoryError::validation("minimum stock cannot be negative"));
        }

        let mut items = self.write()?;
        let item = items.get_mut(&id).ok_or(InventoryError::NotFound)?;
        item.name = name;
        item.description = description.into();
        item.minimum_stock = minimum_stock;
        Ok(item.clone())
    }

    /// Refresh the ledger-derived projection fields after a commit.
    pub fn record_position(
        &self,
        id: ItemId,
        current_stock: Decimal,
        unit_cost: Decimal,
    ) -> InventoryResult<Item> {
        let mut items = self.write()?;
        let item = items.get_mut(&id).ok_or(InventoryError::NotFound)?;
        item.current_stock = current_stock;
        item.unit_cost = unit_cost;
        Ok(item.clone())
    }

    /// Soft-delete: hides the item from the booking/admin pickers while
    /// keeping history resolvable.
    pub fn deactivate(&self, id: ItemId) -> InventoryResult<()> {
        let mut items = self.write()?;
        let item = items.get_mut(&id).ok_or(InventoryError::NotFound)?;
        item.active = false;
        Ok(())
    }

    /// Hard removal. Referential guards (`HasMovements`, `HasOpenLots`) are
    /// enforced by the service, which owns the movement store.
    pub fn remove(&self, id: ItemId) -> InventoryResult<()> {
        let mut items = self.write()?;
        items.remove(&id).ok_or(InventoryError::NotFound)?;
        Ok(())
    }

    fn read(&self) -> InventoryResult<std::sync::RwLockReadGuard<'_, HashMap<ItemId, Item>>> {
        self.items
            .read()
            .map_err(|_| InventoryError::internal("item catalog lock poisoned"))
    }

    fn write(&self) -> InventoryResult<std::sync::RwLockWriteGuard<'_, HashMap<ItemId, Item>>> {
        self.items
            .write()
            .map_err(|_| InventoryError::internal("item catalog lock poisoned"))
    }
}
