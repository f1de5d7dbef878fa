//! In-memory append-only movement store.
//!
//! One stream per item, holding that item's `StockEvent`s in commit order.
//! Sequence numbers are assigned at append time and never reused; streams are
//! never truncated or rewritten. Intended for tests/dev and as the reference
//! semantics for a persistent backend.

use std::collections::HashMap;
use std::sync::RwLock;

use almacen_core::{
    Aggregate, AdjustmentTypeId, ExpectedVersion, InventoryError, InventoryResult, ItemId,
};
use almacen_ledger::{Movement, MovementFilter, StockEvent, StockPosition};

/// A committed event with its position in the item's stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredStockEvent {
    pub sequence_number: u64,
    pub event: StockEvent,
}

#[derive(Debug, Default)]
pub struct MovementStore {
    streams: RwLock<HashMap<ItemId, Vec<StoredStockEvent>>>,
}

impl MovementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append events to an item's stream under an optimistic version check.
    ///
    /// The expected version is the stream length at decision time; a mismatch
    /// means another writer committed in between and surfaces as `Conflict`.
    /// The keyed lock in the service layer makes that unreachable in normal
    /// operation; this check is the defense underneath it.
    pub fn append(
        &self,
        item: ItemId,
        expected: ExpectedVersion,
        events: Vec<StockEvent>,
    ) -> InventoryResult<Vec<StoredStockEvent>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let mut streams = self.write()?;
        let stream = streams.entry(item).or_default();
        expected.check(stream.len() as u64)?;

        let mut next = stream.len() as u64 + 1;
        let mut committed = Vec::with_capacity(events.len());
        for event in events {
            let stored = StoredStockEvent {
                sequence_number: next,
                event,
            };
            next += 1;
            stream.push(stored.clone());
            committed.push(stored);
        }
        Ok(committed)
    }

    pub fn load(&self, item: ItemId) -> InventoryResult<Vec<StoredStockEvent>> {
        Ok(self.read()?.get(&item).cloned().unwrap_or_default())
    }

    /// Fold an item's stream into its current stock position.
    pub fn rehydrate(&self, item: ItemId) -> InventoryResult<StockPosition> {
        let mut position = StockPosition::empty(item);
        let streams = self.read()?;
        if let Some(stream) = streams.get(&item) {
            for stored in stream {
                position.apply(&stored.event);
            }
        }
        Ok(position)
    }

    /// Read-only movement projection over every stream.
    pub fn query(&self, filter: &MovementFilter) -> InventoryResult<Vec<Movement>> {
        let streams = self.read()?;
        let mut movements: Vec<Movement> = Vec::new();
        for (item, stream) in streams.iter() {
            if let Some(wanted) = filter.item {
                if *item != wanted {
                    continue;
                }
            }
            for stored in stream {
                if let Some(movement) = stored.event.to_movement(stored.sequence_number) {
                    if filter.matches(&movement) {
                        movements.push(movement);
                    }
                }
            }
        }
        movements.sort_by(|a, b| {
            a.occurred_at
                .cmp(&b.occurred_at)
                .then(a.item_id.cmp(&b.item_id))
                .then(a.sequence_number.cmp(&b.sequence_number))
        });
        Ok(movements)
    }

    /// True when the item's stream contains at least one movement
    /// (`LotOpened` bookkeeping alone does not count, and cannot occur alone).
    pub fn has_movements(&self, item: ItemId) -> InventoryResult<bool> {
        let streams = self.read()?;
        Ok(streams.get(&item).is_some_and(|stream| {
            stream
                .iter()
                .any(|s| s.event.to_movement(s.sequence_number).is_some())
        }))
    }

    /// True when any exit movement in any stream references the type.
    pub fn adjustment_type_referenced(&self, id: AdjustmentTypeId) -> InventoryResult<bool> {
        let streams = self.read()?;
        Ok(streams.values().flatten().any(|s| {
            matches!(&s.event, StockEvent::ExitRecorded(e) if e.adjustment_type == id)
        }))
    }

    pub fn item_ids(&self) -> InventoryResult<Vec<ItemId>> {
        let mut ids: Vec<_> = self.read()?.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    fn read(
        &self,
    ) -> InventoryResult<std::sync::RwLockReadGuard<'_, HashMap<ItemId, Vec<StoredStockEvent>>>>
    {
        self.streams
            .read()
            .map_err(|_| InventoryError::internal("movement store lock poisoned"))
    }

    fn write(
        &self,
    ) -> InventoryResult<std::sync::RwLockWriteGuard<'_, HashMap<ItemId, Vec<StoredStockEvent>>>>
    {
        self.streams
            .write()
            .map_err(|_| InventoryError::internal("movement store lock poisoned"))
    }
}
