//! Keyed per-item lock table.
//!
//! Serializes ledger transactions on the same item while letting disjoint
//! items proceed in parallel. Acquisition is bounded: a waiter that cannot
//! get the slot within the configured timeout fails with
//! `InventoryError::Timeout` and is never silently retried.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use almacen_core::{InventoryError, InventoryResult, ItemId};

#[derive(Debug, Default)]
struct Slot {
    locked: Mutex<bool>,
    available: Condvar,
}

/// Lock table keyed by item. Slots are created on first use and kept for the
/// life of the table; the per-item memory cost is one mutex + condvar.
#[derive(Debug)]
pub struct LockTable {
    timeout: Duration,
    slots: Mutex<HashMap<ItemId, Arc<Slot>>>,
}

impl LockTable {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the item's slot, waiting up to the configured timeout.
    pub fn acquire(&self, item: ItemId) -> InventoryResult<ItemLock> {
        let slot = {
            let mut slots = self
                .slots
                .lock()
                .map_err(|_| InventoryError::internal("lock table poisoned"))?;
            Arc::clone(slots.entry(item).or_default())
        };

        let deadline = Instant::now() + self.timeout;
        let mut locked = slot
            .locked
            .lock()
            .map_err(|_| InventoryError::internal("lock slot poisoned"))?;
        while *locked {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(InventoryError::Timeout);
            }
            let (guard, wait) = slot
                .available
                .wait_timeout(locked, remaining)
                .map_err(|_| InventoryError::internal("lock slot poisoned"))?;
            locked = guard;
            if wait.timed_out() && *locked {
                return Err(InventoryError::Timeout);
            }
        }
        *locked = true;
        drop(locked);

        Ok(ItemLock { slot })
    }
}

/// RAII guard: releases the item slot and wakes one waiter on drop.
#[derive(Debug)]
pub struct ItemLock {
    slot: Arc<Slot>,
}

impl Drop for ItemLock {
    fn drop(&mut self) {
        if let Ok(mut locked) = self.slot.locked.lock() {
            *locked = false;
        }
        self.slot.available.notify_one();
    }
}
