//! Alert derivation engine.
//!
//! Evaluation is *derived*, not stored incrementally: recomputing from
//! current state always yields the same result no matter how often it runs.
//! The store is an idempotent upsert keyed on `(kind, subject)`, which keeps
//! the event-triggered path (after every ledger commit) and the poll-driven
//! path (periodic sweep) from drifting into duplicate rows.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use almacen_catalog::Item;
use almacen_core::{AlertId, InventoryError, InventoryResult};
use almacen_ledger::LotState;

use crate::alert::{Alert, AlertCounts, AlertFilter, AlertKind, AlertSubject};

/// Default expiration-warning horizon, in days.
pub const DEFAULT_EXPIRATION_HORIZON_DAYS: i64 = 7;

/// In-memory alert engine + store.
#[derive(Debug)]
pub struct AlertEngine {
    expiration_horizon: Duration,
    alerts: RwLock<HashMap<(AlertKind, AlertSubject), Alert>>,
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRATION_HORIZON_DAYS)
    }
}

impl AlertEngine {
    pub fn new(expiration_horizon_days: i64) -> Self {
        Self {
            expiration_horizon: Duration::days(expiration_horizon_days),
            alerts: RwLock::new(HashMap::new()),
        }
    }

    /// Re-evaluate the low-stock condition for one item.
    ///
    /// Idempotent: an existing unread alert is left untouched; a read alert
    /// whose condition fires again is reopened (single transition back to
    /// unread, so a second run is a no-op); nothing is ever duplicated.
    pub fn evaluate_item(&self, item: &Item, now: DateTime<Utc>) -> InventoryResult<Option<Alert>> {
        if !item.active || item.current_stock > item.minimum_stock {
            return Ok(None);
        }

        let message = format!(
            "low stock: {} ({} <= {})",
            item.name, item.current_stock, item.minimum_stock
        );
        self.upsert(AlertKind::LowStock, AlertSubject::Item(item.id), message, now)
    }

    /// Re-evaluate the expiration condition for one lot.
    ///
    /// Fires when the lot still holds quantity and its expiration date falls
    /// within the configured horizon (already-expired lots included).
    pub fn evaluate_lot(&self, lot: &LotState, now: DateTime<Utc>) -> InventoryResult<Option<Alert>> {
        let Some(expiration) = lot.expiration_date else {
            return Ok(None);
        };
        if !lot.is_open() {
            return Ok(None);
        }
        let horizon_end = (now + self.expiration_horizon).date_naive();
        if expiration > horizon_end {
            return Ok(None);
        }

        let message = format!("lot {} expires {}", lot.code, expiration);
        self.upsert(AlertKind::Expiration, AlertSubject::Lot(lot.id), message, now)
    }

    /// Record the audit notice for an applied authorization-gated exit.
    pub fn note_authorized_adjustment(
        &self,
        item: &Item,
        adjustment_name: &str,
        now: DateTime<Utc>,
    ) -> InventoryResult<Option<Alert>> {
        let message = format!(
            "authorization-gated adjustment '{}' applied to {}",
            adjustment_name, item.name
        );
        self.upsert(
            AlertKind::AdjustmentAuthorized,
            AlertSubject::Item(item.id),
            message,
            now,
        )
    }

    /// Idempotent upsert keyed on `(kind, subject)`.
    fn upsert(
        &self,
        kind: AlertKind,
        subject: AlertSubject,
        message: String,
        now: DateTime<Utc>,
    ) -> InventoryResult<Option<Alert>> {
        let mut alerts = self.write()?;
        match alerts.entry((kind, subject)) {
            Entry::Occupied(mut occupied) => {
                let alert = occupied.get_mut();
                if !alert.read {
                    // Unread alert for the same condition: leave untouched.
                    return Ok(None);
                }
                alert.read = false;
                alert.read_at = None;
                alert.created_at = now;
                alert.message = message;
                debug!(kind = ?kind, subject = ?subject, "alert reopened");
                Ok(Some(alert.clone()))
            }
            Entry::Vacant(vacant) => {
                let alert = Alert {
                    id: AlertId::new(),
                    kind,
                    subject,
                    message,
                    read: false,
                    created_at: now,
                    read_at: None,
                };
                debug!(kind = ?kind, subject = ?subject, "alert created");
                Ok(Some(vacant.insert(alert).clone()))
            }
        }
    }

    /// Acknowledge one alert. Re-marking an already-read alert is a no-op.
    pub fn mark_read(&self, id: AlertId, now: DateTime<Utc>) -> InventoryResult<Alert> {
        let mut alerts = self.write()?;
        let alert = alerts
            .values_mut()
            .find(|a| a.id == id)
            .ok_or(InventoryError::NotFound)?;
        if !alert.read {
            alert.read = true;
            alert.read_at = Some(now);
        }
        Ok(alert.clone())
    }

    /// Acknowledge every alert matching the filter. Returns how many rows
    /// actually transitioned.
    pub fn mark_all_read(&self, filter: AlertFilter, now: DateTime<Utc>) -> InventoryResult<usize> {
        let mut alerts = self.write()?;
        let mut transitioned = 0;
        for alert in alerts.values_mut() {
            if !alert.read && filter.matches(alert) {
                alert.read = true;
                alert.read_at = Some(now);
                transitioned += 1;
            }
        }
        Ok(transitioned)
    }

    pub fn list(&self, filter: AlertFilter) -> InventoryResult<Vec<Alert>> {
        let alerts = self.read()?;
        let mut matched: Vec<_> = alerts
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(matched)
    }

    /// Total/read/unread counts per alert kind, including empty kinds.
    pub fn summary(&self) -> InventoryResult<Vec<AlertCounts>> {
        let alerts = self.read()?;
        Ok(AlertKind::ALL
            .iter()
            .map(|kind| {
                let mut counts = AlertCounts {
                    kind: *kind,
                    total: 0,
                    read: 0,
                    unread: 0,
                };
                for alert in alerts.values().filter(|a| a.kind == *kind) {
                    counts.total += 1;
                    if alert.read {
                        counts.read += 1;
                    } else {
                        counts.unread += 1;
                    }
                }
                counts
            })
            .collect())
    }

    fn read(
        &self,
    ) -> InventoryResult<std::sync::RwLockReadGuard<'_, HashMap<(AlertKind, AlertSubject), Alert>>>
    {
        self.alerts
            .read()
            .map_err(|_| InventoryError::internal("alert store lock poisoned"))
    }

    fn write(
        &self,
    ) -> InventoryResult<std::sync::RwLockWriteGuard<'_, HashMap<(AlertKind, AlertSubject), Alert>>>
    {
        self.alerts
            .write()
            .map_err(|_| InventoryError::internal("alert store lock poisoned"))
    }
}
