use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use almacen_core::{AlertId, ItemId, LotId};

/// Notification category, in the platform's wire vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertKind {
    /// Item stock at or below its minimum threshold.
    #[serde(rename = "stock_bajo")]
    LowStock,
    /// Lot expiration within the configured horizon.
    #[serde(rename = "caducidad")]
    Expiration,
    /// Provider payment due. Reserved for the finance scope; never produced
    /// by this core, kept so summaries and filters cover the full set.
    #[serde(rename = "vencimiento_proveedor")]
    ProviderDue,
    /// An authorization-gated adjustment exit was applied (audit notice).
    #[serde(rename = "ajuste_requerido")]
    AdjustmentAuthorized,
}

impl AlertKind {
    pub const ALL: [AlertKind; 4] = [
        AlertKind::LowStock,
        AlertKind::Expiration,
        AlertKind::ProviderDue,
        AlertKind::AdjustmentAuthorized,
    ];
}

/// What an alert is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSubject {
    Item(ItemId),
    Lot(LotId),
}

/// One alert row.
///
/// Alerts are derived state: upserted keyed on `(kind, subject)` and mutated
/// only by read-acknowledgment. Business mutations never touch them beyond
/// the idempotent upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub kind: AlertKind,
    pub subject: AlertSubject,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// Filter for listing and bulk acknowledgment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertFilter {
    pub kind: Option<AlertKind>,
    pub read: Option<bool>,
    pub subject: Option<AlertSubject>,
}

impl AlertFilter {
    pub fn matches(&self, alert: &Alert) -> bool {
        if let Some(kind) = self.kind {
            if alert.kind != kind {
                return false;
            }
        }
        if let Some(read) = self.read {
            if alert.read != read {
                return false;
            }
        }
        if let Some(subject) = self.subject {
            if alert.subject != subject {
                return false;
            }
        }
        true
    }
}

/// Per-kind counts for dashboard widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlertCounts {
    pub kind: AlertKind,
    pub total: usize,
    pub read: usize,
    pub unread: usize,
}
