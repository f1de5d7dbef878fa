use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use almacen_core::{ActorId, AdjustmentTypeId, ItemId, LotId, MovementId, ProviderId};

/// Direction of a stock-affecting movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementDirection {
    #[serde(rename = "entrada")]
    Entry,
    #[serde(rename = "salida")]
    Exit,
}

/// Tagged movement payload.
///
/// An entry is provider-linked, an exit is adjustment-type-linked; modeling
/// the two as variants keeps the mutually-exclusive optional fields of the
/// flat row shape unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementKind {
    #[serde(rename = "entrada")]
    Entry {
        provider: Option<ProviderId>,
        /// Declared cost per unit of record; drives the weighted-average
        /// recomputation when present.
        unit_cost: Option<Decimal>,
        lot: Option<LotId>,
    },
    #[serde(rename = "salida")]
    Exit {
        adjustment_type: AdjustmentTypeId,
        /// Snapshot of the adjustment type's cost-impact flag at record
        /// time, for reporting (exits never change the unit cost).
        affects_cost: bool,
        lot: Option<LotId>,
    },
}

impl MovementKind {
    pub fn direction(&self) -> MovementDirection {
        match self {
            MovementKind::Entry { .. } => MovementDirection::Entry,
            MovementKind::Exit { .. } => MovementDirection::Exit,
        }
    }

    pub fn lot(&self) -> Option<LotId> {
        match self {
            MovementKind::Entry { lot, .. } | MovementKind::Exit { lot, .. } => *lot,
        }
    }
}

/// One row of the append-only movement ledger.
///
/// Movements are never edited or deleted; corrections are themselves new
/// movements. Balances are always a fold over the movement history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub item_id: ItemId,
    /// Positive, expressed in the item's unit of record.
    pub quantity: Decimal,
    pub kind: MovementKind,
    pub description: String,
    pub actor: ActorId,
    pub occurred_at: DateTime<Utc>,
    /// Position in the item's stream, assigned by the movement store.
    pub sequence_number: u64,
}

/// Read-only projection filter for `query_movements`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementFilter {
    pub item: Option<ItemId>,
    pub lot: Option<LotId>,
    pub direction: Option<MovementDirection>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl MovementFilter {
    pub fn matches(&self, movement: &Movement) -> bool {
        if let Some(item) = self.item {
            if movement.item_id != item {
                return false;
            }
        }
        if let Some(lot) = self.lot {
            if movement.kind.lot() != Some(lot) {
                return false;
            }
        }
        if let Some(direction) = self.direction {
            if movement.kind.direction() != direction {
                return false;
            }
        }
        if let Some(from) = self.from {
            if movement.occurred_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if movement.occurred_at > to {
                return false;
            }
        }
        true
    }
}
