use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use almacen_core::{
    ActorId, AdjustmentTypeId, Aggregate, AggregateRoot, Event, InventoryError, ItemId, LotId,
    MovementId, ProviderId,
};

use crate::movement::{Movement, MovementKind};

/// Ledger-derived state of one lot (batch) of an item.
///
/// Lots are opened by entry movements and depleted by exits; both quantities
/// are folds over the item's movement stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotState {
    pub id: LotId,
    pub code: String,
    pub initial_quantity: Decimal,
    pub current_quantity: Decimal,
    pub expiration_date: Option<NaiveDate>,
}

impl LotState {
    pub fn is_open(&self) -> bool {
        self.current_quantity > Decimal::ZERO
    }
}

/// Lot targeting of an entry movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryLot {
    /// Untracked stock: no lot involved.
    None,
    /// Open a new lot as part of the same transaction.
    Open {
        lot_id: LotId,
        code: String,
        expiration_date: Option<NaiveDate>,
    },
    /// Restock an existing lot: initial and current quantity both grow.
    Into(LotId),
}

/// Command: record an entry (entrada).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    pub movement_id: MovementId,
    pub quantity: Decimal,
    /// Declared cost per unit; triggers weighted-average recomputation.
    pub unit_cost: Option<Decimal>,
    pub lot: EntryLot,
    pub provider: Option<ProviderId>,
    pub description: String,
    pub actor: ActorId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: record an exit (salida).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordExit {
    pub movement_id: MovementId,
    pub quantity: Decimal,
    pub lot: Option<LotId>,
    pub adjustment_type: AdjustmentTypeId,
    /// Snapshot of the adjustment type's flags at decision time.
    pub affects_cost: bool,
    pub requires_authorization: bool,
    /// Resolved capability check: does the actor hold the elevated claim?
    /// Computed by the service from the actor's claim set; the aggregate
    /// only ever sees the boolean.
    pub actor_authorized: bool,
    pub description: String,
    pub actor: ActorId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockCommand {
    RecordEntry(RecordEntry),
    RecordExit(RecordExit),
}

/// Event: a lot was opened (quantity arrives with the entry event).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotOpened {
    pub item_id: ItemId,
    pub lot_id: LotId,
    pub code: String,
    pub expiration_date: Option<NaiveDate>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: an entry movement was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecorded {
    pub item_id: ItemId,
    pub movement_id: MovementId,
    pub quantity: Decimal,
    pub unit_cost: Option<Decimal>,
    pub lot: Option<LotId>,
    pub provider: Option<ProviderId>,
    pub description: String,
    pub actor: ActorId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: an exit movement was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitRecorded {
    pub item_id: ItemId,
    pub movement_id: MovementId,
    pub quantity: Decimal,
    pub lot: Option<LotId>,
    pub adjustment_type: AdjustmentTypeId,
    pub affects_cost: bool,
    pub description: String,
    pub actor: ActorId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockEvent {
    LotOpened(LotOpened),
    EntryRecorded(EntryRecorded),
    ExitRecorded(ExitRecorded),
}

impl Event for StockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockEvent::LotOpened(_) => "ledger.lot.opened",
            StockEvent::EntryRecorded(_) => "ledger.entry.recorded",
            StockEvent::ExitRecorded(_) => "ledger.exit.recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockEvent::LotOpened(e) => e.occurred_at,
            StockEvent::EntryRecorded(e) => e.occurred_at,
            StockEvent::ExitRecorded(e) => e.occurred_at,
        }
    }
}

impl StockEvent {
    /// Project the event into a queryable movement row, if it is one.
    ///
    /// `LotOpened` is stream bookkeeping, not a movement.
    pub fn to_movement(&self, sequence_number: u64) -> Option<Movement> {
        match self {
            StockEvent::LotOpened(_) => None,
            StockEvent::EntryRecorded(e) => Some(Movement {
                id: e.movement_id,
                item_id: e.item_id,
                quantity: e.quantity,
                kind: MovementKind::Entry {
                    provider: e.provider,
                    unit_cost: e.unit_cost,
                    lot: e.lot,
                },
                description: e.description.clone(),
                actor: e.actor,
                occurred_at: e.occurred_at,
                sequence_number,
            }),
            StockEvent::ExitRecorded(e) => Some(Movement {
                id: e.movement_id,
                item_id: e.item_id,
                quantity: e.quantity,
                kind: MovementKind::Exit {
                    adjustment_type: e.adjustment_type,
                    affects_cost: e.affects_cost,
                    lot: e.lot,
                },
                description: e.description.clone(),
                actor: e.actor,
                occurred_at: e.occurred_at,
                sequence_number,
            }),
        }
    }
}

/// Aggregate root: the stock position of one item.
///
/// Holds the physical quantity of record, the weighted-average unit cost and
/// all lot balances — every field a deterministic fold over the item's
/// movement stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockPosition {
    id: ItemId,
    current_stock: Decimal,
    unit_cost: Decimal,
    lots: HashMap<LotId, LotState>,
    codes: HashMap<String, LotId>,
    version: u64,
    movement_count: u64,
}

impl StockPosition {
    /// Empty position for rehydration.
    pub fn empty(id: ItemId) -> Self {
        Self {
            id,
            current_stock: Decimal::ZERO,
            unit_cost: Decimal::ZERO,
            lots: HashMap::new(),
            codes: HashMap::new(),
            version: 0,
            movement_count: 0,
        }
    }

    pub fn item_id(&self) -> ItemId {
        self.id
    }

    pub fn current_stock(&self) -> Decimal {
        self.current_stock
    }

    pub fn unit_cost(&self) -> Decimal {
        self.unit_cost
    }

    pub fn movement_count(&self) -> u64 {
        self.movement_count
    }

    pub fn lot(&self, id: LotId) -> Option<&LotState> {
        self.lots.get(&id)
    }

    pub fn lot_by_code(&self, code: &str) -> Option<&LotState> {
        self.codes.get(code).and_then(|id| self.lots.get(id))
    }

    pub fn lots(&self) -> impl Iterator<Item = &LotState> {
        self.lots.values()
    }

    pub fn has_open_lots(&self) -> bool {
        self.lots.values().any(LotState::is_open)
    }
}

impl AggregateRoot for StockPosition {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for StockPosition {
    type Command = StockCommand;
    type Event = StockEvent;
    type Error = InventoryError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StockEvent::LotOpened(e) => {
                self.lots.insert(
                    e.lot_id,
                    LotState {
                        id: e.lot_id,
                        code: e.code.clone(),
                        initial_quantity: Decimal::ZERO,
                        current_quantity: Decimal::ZERO,
                        expiration_date: e.expiration_date,
                    },
                );
                self.codes.insert(e.code.clone(), e.lot_id);
            }
            StockEvent::EntryRecorded(e) => {
                // Weighted-average cost, evaluated on pre-entry stock.
                if let Some(cost) = e.unit_cost {
                    let total = self.current_stock + e.quantity;
                    if total > Decimal::ZERO {
                        self.unit_cost =
                            (self.current_stock * self.unit_cost + e.quantity * cost) / total;
                    }
                }
                self.current_stock += e.quantity;
                if let Some(lot_id) = e.lot {
                    if let Some(lot) = self.lots.get_mut(&lot_id) {
                        lot.initial_quantity += e.quantity;
                        lot.current_quantity += e.quantity;
                    }
                }
                self.movement_count += 1;
            }
            StockEvent::ExitRecorded(e) => {
                self.current_stock -= e.quantity;
                if let Some(lot_id) = e.lot {
                    if let Some(lot) = self.lots.get_mut(&lot_id) {
                        lot.current_quantity -= e.quantity;
                    }
                }
                self.movement_count += 1;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StockCommand::RecordEntry(cmd) => self.handle_entry(cmd),
            StockCommand::RecordExit(cmd) => self.handle_exit(cmd),
        }
    }
}

impl StockPosition {
    fn handle_entry(&self, cmd: &RecordEntry) -> Result<Vec<StockEvent>, InventoryError> {
        if cmd.quantity <= Decimal::ZERO {
            return Err(InventoryError::validation("entry quantity must be positive"));
        }
        if let Some(cost) = cmd.unit_cost {
            if cost < Decimal::ZERO {
                return Err(InventoryError::validation("entry unit cost cannot be negative"));
            }
        }

        let mut events = Vec::with_capacity(2);
        let lot = match &cmd.lot {
            EntryLot::None => None,
            EntryLot::Open {
                lot_id,
                code,
                expiration_date,
            } => {
                if code.trim().is_empty() {
                    return Err(InventoryError::validation("lot code cannot be empty"));
                }
                if self.codes.contains_key(code) {
                    return Err(InventoryError::duplicate_code(code.clone()));
                }
                events.push(StockEvent::LotOpened(LotOpened {
                    item_id: self.id,
                    lot_id: *lot_id,
                    code: code.clone(),
                    expiration_date: *expiration_date,
                    occurred_at: cmd.occurred_at,
                }));
                Some(*lot_id)
            }
            EntryLot::Into(lot_id) => {
                if !self.lots.contains_key(lot_id) {
                    return Err(InventoryError::NotFound);
                }
                Some(*lot_id)
            }
        };

        events.push(StockEvent::EntryRecorded(EntryRecorded {
            item_id: self.id,
            movement_id: cmd.movement_id,
            quantity: cmd.quantity,
            unit_cost: cmd.unit_cost,
            lot,
            provider: cmd.provider,
            description: cmd.description.clone(),
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        }));
        Ok(events)
    }

    fn handle_exit(&self, cmd: &RecordExit) -> Result<Vec<StockEvent>, InventoryError> {
        if cmd.quantity <= Decimal::ZERO {
            return Err(InventoryError::validation("exit quantity must be positive"));
        }
        if self.current_stock < cmd.quantity {
            return Err(InventoryError::InsufficientStock {
                available: self.current_stock,
                requested: cmd.quantity,
            });
        }
        if cmd.requires_authorization && !cmd.actor_authorized {
            return Err(InventoryError::Unauthorized);
        }
        if let Some(lot_id) = cmd.lot {
            let lot = self.lots.get(&lot_id).ok_or(InventoryError::NotFound)?;
            if lot.current_quantity < cmd.quantity {
                return Err(InventoryError::InsufficientLotQuantity {
                    available: lot.current_quantity,
                    requested: cmd.quantity,
                });
            }
        }

        Ok(vec![StockEvent::ExitRecorded(ExitRecorded {
            item_id: self.id,
            movement_id: cmd.movement_id,
            quantity: cmd.quantity,
            lot: cmd.lot,
            adjustment_type: cmd.adjustment_type,
            affects_cost: cmd.affects_cost,
            description: cmd.description.clone(),
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use almacen_core::execute;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn entry(quantity: Decimal) -> StockCommand {
        entry_with_cost(quantity, None)
    }

    fn entry_with_cost(quantity: Decimal, unit_cost: Option<Decimal>) -> StockCommand {
        StockCommand::RecordEntry(RecordEntry {
            movement_id: MovementId::new(),
            quantity,
            unit_cost,
            lot: EntryLot::None,
            provider: None,
            description: String::new(),
            actor: ActorId::new(),
            occurred_at: Utc::now(),
        })
    }

    fn exit(quantity: Decimal) -> StockCommand {
        StockCommand::RecordExit(RecordExit {
            movement_id: MovementId::new(),
            quantity,
            lot: None,
            adjustment_type: AdjustmentTypeId::new(),
            affects_cost: false,
            requires_authorization: false,
            actor_authorized: false,
            description: String::new(),
            actor: ActorId::new(),
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn entry_increments_stock() {
        let mut position = StockPosition::empty(ItemId::new());
        execute(&mut position, &entry(dec!(10))).unwrap();
        assert_eq!(position.current_stock(), dec!(10));
        assert_eq!(position.movement_count(), 1);
    }

    #[test]
    fn exit_exceeding_stock_is_rejected_and_state_unchanged() {
        let mut position = StockPosition::empty(ItemId::new());
        execute(&mut position, &entry(dec!(10))).unwrap();
        execute(&mut position, &exit(dec!(7))).unwrap();
        assert_eq!(position.current_stock(), dec!(3));

        let err = execute(&mut position, &exit(dec!(10))).unwrap_err();
        assert_eq!(
            err,
            InventoryError::InsufficientStock {
                available: dec!(3),
                requested: dec!(10),
            }
        );
        assert_eq!(position.current_stock(), dec!(3));
        assert_eq!(position.movement_count(), 2);
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        let position = StockPosition::empty(ItemId::new());
        assert!(matches!(
            position.handle(&entry(dec!(0))).unwrap_err(),
            InventoryError::Validation(_)
        ));
        assert!(matches!(
            position.handle(&exit(dec!(-1))).unwrap_err(),
            InventoryError::Validation(_)
        ));
    }

    #[test]
    fn weighted_average_cost_uses_pre_entry_stock() {
        let mut position = StockPosition::empty(ItemId::new());
        execute(&mut position, &entry_with_cost(dec!(10), Some(dec!(2)))).unwrap();
        assert_eq!(position.unit_cost(), dec!(2));

        // (10*2 + 10*4) / 20 = 3
        execute(&mut position, &entry_with_cost(dec!(10), Some(dec!(4)))).unwrap();
        assert_eq!(position.unit_cost(), dec!(3));
        assert_eq!(position.current_stock(), dec!(20));
    }

    #[test]
    fn entry_without_cost_leaves_unit_cost_untouched() {
        let mut position = StockPosition::empty(ItemId::new());
        execute(&mut position, &entry_with_cost(dec!(10), Some(dec!(2)))).unwrap();
        execute(&mut position, &entry(dec!(5))).unwrap();
        assert_eq!(position.unit_cost(), dec!(2));
    }

    #[test]
    fn unauthorized_gated_exit_is_rejected() {
        let mut position = StockPosition::empty(ItemId::new());
        execute(&mut position, &entry(dec!(10))).unwrap();

        let cmd = StockCommand::RecordExit(RecordExit {
            movement_id: MovementId::new(),
            quantity: dec!(1),
            lot: None,
            adjustment_type: AdjustmentTypeId::new(),
            affects_cost: true,
            requires_authorization: true,
            actor_authorized: false,
            description: String::new(),
            actor: ActorId::new(),
            occurred_at: Utc::now(),
        });
        assert_eq!(position.handle(&cmd).unwrap_err(), InventoryError::Unauthorized);
        assert_eq!(position.current_stock(), dec!(10));
    }

    #[test]
    fn lot_lifecycle_open_restock_deplete() {
        let mut position = StockPosition::empty(ItemId::new());
        let lot_id = LotId::new();

        let open = StockCommand::RecordEntry(RecordEntry {
            movement_id: MovementId::new(),
            quantity: dec!(5),
            unit_cost: None,
            lot: EntryLot::Open {
                lot_id,
                code: "L-001".to_string(),
                expiration_date: None,
            },
            provider: None,
            description: String::new(),
            actor: ActorId::new(),
            occurred_at: Utc::now(),
        });
        let events = execute(&mut position, &open).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(position.lot(lot_id).unwrap().current_quantity, dec!(5));
        assert_eq!(position.lot(lot_id).unwrap().initial_quantity, dec!(5));

        // Restock grows both quantities, preserving current <= initial.
        let restock = StockCommand::RecordEntry(RecordEntry {
            movement_id: MovementId::new(),
            quantity: dec!(3),
            unit_cost: None,
            lot: EntryLot::Into(lot_id),
            provider: None,
            description: String::new(),
            actor: ActorId::new(),
            occurred_at: Utc::now(),
        });
        execute(&mut position, &restock).unwrap();
        assert_eq!(position.lot(lot_id).unwrap().initial_quantity, dec!(8));
        assert_eq!(position.lot(lot_id).unwrap().current_quantity, dec!(8));

        let deplete = StockCommand::RecordExit(RecordExit {
            movement_id: MovementId::new(),
            quantity: dec!(8),
            lot: Some(lot_id),
            adjustment_type: AdjustmentTypeId::new(),
            affects_cost: false,
            requires_authorization: false,
            actor_authorized: false,
            description: String::new(),
            actor: ActorId::new(),
            occurred_at: Utc::now(),
        });
        execute(&mut position, &deplete).unwrap();
        assert_eq!(position.lot(lot_id).unwrap().current_quantity, Decimal::ZERO);
        assert!(!position.has_open_lots());

        // Depleted lot rejects a further exit.
        let over = StockCommand::RecordExit(RecordExit {
            movement_id: MovementId::new(),
            quantity: dec!(1),
            lot: Some(lot_id),
            adjustment_type: AdjustmentTypeId::new(),
            affects_cost: false,
            requires_authorization: false,
            actor_authorized: false,
            description: String::new(),
            actor: ActorId::new(),
            occurred_at: Utc::now(),
        });
        // Stock is zero here, so the stock guard fires before the lot guard.
        assert!(matches!(
            position.handle(&over).unwrap_err(),
            InventoryError::InsufficientStock { .. }
        ));
    }

    #[test]
    fn lot_guard_fires_when_stock_suffices_but_lot_does_not() {
        let mut position = StockPosition::empty(ItemId::new());
        let lot_id = LotId::new();

        execute(&mut position, &entry(dec!(10))).unwrap();
        let open = StockCommand::RecordEntry(RecordEntry {
            movement_id: MovementId::new(),
            quantity: dec!(5),
            unit_cost: None,
            lot: EntryLot::Open {
                lot_id,
                code: "L-001".to_string(),
                expiration_date: None,
            },
            provider: None,
            description: String::new(),
            actor: ActorId::new(),
            occurred_at: Utc::now(),
        });
        execute(&mut position, &open).unwrap();

        let over = StockCommand::RecordExit(RecordExit {
            movement_id: MovementId::new(),
            quantity: dec!(6),
            lot: Some(lot_id),
            adjustment_type: AdjustmentTypeId::new(),
            affects_cost: false,
            requires_authorization: false,
            actor_authorized: false,
            description: String::new(),
            actor: ActorId::new(),
            occurred_at: Utc::now(),
        });
        assert_eq!(
            position.handle(&over).unwrap_err(),
            InventoryError::InsufficientLotQuantity {
                available: dec!(5),
                requested: dec!(6),
            }
        );
    }

    #[test]
    fn duplicate_lot_code_is_rejected() {
        let mut position = StockPosition::empty(ItemId::new());
        let open = |code: &str| {
            StockCommand::RecordEntry(RecordEntry {
                movement_id: MovementId::new(),
                quantity: dec!(1),
                unit_cost: None,
                lot: EntryLot::Open {
                    lot_id: LotId::new(),
                    code: code.to_string(),
                    expiration_date: None,
                },
                provider: None,
                description: String::new(),
                actor: ActorId::new(),
                occurred_at: Utc::now(),
            })
        };

        execute(&mut position, &open("L-001")).unwrap();
        assert!(matches!(
            position.handle(&open("L-001")).unwrap_err(),
            InventoryError::DuplicateCode(_)
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: after any sequence of accepted entries/exits, the stock
        /// equals the fold sum(entries) - sum(exits) over emitted events,
        /// and never goes negative.
        #[test]
        fn balance_equals_fold_over_history(
            ops in prop::collection::vec((any::<bool>(), 1i64..1_000i64), 1..40)
        ) {
            let mut position = StockPosition::empty(ItemId::new());
            let mut history: Vec<StockEvent> = Vec::new();

            for (is_entry, amount) in ops {
                let quantity = Decimal::from(amount);
                let cmd = if is_entry { entry(quantity) } else { exit(quantity) };
                if let Ok(events) = execute(&mut position, &cmd) {
                    history.extend(events);
                }
            }

            let mut folded = Decimal::ZERO;
            for ev in &history {
                match ev {
                    StockEvent::EntryRecorded(e) => folded += e.quantity,
                    StockEvent::ExitRecorded(e) => folded -= e.quantity,
                    StockEvent::LotOpened(_) => {}
                }
            }

            prop_assert_eq!(position.current_stock(), folded);
            prop_assert!(position.current_stock() >= Decimal::ZERO);
        }

        /// Property: lot quantities stay within [0, initial] under random
        /// lot-targeted traffic.
        #[test]
        fn lot_bounds_hold(
            ops in prop::collection::vec((any::<bool>(), 1i64..100i64), 1..40)
        ) {
            let mut position = StockPosition::empty(ItemId::new());
            let lot_id = LotId::new();

            let open = StockCommand::RecordEntry(RecordEntry {
                movement_id: MovementId::new(),
                quantity: dec!(50),
                unit_cost: None,
                lot: EntryLot::Open {
                    lot_id,
                    code: "L-P".to_string(),
                    expiration_date: None,
                },
                provider: None,
                description: String::new(),
                actor: ActorId::new(),
                occurred_at: Utc::now(),
            });
            execute(&mut position, &open).unwrap();

            for (is_entry, amount) in ops {
                let quantity = Decimal::from(amount);
                let cmd = if is_entry {
                    StockCommand::RecordEntry(RecordEntry {
                        movement_id: MovementId::new(),
                        quantity,
                        unit_cost: None,
                        lot: EntryLot::Into(lot_id),
                        provider: None,
                        description: String::new(),
                        actor: ActorId::new(),
                        occurred_at: Utc::now(),
                    })
                } else {
                    StockCommand::RecordExit(RecordExit {
                        movement_id: MovementId::new(),
                        quantity,
                        lot: Some(lot_id),
                        adjustment_type: AdjustmentTypeId::new(),
                        affects_cost: false,
                        requires_authorization: false,
                        actor_authorized: false,
                        description: String::new(),
                        actor: ActorId::new(),
                        occurred_at: Utc::now(),
                    })
                };
                let _ = execute(&mut position, &cmd);

                let lot = position.lot(lot_id).unwrap();
                prop_assert!(lot.current_quantity >= Decimal::ZERO);
                prop_assert!(lot.current_quantity <= lot.initial_quantity);
            }
        }
    }
}
