//! Application façade over the inventory domain.
//!
//! Owns the registries, the movement store, the keyed lock table and the
//! alert engine, and runs every stock mutation as a per-item serialized
//! transaction: acquire lock, rehydrate, decide, append, project, evaluate
//! alerts. Rejections are synchronous and leave no partial state.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use almacen_alerts::{Alert, AlertCounts, AlertEngine, AlertFilter};
use almacen_auth::Actor;
use almacen_catalog::{AdjustmentType, AdjustmentTypeRegistry, Item, ItemCatalog};
use almacen_core::{
    Aggregate, AggregateRoot, AdjustmentTypeId, AlertId, ExpectedVersion, InventoryError,
    InventoryResult, ItemId, LotId, MovementId, ProviderId, UnitId,
};
use almacen_ledger::{
    EntryLot, LotState, Movement, MovementFilter, RecordEntry, RecordExit, StockCommand,
    StockEvent,
};
use almacen_units::{ConversionEdge, ConversionTable, MeasurementUnit, UnitCategory, UnitRegistry};

use crate::config::ServiceConfig;
use crate::locks::LockTable;
use crate::store::MovementStore;

/// Lot targeting of an entry, as submitted by callers.
///
/// The service mints the `LotId` for newly opened lots; callers only ever
/// name lots by code (new) or id (existing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LotSpec {
    None,
    Open {
        code: String,
        expiration_date: Option<chrono::NaiveDate>,
    },
    Existing(LotId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRequest {
    pub item: ItemId,
    pub quantity: Decimal,
    /// Declared cost per unit of record; triggers the weighted-average
    /// recomputation when present.
    pub unit_cost: Option<Decimal>,
    pub lot: LotSpec,
    pub provider: Option<ProviderId>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitRequest {
    pub item: ItemId,
    pub quantity: Decimal,
    pub lot: Option<LotId>,
    pub adjustment_type: AdjustmentTypeId,
    pub description: String,
}

pub struct InventoryService {
    config: ServiceConfig,
    units: UnitRegistry,
    conversions: ConversionTable,
    items: ItemCatalog,
    adjustments: AdjustmentTypeRegistry,
    store: MovementStore,
    locks: LockTable,
    alerts: AlertEngine,
}

impl InventoryService {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            units: UnitRegistry::new(),
            conversions: ConversionTable::new(),
            items: ItemCatalog::new(),
            adjustments: AdjustmentTypeRegistry::new(),
            store: MovementStore::new(),
            locks: LockTable::new(config.lock_timeout()),
            alerts: AlertEngine::new(config.expiration_horizon_days),
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    // ---- units -------------------------------------------------------

    pub fn create_unit(
        &self,
        name: impl Into<String>,
        abbreviation: impl Into<String>,
        category: UnitCategory,
    ) -> InventoryResult<MeasurementUnit> {
        self.units.create(name, abbreviation, category)
    }

    /// Rename a unit. Units referenced by a conversion edge or an item are
    /// immutable.
    pub fn update_unit(
        &self,
        id: UnitId,
        name: impl Into<String>,
        abbreviation: impl Into<String>,
    ) -> InventoryResult<MeasurementUnit> {
        self.ensure_unit_unreferenced(id)?;
        self.units.update(id, name, abbreviation)
    }

    pub fn deactivate_unit(&self, id: UnitId) -> InventoryResult<()> {
        self.units.deactivate(id)
    }

    pub fn delete_unit(&self, id: UnitId) -> InventoryResult<()> {
        self.units.require(id)?;
        self.ensure_unit_unreferenced(id)?;
        self.units.remove(id)
    }

    pub fn get_unit(&self, id: UnitId) -> InventoryResult<MeasurementUnit> {
        self.units.require(id)
    }

    pub fn list_units(&self) -> InventoryResult<Vec<MeasurementUnit>> {
        self.units.list()
    }

    fn ensure_unit_unreferenced(&self, id: UnitId) -> InventoryResult<()> {
        if self.conversions.references_unit(id)? {
            return Err(InventoryError::conflict("unit is referenced by a conversion edge"));
        }
        if self.items.list()?.iter().any(|item| item.unit == id) {
            return Err(InventoryError::conflict("unit is referenced by an item"));
        }
        Ok(())
    }

    // ---- conversions -------------------------------------------------

    pub fn define_conversion(
        &self,
        origin: UnitId,
        destination: UnitId,
        factor: Decimal,
    ) -> InventoryResult<()> {
        let origin = self.units.require(origin)?;
        let destination = self.units.require(destination)?;
        self.conversions.define(&origin, &destination, factor)
    }

    pub fn remove_conversion(&self, origin: UnitId, destination: UnitId) -> InventoryResult<()> {
        self.conversions.remove(origin, destination)
    }

    pub fn convert(
        &self,
        quantity: Decimal,
        origin: UnitId,
        destination: UnitId,
    ) -> InventoryResult<Decimal> {
        self.conversions.convert(quantity, origin, destination)
    }

    pub fn list_conversions(&self) -> InventoryResult<Vec<ConversionEdge>> {
        self.conversions.list()
    }

    // ---- items -------------------------------------------------------

    pub fn create_item(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        unit: UnitId,
        minimum_stock: Decimal,
        unit_cost: Decimal,
    ) -> InventoryResult<Item> {
        let unit = self.units.require(unit)?;
        if !unit.active {
            return Err(InventoryError::validation("unit is inactive"));
        }
        self.items.create(name, description, unit.id, minimum_stock, unit_cost)
    }

    pub fn update_item(
        &self,
        id: ItemId,
        name: impl Into<String>,
        description: impl Into<String>,
        minimum_stock: Decimal,
    ) -> InventoryResult<Item> {
        let item = self.items.update(id, name, description, minimum_stock)?;
        // The threshold may have moved past the current stock.
        self.alerts.evaluate_item(&item, Utc::now())?;
        Ok(item)
    }

    pub fn deactivate_item(&self, id: ItemId) -> InventoryResult<()> {
        self.items.deactivate(id)
    }

    /// Hard-delete an item. Refused while its history or lots still matter:
    /// open lots first (the more actionable guard), then any movement at all.
    pub fn delete_item(&self, id: ItemId) -> InventoryResult<()> {
        self.items.require(id)?;
        let _lock = self.locks.acquire(id)?;
        if self.store.rehydrate(id)?.has_open_lots() {
            return Err(InventoryError::HasOpenLots);
        }
        if self.store.has_movements(id)? {
            return Err(InventoryError::HasMovements);
        }
        self.items.remove(id)
    }

    pub fn get_item(&self, id: ItemId) -> InventoryResult<Item> {
        self.items.require(id)
    }

    pub fn list_items(&self) -> InventoryResult<Vec<Item>> {
        self.items.list()
    }

    // ---- adjustment types --------------------------------------------

    pub fn create_adjustment_type(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        affects_cost: bool,
        requires_authorization: bool,
    ) -> InventoryResult<AdjustmentType> {
        self.adjustments
            .create(name, description, affects_cost, requires_authorization)
    }

    pub fn update_adjustment_type(
        &self,
        id: AdjustmentTypeId,
        name: impl Into<String>,
        description: impl Into<String>,
        affects_cost: bool,
        requires_authorization: bool,
    ) -> InventoryResult<AdjustmentType> {
        self.adjustments
            .update(id, name, description, affects_cost, requires_authorization)
    }

    pub fn deactivate_adjustment_type(&self, id: AdjustmentTypeId) -> InventoryResult<()> {
        self.adjustments.deactivate(id)
    }

    /// Hard-delete an adjustment type; refused while any movement references
    /// it.
    pub fn delete_adjustment_type(&self, id: AdjustmentTypeId) -> InventoryResult<()> {
        self.adjustments.require(id)?;
        if self.store.adjustment_type_referenced(id)? {
            return Err(InventoryError::HasMovements);
        }
        self.adjustments.remove(id)
    }

    pub fn list_adjustment_types(&self) -> InventoryResult<Vec<AdjustmentType>> {
        self.adjustments.list()
    }

    // ---- ledger ------------------------------------------------------

    /// Record an entry (entrada) as one per-item serialized transaction.
    pub fn record_entry(&self, request: EntryRequest, actor: &Actor) -> InventoryResult<Movement> {
        let _lock = self.locks.acquire(request.item)?;
        let item = self.items.require(request.item)?;
        if !item.active {
            return Err(InventoryError::validation("item is inactive"));
        }

        let now = Utc::now();
        let lot = match request.lot {
            LotSpec::None => EntryLot::None,
            LotSpec::Open {
                code,
                expiration_date,
            } => EntryLot::Open {
                lot_id: LotId::new(),
                code,
                expiration_date,
            },
            LotSpec::Existing(lot_id) => EntryLot::Into(lot_id),
        };
        let command = StockCommand::RecordEntry(RecordEntry {
            movement_id: MovementId::new(),
            quantity: request.quantity,
            unit_cost: request.unit_cost,
            lot,
            provider: request.provider,
            description: request.description,
            actor: actor.actor_id,
            occurred_at: now,
        });

        let movement = self.commit(request.item, &command)?;
        info!(
            item = %request.item,
            movement = %movement.id,
            quantity = %movement.quantity,
            "entry recorded"
        );
        Ok(movement)
    }

    /// Record an exit (salida) as one per-item serialized transaction.
    ///
    /// The adjustment type's flags are snapshotted into the command and the
    /// actor's capability is resolved here; the aggregate itself stays pure.
    pub fn record_exit(&self, request: ExitRequest, actor: &Actor) -> InventoryResult<Movement> {
        let _lock = self.locks.acquire(request.item)?;
        let item = self.items.require(request.item)?;
        if !item.active {
            return Err(InventoryError::validation("item is inactive"));
        }
        let adjustment = self.adjustments.require(request.adjustment_type)?;
        if !adjustment.active {
            return Err(InventoryError::validation("adjustment type is inactive"));
        }

        let now = Utc::now();
        let command = StockCommand::RecordExit(RecordExit {
            movement_id: MovementId::new(),
            quantity: request.quantity,
            lot: request.lot,
            adjustment_type: adjustment.id,
            affects_cost: adjustment.affects_cost,
            requires_authorization: adjustment.requires_authorization,
            actor_authorized: actor.can_authorize_adjustments(),
            description: request.description,
            actor: actor.actor_id,
            occurred_at: now,
        });

        let movement = self.commit(request.item, &command)?;
        if adjustment.requires_authorization {
            let updated = self.items.require(request.item)?;
            self.alerts
                .note_authorized_adjustment(&updated, &adjustment.name, now)?;
        }
        info!(
            item = %request.item,
            movement = %movement.id,
            quantity = %movement.quantity,
            adjustment = %adjustment.name,
            "exit recorded"
        );
        Ok(movement)
    }

    /// Decide, append, project and evaluate alerts for one command.
    ///
    /// Caller holds the item lock. All-or-nothing: a rejection from the
    /// aggregate or the store leaves every structure untouched.
    fn commit(&self, item_id: ItemId, command: &StockCommand) -> InventoryResult<Movement> {
        let mut position = self.store.rehydrate(item_id)?;
        let events = match position.handle(command) {
            Ok(events) => events,
            Err(err) => {
                warn!(item = %item_id, error = %err, "movement rejected");
                return Err(err);
            }
        };

        // The rehydrated version is the stream length at decision time.
        let expected = ExpectedVersion::Exact(position.version());
        let stored = self.store.append(item_id, expected, events)?;
        for s in &stored {
            position.apply(&s.event);
        }

        let updated = self
            .items
            .record_position(item_id, position.current_stock(), position.unit_cost())?;

        let now = Utc::now();
        self.alerts.evaluate_item(&updated, now)?;
        if let Some(lot_id) = touched_lot(&stored) {
            if let Some(lot) = position.lot(lot_id) {
                self.alerts.evaluate_lot(lot, now)?;
            }
        }

        stored
            .iter()
            .find_map(|s| s.event.to_movement(s.sequence_number))
            .ok_or_else(|| InventoryError::internal("committed transaction produced no movement"))
    }

    pub fn query_movements(&self, filter: &MovementFilter) -> InventoryResult<Vec<Movement>> {
        self.store.query(filter)
    }

    /// Lot read model for one item, sorted by code.
    pub fn list_lots(&self, item: ItemId) -> InventoryResult<Vec<LotState>> {
        self.items.require(item)?;
        let position = self.store.rehydrate(item)?;
        let mut lots: Vec<_> = position.lots().cloned().collect();
        lots.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(lots)
    }

    // ---- alerts ------------------------------------------------------

    pub fn list_alerts(&self, filter: AlertFilter) -> InventoryResult<Vec<Alert>> {
        self.alerts.list(filter)
    }

    pub fn mark_alert_read(&self, id: AlertId) -> InventoryResult<Alert> {
        self.alerts.mark_read(id, Utc::now())
    }

    pub fn mark_all_alerts_read(&self, filter: AlertFilter) -> InventoryResult<usize> {
        self.alerts.mark_all_read(filter, Utc::now())
    }

    pub fn alert_summary(&self) -> InventoryResult<Vec<AlertCounts>> {
        self.alerts.summary()
    }

    /// Full re-evaluation of every item and lot.
    ///
    /// Safe to run at any time: evaluation is derived and the alert store is
    /// an idempotent upsert, so overlapping with the event-triggered path
    /// changes nothing.
    pub fn sweep(&self) -> InventoryResult<()> {
        let now = Utc::now();
        for item in self.items.list()? {
            self.alerts.evaluate_item(&item, now)?;
            let position = self.store.rehydrate(item.id)?;
            for lot in position.lots() {
                self.alerts.evaluate_lot(lot, now)?;
            }
        }
        Ok(())
    }
}

/// The lot touched by a committed transaction, if any.
fn touched_lot(stored: &[crate::store::StoredStockEvent]) -> Option<LotId> {
    stored.iter().rev().find_map(|s| match &s.event {
        StockEvent::EntryRecorded(e) => e.lot,
        StockEvent::ExitRecorded(e) => e.lot,
        StockEvent::LotOpened(_) => None,
    })
}
