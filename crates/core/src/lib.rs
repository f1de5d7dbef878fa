//! `almacen-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod event;
pub mod id;
pub mod value_object;

pub use aggregate::{execute, Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{InventoryError, InventoryResult};
pub use event::Event;
pub use id::{
    ActorId, AdjustmentTypeId, AlertId, ItemId, LotId, MovementId, ProviderId, UnitId,
};
pub use value_object::ValueObject;
