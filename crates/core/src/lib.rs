//! `shiptrack-core` — domain foundation building blocks.
//!
//! Pure domain primitives shared by the port registry and shipment crates
//! (no IO, no storage, no HTTP).

pub mod aggregate;
pub mod audit;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use audit::AuditTrail;
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CustomerId, PortId, ShipmentId, StatusEntryId, UserId};
pub use value_object::ValueObject;
