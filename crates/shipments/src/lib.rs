//! Shipments domain module.
//!
//! Value objects (tracking number, weight, volume) and the `Shipment`
//! aggregate with its append-only status history. Deterministic domain logic
//! only: no IO, no HTTP, no storage.

pub mod history;
pub mod measures;
pub mod shipment;
pub mod status;
pub mod tracking;

pub use history::StatusHistoryEntry;
pub use measures::{Volume, Weight};
pub use shipment::{NewShipment, Shipment, ShipmentChanges, ShipmentSnapshot};
pub use status::ShipmentStatus;
pub use tracking::TrackingNumber;
