//! Read models returned by queries.
//!
//! Plain serializable snapshots; they carry no behavior and are rebuilt from
//! the aggregates on every read.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use shiptrack_core::{CustomerId, PortId, ShipmentId, UserId};
use shiptrack_ports::Port;
use shiptrack_shipments::{Shipment, ShipmentStatus, StatusHistoryEntry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortView {
    pub id: PortId,
    pub code: String,
    pub name: String,
    pub country: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Port> for PortView {
    fn from(port: &Port) -> Self {
        Self {
            id: port.id_typed(),
            code: port.code().to_string(),
            name: port.name().to_string(),
            country: port.country().to_string(),
            is_active: port.is_active(),
            created_at: port.audit().created_at,
            updated_at: port.audit().updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntryView {
    pub status: ShipmentStatus,
    pub description: Option<String>,
    pub location: Option<String>,
    pub event_time: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
    pub recorded_by: Option<UserId>,
}

impl From<&StatusHistoryEntry> for HistoryEntryView {
    fn from(entry: &StatusHistoryEntry) -> Self {
        Self {
            status: entry.status,
            description: entry.description.clone(),
            location: entry.location.clone(),
            event_time: entry.event_time,
            recorded_at: entry.recorded_at,
            recorded_by: entry.recorded_by,
        }
    }
}

/// Shipment summary used in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipmentView {
    pub id: ShipmentId,
    pub tracking_number: String,
    pub origin_port: String,
    pub destination_port: String,
    pub weight_kg: Decimal,
    pub volume_cbm: Decimal,
    pub customer_reference: Option<String>,
    pub customer_id: Option<CustomerId>,
    pub cargo_description: Option<String>,
    pub current_status: Option<ShipmentStatus>,
    pub current_status_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Shipment> for ShipmentView {
    fn from(shipment: &Shipment) -> Self {
        let current = shipment.current_entry();
        Self {
            id: shipment.id_typed(),
            tracking_number: shipment.tracking_number().to_string(),
            origin_port: shipment.origin().to_string(),
            destination_port: shipment.destination().to_string(),
            weight_kg: shipment.weight().value(),
            volume_cbm: shipment.volume().value(),
            customer_reference: shipment.customer_reference().map(str::to_string),
            customer_id: shipment.customer_id(),
            cargo_description: shipment.cargo_description().map(str::to_string),
            current_status: current.map(|e| e.status),
            current_status_at: current.map(|e| e.event_time),
            created_at: shipment.audit().created_at,
            updated_at: shipment.audit().updated_at,
        }
    }
}

/// Single-shipment read: summary plus ordered history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipmentDetails {
    #[serde(flatten)]
    pub shipment: ShipmentView,
    pub history: Vec<HistoryEntryView>,
}

impl From<&Shipment> for ShipmentDetails {
    fn from(shipment: &Shipment) -> Self {
        Self {
            shipment: ShipmentView::from(shipment),
            history: shipment.history().into_iter().map(HistoryEntryView::from).collect(),
        }
    }
}
