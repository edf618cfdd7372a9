//! Shipment use cases: intake, updates, status history, queries.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use shiptrack_auth::{CallerIdentity, Permission, authorize};
use shiptrack_core::{AggregateRoot, CustomerId, ExpectedVersion, ShipmentId};
use shiptrack_ports::PortCode;
use shiptrack_shipments::shipment::{MAX_DESCRIPTION_LEN, MAX_REFERENCE_LEN};
use shiptrack_shipments::tracking::period_prefix;
use shiptrack_shipments::{
    NewShipment, Shipment, ShipmentChanges, ShipmentStatus, TrackingNumber, Volume, Weight,
};

use super::views::{HistoryEntryView, ShipmentDetails, ShipmentView};
use super::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Page, UseCaseError, Violations, paginate};
use crate::repository::{PortRepository, ShipmentRepository};

#[derive(Debug, Clone)]
pub struct CreateShipment {
    pub origin_port: String,
    pub destination_port: String,
    pub weight_kg: Decimal,
    pub volume_cbm: Decimal,
    pub customer_reference: Option<String>,
    pub customer_id: Option<CustomerId>,
    pub cargo_description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipmentCreated {
    pub id: ShipmentId,
    pub tracking_number: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateShipment {
    pub id: ShipmentId,
    pub origin_port: Option<String>,
    pub destination_port: Option<String>,
    pub weight_kg: Option<Decimal>,
    pub volume_cbm: Option<Decimal>,
    pub customer_reference: Option<String>,
    pub cargo_description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AppendShipmentStatus {
    pub id: ShipmentId,
    pub status: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub event_time_utc: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DeleteShipment {
    pub id: ShipmentId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ListShipments {
    pub status: Option<String>,
    pub customer_id: Option<CustomerId>,
    pub page: u32,
    pub page_size: u32,
}

impl Default for ListShipments {
    fn default() -> Self {
        Self {
            status: None,
            customer_id: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

pub struct ShipmentHandlers {
    shipments: Arc<dyn ShipmentRepository>,
    ports: Arc<dyn PortRepository>,
}

impl ShipmentHandlers {
    pub fn new(shipments: Arc<dyn ShipmentRepository>, ports: Arc<dyn PortRepository>) -> Self {
        Self { shipments, ports }
    }

    /// Intake: validate the route against the port registry, number the
    /// shipment, and record its `Received` entry.
    #[instrument(
        skip(self, caller, cmd),
        fields(origin = %cmd.origin_port, destination = %cmd.destination_port),
        err
    )]
    pub async fn create(
        &self,
        caller: &CallerIdentity,
        cmd: CreateShipment,
    ) -> Result<ShipmentCreated, UseCaseError> {
        authorize(caller, &Permission::SHIPMENTS_WRITE)?;

        let mut violations = Violations::new();
        let origin = self.active_port(&mut violations, "origin", &cmd.origin_port).await?;
        let destination = self
            .active_port(&mut violations, "destination", &cmd.destination_port)
            .await?;
        if let (Some(o), Some(d)) = (&origin, &destination) {
            violations.require(o != d, "origin and destination ports must differ");
        }
        let weight = violations.capture(Weight::from_decimal(cmd.weight_kg));
        let volume = violations.capture(Volume::from_decimal(cmd.volume_cbm));
        check_text(
            &mut violations,
            "customer reference",
            cmd.customer_reference.as_deref(),
            MAX_REFERENCE_LEN,
        );
        check_text(
            &mut violations,
            "cargo description",
            cmd.cargo_description.as_deref(),
            MAX_DESCRIPTION_LEN,
        );

        let (year, month) = (cmd.occurred_at.year(), cmd.occurred_at.month());
        let next = self
            .shipments
            .max_sequence_in_period(&period_prefix(year, month))
            .await?
            .saturating_add(1);
        let tracking_number = violations.capture(TrackingNumber::generate(year, month, next));

        violations.finish()?;
        let (Some(origin), Some(destination), Some(weight), Some(volume), Some(tracking_number)) =
            (origin, destination, weight, volume, tracking_number)
        else {
            return Err(UseCaseError::validation("shipment could not be created"));
        };

        let shipment = Shipment::receive(
            NewShipment {
                id: ShipmentId::new(),
                tracking_number,
                origin,
                destination,
                weight,
                volume,
                customer_reference: cmd.customer_reference,
                customer_id: cmd.customer_id,
                cargo_description: cmd.cargo_description,
            },
            cmd.occurred_at,
            Some(caller.user_id()),
        )?;
        self.shipments.save(&shipment, ExpectedVersion::New).await?;

        tracing::info!(
            shipment_id = %shipment.id_typed(),
            tracking_number = %shipment.tracking_number(),
            "shipment received"
        );
        Ok(ShipmentCreated {
            id: shipment.id_typed(),
            tracking_number: shipment.tracking_number().to_string(),
        })
    }

    #[instrument(skip(self, caller, cmd), fields(shipment_id = %cmd.id), err)]
    pub async fn update(
        &self,
        caller: &CallerIdentity,
        cmd: UpdateShipment,
    ) -> Result<ShipmentView, UseCaseError> {
        authorize(caller, &Permission::SHIPMENTS_WRITE)?;

        let mut violations = Violations::new();
        let origin = match &cmd.origin_port {
            Some(raw) => self.active_port(&mut violations, "origin", raw).await?,
            None => None,
        };
        let destination = match &cmd.destination_port {
            Some(raw) => self.active_port(&mut violations, "destination", raw).await?,
            None => None,
        };
        let weight = cmd.weight_kg.and_then(|w| violations.capture(Weight::from_decimal(w)));
        let volume = cmd.volume_cbm.and_then(|v| violations.capture(Volume::from_decimal(v)));
        check_text(
            &mut violations,
            "customer reference",
            cmd.customer_reference.as_deref(),
            MAX_REFERENCE_LEN,
        );
        check_text(
            &mut violations,
            "cargo description",
            cmd.cargo_description.as_deref(),
            MAX_DESCRIPTION_LEN,
        );
        violations.finish()?;

        let mut shipment = self.load_active(cmd.id).await?;
        let loaded = shipment.version();
        shipment.update(
            ShipmentChanges {
                origin,
                destination,
                weight,
                volume,
                customer_reference: cmd.customer_reference,
                cargo_description: cmd.cargo_description,
            },
            cmd.occurred_at,
            Some(caller.user_id()),
        )?;
        self.shipments.save(&shipment, ExpectedVersion::Exact(loaded)).await?;
        Ok(ShipmentView::from(&shipment))
    }

    /// Append one lifecycle event. Statuses are not checked against a
    /// transition table; any status may follow any other.
    #[instrument(skip(self, caller, cmd), fields(shipment_id = %cmd.id, status = %cmd.status), err)]
    pub async fn append_status(
        &self,
        caller: &CallerIdentity,
        cmd: AppendShipmentStatus,
    ) -> Result<HistoryEntryView, UseCaseError> {
        authorize(caller, &Permission::SHIPMENTS_WRITE)?;

        let mut violations = Violations::new();
        let status = violations.capture(ShipmentStatus::parse(&cmd.status));
        check_text(
            &mut violations,
            "description",
            cmd.description.as_deref(),
            MAX_DESCRIPTION_LEN,
        );
        violations.finish()?;
        let Some(status) = status else {
            return Err(UseCaseError::validation("status is required"));
        };

        let mut shipment = self.load_active(cmd.id).await?;
        let loaded = shipment.version();
        let entry = shipment.append_status(
            status,
            cmd.description,
            cmd.location,
            cmd.event_time_utc,
            cmd.occurred_at,
            Some(caller.user_id()),
        )?;
        self.shipments.save(&shipment, ExpectedVersion::Exact(loaded)).await?;

        tracing::info!(
            tracking_number = %shipment.tracking_number(),
            status = %entry.status,
            terminal = entry.status.is_terminal(),
            "shipment status appended"
        );
        Ok(HistoryEntryView::from(&entry))
    }

    #[instrument(skip(self, caller, cmd), fields(shipment_id = %cmd.id), err)]
    pub async fn delete(&self, caller: &CallerIdentity, cmd: DeleteShipment) -> Result<(), UseCaseError> {
        authorize(caller, &Permission::SHIPMENTS_WRITE)?;

        let mut shipment = self.load_active(cmd.id).await?;
        let loaded = shipment.version();
        shipment.soft_delete(cmd.occurred_at, Some(caller.user_id()))?;
        self.shipments.save(&shipment, ExpectedVersion::Exact(loaded)).await?;
        tracing::info!(tracking_number = %shipment.tracking_number(), "shipment deleted");
        Ok(())
    }

    pub async fn get_by_id(
        &self,
        caller: &CallerIdentity,
        id: ShipmentId,
    ) -> Result<ShipmentDetails, UseCaseError> {
        authorize(caller, &Permission::SHIPMENTS_READ)?;
        Ok(ShipmentDetails::from(&self.load_active(id).await?))
    }

    pub async fn get_by_tracking_number(
        &self,
        caller: &CallerIdentity,
        tracking_number: &str,
    ) -> Result<ShipmentDetails, UseCaseError> {
        authorize(caller, &Permission::SHIPMENTS_READ)?;

        let tracking_number = TrackingNumber::parse(tracking_number)?;
        match self.shipments.find_by_tracking_number(&tracking_number).await? {
            Some(s) if !s.is_deleted() => Ok(ShipmentDetails::from(&s)),
            _ => Err(UseCaseError::NotFound),
        }
    }

    /// History sorted by event time, ties in insertion order.
    pub async fn history(
        &self,
        caller: &CallerIdentity,
        id: ShipmentId,
    ) -> Result<Vec<HistoryEntryView>, UseCaseError> {
        authorize(caller, &Permission::SHIPMENTS_READ)?;
        let shipment = self.load_active(id).await?;
        Ok(shipment.history().into_iter().map(HistoryEntryView::from).collect())
    }

    pub async fn list(
        &self,
        caller: &CallerIdentity,
        query: ListShipments,
    ) -> Result<Page<ShipmentView>, UseCaseError> {
        authorize(caller, &Permission::SHIPMENTS_READ)?;

        let mut violations = Violations::new();
        violations.require(query.page >= 1, "page must be at least 1");
        violations.require(
            (1..=MAX_PAGE_SIZE).contains(&query.page_size),
            format!("page size must be between 1 and {MAX_PAGE_SIZE}"),
        );
        let status = match &query.status {
            Some(raw) => violations.capture(ShipmentStatus::parse(raw)),
            None => None,
        };
        violations.finish()?;

        let matching: Vec<ShipmentView> = self
            .shipments
            .list_active()
            .await?
            .iter()
            .filter(|s| status.is_none() || s.current_status() == status)
            .filter(|s| query.customer_id.is_none() || s.customer_id() == query.customer_id)
            .map(ShipmentView::from)
            .collect();
        Ok(paginate(matching, query.page, query.page_size))
    }

    async fn load_active(&self, id: ShipmentId) -> Result<Shipment, UseCaseError> {
        match self.shipments.find_by_id(id).await? {
            Some(s) if !s.is_deleted() => Ok(s),
            _ => Err(UseCaseError::NotFound),
        }
    }

    /// Resolve a port code that must name an active registry entry.
    async fn active_port(
        &self,
        violations: &mut Violations,
        role: &str,
        raw: &str,
    ) -> Result<Option<PortCode>, UseCaseError> {
        let Some(code) = violations.capture(PortCode::parse(raw)) else {
            return Ok(None);
        };
        match self.ports.find_by_code(&code).await? {
            Some(port) if port.is_active() => Ok(Some(code)),
            Some(_) => {
                violations.push(format!("{role} port '{code}' is inactive"));
                Ok(None)
            }
            None => {
                violations.push(format!("{role} port '{code}' does not exist"));
                Ok(None)
            }
        }
    }
}

fn check_text(violations: &mut Violations, field: &str, value: Option<&str>, max: usize) {
    if let Some(value) = value {
        violations.require(
            value.trim().chars().count() <= max,
            format!("{field} must be at most {max} characters"),
        );
    }
}
