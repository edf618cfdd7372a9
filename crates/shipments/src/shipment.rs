use chrono::{DateTime, Utc};

use shiptrack_core::{
    AggregateRoot, AuditTrail, CustomerId, DomainError, DomainResult, ShipmentId, StatusEntryId,
    UserId,
};
use shiptrack_ports::PortCode;

use crate::{ShipmentStatus, StatusHistoryEntry, TrackingNumber, Volume, Weight};

/// Longest accepted free-text status description.
pub const MAX_DESCRIPTION_LEN: usize = 500;
/// Longest accepted customer reference.
pub const MAX_REFERENCE_LEN: usize = 100;

const RECEIVED_DESCRIPTION: &str = "Shipment received";

/// Input for [`Shipment::receive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShipment {
    pub id: ShipmentId,
    pub tracking_number: TrackingNumber,
    pub origin: PortCode,
    pub destination: PortCode,
    pub weight: Weight,
    pub volume: Volume,
    pub customer_reference: Option<String>,
    pub customer_id: Option<CustomerId>,
    pub cargo_description: Option<String>,
}

/// Field updates for [`Shipment::update`]; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShipmentChanges {
    pub origin: Option<PortCode>,
    pub destination: Option<PortCode>,
    pub weight: Option<Weight>,
    pub volume: Option<Volume>,
    pub customer_reference: Option<String>,
    pub cargo_description: Option<String>,
}

impl ShipmentChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Persisted state of a shipment, used to rebuild the aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentSnapshot {
    pub id: ShipmentId,
    pub tracking_number: TrackingNumber,
    pub origin: PortCode,
    pub destination: PortCode,
    pub weight: Weight,
    pub volume: Volume,
    pub customer_reference: Option<String>,
    pub customer_id: Option<CustomerId>,
    pub cargo_description: Option<String>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub history: Vec<StatusHistoryEntry>,
    pub version: u64,
    pub audit: AuditTrail,
}

/// Aggregate root: Shipment.
///
/// # Invariants
/// - The tracking number is assigned once and never changes.
/// - Origin and destination differ.
/// - The status history is append-only; the current status is derived from
///   it (latest event time) and never stored separately.
/// - A soft-deleted shipment accepts no further changes; its history stays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shipment {
    id: ShipmentId,
    tracking_number: TrackingNumber,
    origin: PortCode,
    destination: PortCode,
    weight: Weight,
    volume: Volume,
    customer_reference: Option<String>,
    customer_id: Option<CustomerId>,
    cargo_description: Option<String>,
    is_deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
    /// Insertion order.
    history: Vec<StatusHistoryEntry>,
    version: u64,
    audit: AuditTrail,
}

impl Shipment {
    /// Intake: create a shipment with its initial `Received` entry.
    pub fn receive(new: NewShipment, at: DateTime<Utc>, by: Option<UserId>) -> DomainResult<Self> {
        ensure_distinct_route(&new.origin, &new.destination)?;

        let received = StatusHistoryEntry {
            id: StatusEntryId::new(),
            status: ShipmentStatus::Received,
            description: Some(RECEIVED_DESCRIPTION.to_string()),
            location: Some(new.origin.to_string()),
            event_time: at,
            sequence: 1,
            recorded_at: at,
            recorded_by: by,
        };

        Ok(Self {
            id: new.id,
            tracking_number: new.tracking_number,
            origin: new.origin,
            destination: new.destination,
            weight: new.weight,
            volume: new.volume,
            customer_reference: normalize_text(new.customer_reference, MAX_REFERENCE_LEN)?,
            customer_id: new.customer_id,
            cargo_description: normalize_text(new.cargo_description, MAX_DESCRIPTION_LEN)?,
            is_deleted: false,
            deleted_at: None,
            history: vec![received],
            version: 1,
            audit: AuditTrail::created(at, by),
        })
    }

    /// Rebuild a shipment from persisted state.
    pub fn restore(snapshot: ShipmentSnapshot) -> Self {
        let ShipmentSnapshot {
            id,
            tracking_number,
            origin,
            destination,
            weight,
            volume,
            customer_reference,
            customer_id,
            cargo_description,
            is_deleted,
            deleted_at,
            mut history,
            version,
            audit,
        } = snapshot;

        history.sort_by_key(|e| e.sequence);

        Self {
            id,
            tracking_number,
            origin,
            destination,
            weight,
            volume,
            customer_reference,
            customer_id,
            cargo_description,
            is_deleted,
            deleted_at,
            history,
            version,
            audit,
        }
    }

    pub fn id_typed(&self) -> ShipmentId {
        self.id
    }

    pub fn tracking_number(&self) -> &TrackingNumber {
        &self.tracking_number
    }

    pub fn origin(&self) -> &PortCode {
        &self.origin
    }

    pub fn destination(&self) -> &PortCode {
        &self.destination
    }

    pub fn weight(&self) -> Weight {
        self.weight
    }

    pub fn volume(&self) -> Volume {
        self.volume
    }

    pub fn customer_reference(&self) -> Option<&str> {
        self.customer_reference.as_deref()
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn cargo_description(&self) -> Option<&str> {
        self.cargo_description.as_deref()
    }

    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    /// Whether the route starts or ends at `code` (case-insensitive).
    pub fn touches_port(&self, code: &PortCode) -> bool {
        self.origin == *code || self.destination == *code
    }

    /// History entries in insertion order (persistence view).
    pub fn entries(&self) -> &[StatusHistoryEntry] {
        &self.history
    }

    /// History sorted by event time ascending; equal times keep insertion order.
    pub fn history(&self) -> Vec<&StatusHistoryEntry> {
        let mut sorted: Vec<&StatusHistoryEntry> = self.history.iter().collect();
        sorted.sort_by_key(|e| e.sort_key());
        sorted
    }

    /// Entry with the latest event time; the last inserted wins ties.
    pub fn current_entry(&self) -> Option<&StatusHistoryEntry> {
        self.history.iter().max_by_key(|e| e.sort_key())
    }

    pub fn current_status(&self) -> Option<ShipmentStatus> {
        self.current_entry().map(|e| e.status)
    }

    /// Append a lifecycle event.
    ///
    /// Out-of-order event times and repeated statuses are accepted; readers
    /// sort by event time.
    pub fn append_status(
        &mut self,
        status: ShipmentStatus,
        description: Option<String>,
        location: Option<String>,
        event_time: DateTime<Utc>,
        at: DateTime<Utc>,
        by: Option<UserId>,
    ) -> DomainResult<StatusHistoryEntry> {
        self.ensure_not_deleted()?;

        let description = normalize_text(description, MAX_DESCRIPTION_LEN)?;
        let location = normalize_text(location, MAX_REFERENCE_LEN)?;
        let sequence = self.history.iter().map(|e| e.sequence).max().unwrap_or(0) + 1;

        let entry = StatusHistoryEntry {
            id: StatusEntryId::new(),
            status,
            description,
            location,
            event_time,
            sequence,
            recorded_at: at,
            recorded_by: by,
        };
        self.history.push(entry.clone());
        self.audit.touch(at, by);
        self.version += 1;

        Ok(entry)
    }

    /// Update route, cargo metrics, and reference fields.
    pub fn update(
        &mut self,
        changes: ShipmentChanges,
        at: DateTime<Utc>,
        by: Option<UserId>,
    ) -> DomainResult<()> {
        self.ensure_not_deleted()?;

        let origin = changes.origin.unwrap_or_else(|| self.origin.clone());
        let destination = changes.destination.unwrap_or_else(|| self.destination.clone());
        ensure_distinct_route(&origin, &destination)?;

        let customer_reference = match changes.customer_reference {
            Some(r) => normalize_text(Some(r), MAX_REFERENCE_LEN)?,
            None => self.customer_reference.clone(),
        };
        let cargo_description = match changes.cargo_description {
            Some(d) => normalize_text(Some(d), MAX_DESCRIPTION_LEN)?,
            None => self.cargo_description.clone(),
        };

        self.origin = origin;
        self.destination = destination;
        self.weight = changes.weight.unwrap_or(self.weight);
        self.volume = changes.volume.unwrap_or(self.volume);
        self.customer_reference = customer_reference;
        self.cargo_description = cargo_description;
        self.audit.touch(at, by);
        self.version += 1;
        Ok(())
    }

    /// Hide the shipment from active queries. History is kept.
    pub fn soft_delete(&mut self, at: DateTime<Utc>, by: Option<UserId>) -> DomainResult<()> {
        self.ensure_not_deleted()?;
        self.is_deleted = true;
        self.deleted_at = Some(at);
        self.audit.touch(at, by);
        self.version += 1;
        Ok(())
    }

    fn ensure_not_deleted(&self) -> DomainResult<()> {
        if self.is_deleted {
            return Err(DomainError::invariant("shipment is deleted"));
        }
        Ok(())
    }
}

impl AggregateRoot for Shipment {
    type Id = ShipmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

fn ensure_distinct_route(origin: &PortCode, destination: &PortCode) -> DomainResult<()> {
    if origin == destination {
        return Err(DomainError::validation(
            "origin and destination ports must differ",
        ));
    }
    Ok(())
}

/// Trim optional free text; blank becomes `None`.
fn normalize_text(value: Option<String>, max_len: usize) -> DomainResult<Option<String>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > max_len {
        return Err(DomainError::validation(format!(
            "text cannot exceed {max_len} characters"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, hour, 0, 0).unwrap()
    }

    fn test_shipment() -> Shipment {
        Shipment::receive(
            NewShipment {
                id: ShipmentId::new(),
                tracking_number: TrackingNumber::parse("VTX-202501-0001").unwrap(),
                origin: PortCode::parse("SGSIN").unwrap(),
                destination: PortCode::parse("NLRTM").unwrap(),
                weight: Weight::from_decimal("1200.5".parse().unwrap()).unwrap(),
                volume: Volume::from_decimal("14".parse().unwrap()).unwrap(),
                customer_reference: Some("  PO-77 ".to_string()),
                customer_id: None,
                cargo_description: None,
            },
            t(0),
            None,
        )
        .unwrap()
    }

    fn statuses(shipment: &Shipment) -> Vec<ShipmentStatus> {
        shipment.history().into_iter().map(|e| e.status).collect()
    }

    #[test]
    fn receive_starts_with_received_entry_at_origin() {
        let shipment = test_shipment();
        assert_eq!(shipment.version(), 1);
        assert_eq!(shipment.current_status(), Some(ShipmentStatus::Received));
        let entry = shipment.current_entry().unwrap();
        assert_eq!(entry.location.as_deref(), Some("SGSIN"));
        assert_eq!(entry.sequence, 1);
        assert_eq!(shipment.customer_reference(), Some("PO-77"));
    }

    #[test]
    fn receive_rejects_identical_origin_and_destination() {
        let err = Shipment::receive(
            NewShipment {
                id: ShipmentId::new(),
                tracking_number: TrackingNumber::parse("VTX-202501-0002").unwrap(),
                origin: PortCode::parse("sgsin").unwrap(),
                destination: PortCode::parse("SGSIN").unwrap(),
                weight: Weight::from_decimal("1".parse().unwrap()).unwrap(),
                volume: Volume::from_decimal("1".parse().unwrap()).unwrap(),
                customer_reference: None,
                customer_id: None,
                cargo_description: None,
            },
            t(0),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn history_is_sorted_by_event_time_not_insertion_order() {
        let mut shipment = test_shipment();
        shipment
            .append_status(ShipmentStatus::OnVessel, None, None, t(9), t(10), None)
            .unwrap();
        shipment
            .append_status(ShipmentStatus::Packed, None, None, t(3), t(11), None)
            .unwrap();
        shipment
            .append_status(ShipmentStatus::AtOriginPort, None, None, t(6), t(12), None)
            .unwrap();

        assert_eq!(
            statuses(&shipment),
            vec![
                ShipmentStatus::Received,
                ShipmentStatus::Packed,
                ShipmentStatus::AtOriginPort,
                ShipmentStatus::OnVessel,
            ]
        );
        assert_eq!(shipment.current_status(), Some(ShipmentStatus::OnVessel));
        assert_eq!(shipment.version(), 4);
    }

    #[test]
    fn equal_event_times_resolve_to_last_inserted() {
        let mut shipment = test_shipment();
        shipment
            .append_status(ShipmentStatus::Packed, None, None, t(5), t(5), None)
            .unwrap();
        shipment
            .append_status(ShipmentStatus::Cancelled, None, None, t(5), t(6), None)
            .unwrap();

        assert_eq!(shipment.current_status(), Some(ShipmentStatus::Cancelled));
        let tail: Vec<_> = statuses(&shipment).into_iter().skip(1).collect();
        assert_eq!(tail, vec![ShipmentStatus::Packed, ShipmentStatus::Cancelled]);
    }

    #[test]
    fn repeated_statuses_and_past_times_are_accepted() {
        let mut shipment = test_shipment();
        shipment
            .append_status(
                ShipmentStatus::Received,
                Some("re-scanned".to_string()),
                None,
                t(0) - Duration::days(1),
                t(1),
                None,
            )
            .unwrap();
        assert_eq!(shipment.entries().len(), 2);
        assert_eq!(shipment.history()[0].description.as_deref(), Some("re-scanned"));
    }

    #[test]
    fn append_rejects_oversized_description() {
        let mut shipment = test_shipment();
        let err = shipment
            .append_status(
                ShipmentStatus::Packed,
                Some("x".repeat(MAX_DESCRIPTION_LEN + 1)),
                None,
                t(1),
                t(1),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(shipment.version(), 1);
    }

    #[test]
    fn soft_delete_keeps_history_and_blocks_changes() {
        let mut shipment = test_shipment();
        shipment.soft_delete(t(2), None).unwrap();
        assert!(shipment.is_deleted());
        assert_eq!(shipment.deleted_at(), Some(t(2)));
        assert_eq!(shipment.entries().len(), 1);

        let err = shipment
            .append_status(ShipmentStatus::Packed, None, None, t(3), t(3), None)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert!(shipment.soft_delete(t(4), None).is_err());
    }

    #[test]
    fn update_applies_only_supplied_fields() {
        let mut shipment = test_shipment();
        let by = UserId::new();
        shipment
            .update(
                ShipmentChanges {
                    destination: Some(PortCode::parse("DEHAM").unwrap()),
                    weight: Some(Weight::from_decimal("10".parse().unwrap()).unwrap()),
                    customer_reference: Some("   ".to_string()),
                    ..ShipmentChanges::default()
                },
                t(1),
                Some(by),
            )
            .unwrap();

        assert_eq!(shipment.origin().as_str(), "SGSIN");
        assert_eq!(shipment.destination().as_str(), "DEHAM");
        assert_eq!(shipment.weight().value(), "10".parse::<rust_decimal::Decimal>().unwrap());
        assert_eq!(shipment.customer_reference(), None);
        assert_eq!(shipment.tracking_number().as_str(), "VTX-202501-0001");
        assert_eq!(shipment.audit().updated_by, Some(by));
        assert_eq!(shipment.version(), 2);
    }

    #[test]
    fn update_rejects_route_collapsing_to_one_port() {
        let mut shipment = test_shipment();
        let err = shipment
            .update(
                ShipmentChanges {
                    destination: Some(PortCode::parse("SGSIN").unwrap()),
                    ..ShipmentChanges::default()
                },
                t(1),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(shipment.destination().as_str(), "NLRTM");
    }

    #[test]
    fn restore_reorders_entries_by_sequence() {
        let mut shipment = test_shipment();
        shipment
            .append_status(ShipmentStatus::Packed, None, None, t(1), t(1), None)
            .unwrap();

        let mut history = shipment.entries().to_vec();
        history.reverse();
        let restored = Shipment::restore(ShipmentSnapshot {
            id: shipment.id_typed(),
            tracking_number: shipment.tracking_number().clone(),
            origin: shipment.origin().clone(),
            destination: shipment.destination().clone(),
            weight: shipment.weight(),
            volume: shipment.volume(),
            customer_reference: shipment.customer_reference().map(str::to_string),
            customer_id: shipment.customer_id(),
            cargo_description: None,
            is_deleted: false,
            deleted_at: None,
            history,
            version: shipment.version(),
            audit: shipment.audit().clone(),
        });

        assert_eq!(restored, shipment);
    }

    #[test]
    fn touches_port_checks_both_ends() {
        let shipment = test_shipment();
        assert!(shipment.touches_port(&PortCode::parse("nlrtm").unwrap()));
        assert!(shipment.touches_port(&PortCode::parse("SGSIN").unwrap()));
        assert!(!shipment.touches_port(&PortCode::parse("DEHAM").unwrap()));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn history_is_always_sorted_on_read(offsets in proptest::collection::vec(-500i64..500, 1..20)) {
                let mut shipment = test_shipment();
                for offset in &offsets {
                    shipment
                        .append_status(
                            ShipmentStatus::OnVessel,
                            None,
                            None,
                            t(12) + Duration::minutes(*offset),
                            t(12),
                            None,
                        )
                        .unwrap();
                }

                let history = shipment.history();
                prop_assert_eq!(history.len(), offsets.len() + 1);
                prop_assert!(history.windows(2).all(|w| w[0].sort_key() <= w[1].sort_key()));
                prop_assert_eq!(
                    shipment.current_entry().map(|e| e.sort_key()),
                    history.last().map(|e| e.sort_key())
                );
            }
        }
    }
}
