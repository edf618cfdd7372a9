use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use shiptrack_core::{AggregateRoot, ExpectedVersion, PortId, ShipmentId};
use shiptrack_ports::{Port, PortCode};
use shiptrack_shipments::{Shipment, TrackingNumber};

use super::{PortRepository, RepositoryError, ShipmentRepository};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory port registry for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryPortRepository {
    inner: RwLock<HashMap<PortId, Port>>,
}

impl InMemoryPortRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PortRepository for InMemoryPortRepository {
    async fn find_by_id(&self, id: PortId) -> Result<Option<Port>, RepositoryError> {
        Ok(read(&self.inner).get(&id).cloned())
    }

    async fn find_by_code(&self, code: &PortCode) -> Result<Option<Port>, RepositoryError> {
        Ok(read(&self.inner).values().find(|p| p.code() == code).cloned())
    }

    async fn list(&self) -> Result<Vec<Port>, RepositoryError> {
        let mut ports: Vec<Port> = read(&self.inner).values().cloned().collect();
        ports.sort_by(|a, b| a.code().as_str().cmp(b.code().as_str()));
        Ok(ports)
    }

    async fn save(&self, port: &Port, expected: ExpectedVersion) -> Result<(), RepositoryError> {
        let mut map = write(&self.inner);
        let id = port.id_typed();

        expected.check(map.get(&id).map(|p| p.version()))?;
        if map.values().any(|p| p.code() == port.code() && p.id_typed() != id) {
            return Err(RepositoryError::Conflict(format!(
                "port code '{}' is already registered",
                port.code()
            )));
        }

        map.insert(id, port.clone());
        Ok(())
    }
}

/// In-memory shipment store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryShipmentRepository {
    inner: RwLock<HashMap<ShipmentId, Shipment>>,
}

impl InMemoryShipmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShipmentRepository for InMemoryShipmentRepository {
    async fn find_by_id(&self, id: ShipmentId) -> Result<Option<Shipment>, RepositoryError> {
        Ok(read(&self.inner).get(&id).cloned())
    }

    async fn find_by_tracking_number(
        &self,
        tracking_number: &TrackingNumber,
    ) -> Result<Option<Shipment>, RepositoryError> {
        Ok(read(&self.inner)
            .values()
            .find(|s| s.tracking_number() == tracking_number)
            .cloned())
    }

    async fn list_active(&self) -> Result<Vec<Shipment>, RepositoryError> {
        let mut shipments: Vec<Shipment> = read(&self.inner)
            .values()
            .filter(|s| !s.is_deleted())
            .cloned()
            .collect();
        shipments.sort_by(|a, b| {
            b.audit()
                .created_at
                .cmp(&a.audit().created_at)
                .then_with(|| b.id_typed().cmp(&a.id_typed()))
        });
        Ok(shipments)
    }

    async fn max_sequence_in_period(&self, period_prefix: &str) -> Result<u32, RepositoryError> {
        Ok(read(&self.inner)
            .values()
            .map(|s| s.tracking_number())
            .filter(|t| t.as_str().starts_with(period_prefix))
            .map(|t| t.sequence())
            .max()
            .unwrap_or(0))
    }

    async fn save(&self, shipment: &Shipment, expected: ExpectedVersion) -> Result<(), RepositoryError> {
        let mut map = write(&self.inner);
        let id = shipment.id_typed();

        expected.check(map.get(&id).map(|s| s.version()))?;
        if map
            .values()
            .any(|s| s.tracking_number() == shipment.tracking_number() && s.id_typed() != id)
        {
            return Err(RepositoryError::Conflict(format!(
                "tracking number {} is already in use",
                shipment.tracking_number()
            )));
        }

        map.insert(id, shipment.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use shiptrack_shipments::{NewShipment, ShipmentStatus, Volume, Weight};

    fn shipment(tracking: &str) -> Shipment {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        Shipment::receive(
            NewShipment {
                id: ShipmentId::new(),
                tracking_number: TrackingNumber::parse(tracking).unwrap(),
                origin: PortCode::parse("SGSIN").unwrap(),
                destination: PortCode::parse("NLRTM").unwrap(),
                weight: Weight::from_decimal(Decimal::new(1200, 0)).unwrap(),
                volume: Volume::from_decimal(Decimal::new(35, 1)).unwrap(),
                customer_reference: None,
                customer_id: None,
                cargo_description: None,
            },
            at,
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn stale_save_is_a_conflict_and_keeps_the_winner() {
        let repo = InMemoryShipmentRepository::new();
        let original = shipment("VTX-202503-0001");
        repo.save(&original, ExpectedVersion::New).await.unwrap();

        let at = Utc::now();
        let mut first = repo.find_by_id(original.id_typed()).await.unwrap().unwrap();
        let mut second = first.clone();
        first
            .append_status(ShipmentStatus::Packed, None, None, at, at, None)
            .unwrap();
        second
            .append_status(ShipmentStatus::OnVessel, None, None, at, at, None)
            .unwrap();

        repo.save(&first, ExpectedVersion::Exact(1)).await.unwrap();
        let err = repo.save(&second, ExpectedVersion::Exact(1)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let stored = repo.find_by_id(original.id_typed()).await.unwrap().unwrap();
        assert_eq!(stored.entries().len(), 2);
        assert_eq!(stored.current_status(), Some(ShipmentStatus::Packed));
    }

    #[tokio::test]
    async fn duplicate_tracking_numbers_are_rejected() {
        let repo = InMemoryShipmentRepository::new();
        repo.save(&shipment("VTX-202503-0001"), ExpectedVersion::New)
            .await
            .unwrap();
        let err = repo
            .save(&shipment("VTX-202503-0001"), ExpectedVersion::New)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn max_sequence_is_scoped_to_the_period() {
        let repo = InMemoryShipmentRepository::new();
        for tn in ["VTX-202503-0001", "VTX-202503-0007", "VTX-202504-0020"] {
            repo.save(&shipment(tn), ExpectedVersion::New).await.unwrap();
        }
        assert_eq!(repo.max_sequence_in_period("VTX-202503-").await.unwrap(), 7);
        assert_eq!(repo.max_sequence_in_period("VTX-202505-").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn port_codes_are_unique() {
        let repo = InMemoryPortRepository::new();
        let at = Utc::now();
        let code = PortCode::parse("SGSIN").unwrap();
        let a = Port::register(PortId::new(), code.clone(), "Singapore", "SG", at, None).unwrap();
        let b = Port::register(PortId::new(), code.clone(), "Singapore 2", "SG", at, None).unwrap();

        repo.save(&a, ExpectedVersion::New).await.unwrap();
        assert!(matches!(
            repo.save(&b, ExpectedVersion::New).await,
            Err(RepositoryError::Conflict(_))
        ));
        assert_eq!(repo.find_by_code(&code).await.unwrap().unwrap().id_typed(), a.id_typed());
    }
}
