//! Repository ports and their adapters.
//!
//! Aggregates are loaded whole and saved whole. Every save names the version
//! it expects to overwrite; a mismatch is reported as
//! [`RepositoryError::Conflict`] and nothing is written.

use async_trait::async_trait;
use thiserror::Error;

use shiptrack_core::{DomainError, ExpectedVersion, PortId, ShipmentId};
use shiptrack_ports::{Port, PortCode};
use shiptrack_shipments::{Shipment, TrackingNumber};

mod in_memory;
mod postgres;

pub use in_memory::{InMemoryPortRepository, InMemoryShipmentRepository};
pub use postgres::{PostgresPortRepository, PostgresShipmentRepository};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Stale version or a uniqueness clash (tracking number, port code).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store failed or returned unreadable data.
    #[error("storage failure: {0}")]
    Backend(String),
}

impl From<DomainError> for RepositoryError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Conflict(msg) => RepositoryError::Conflict(msg),
            other => RepositoryError::Backend(other.to_string()),
        }
    }
}

#[async_trait]
pub trait PortRepository: Send + Sync {
    async fn find_by_id(&self, id: PortId) -> Result<Option<Port>, RepositoryError>;

    /// Case-insensitive by construction: codes are stored normalized.
    async fn find_by_code(&self, code: &PortCode) -> Result<Option<Port>, RepositoryError>;

    /// All ports, active or not, ordered by code.
    async fn list(&self) -> Result<Vec<Port>, RepositoryError>;

    async fn save(&self, port: &Port, expected: ExpectedVersion) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ShipmentRepository: Send + Sync {
    /// Includes soft-deleted shipments.
    async fn find_by_id(&self, id: ShipmentId) -> Result<Option<Shipment>, RepositoryError>;

    /// Includes soft-deleted shipments.
    async fn find_by_tracking_number(
        &self,
        tracking_number: &TrackingNumber,
    ) -> Result<Option<Shipment>, RepositoryError>;

    /// Shipments that are not soft-deleted, newest first.
    async fn list_active(&self) -> Result<Vec<Shipment>, RepositoryError>;

    /// Highest sequence issued for tracking numbers starting with
    /// `period_prefix` (`VTX-YYYYMM-`), deleted shipments included. Zero when
    /// the period is unused.
    async fn max_sequence_in_period(&self, period_prefix: &str) -> Result<u32, RepositoryError>;

    async fn save(&self, shipment: &Shipment, expected: ExpectedVersion) -> Result<(), RepositoryError>;
}
