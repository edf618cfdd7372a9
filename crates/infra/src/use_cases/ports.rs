//! Port registry use cases.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;

use shiptrack_auth::{CallerIdentity, Permission, authorize};
use shiptrack_core::{AggregateRoot, ExpectedVersion, PortId};
use shiptrack_ports::{Port, PortCode};

use super::views::PortView;
use super::{UseCaseError, Violations};
use crate::repository::{PortRepository, ShipmentRepository};

/// Tracking numbers quoted in a refused deactivation.
const MAX_REPORTED_REFERENCES: usize = 10;

#[derive(Debug, Clone)]
pub struct CreatePort {
    pub code: String,
    pub name: String,
    pub country: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct UpdatePort {
    pub id: PortId,
    pub name: String,
    pub country: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DeletePort {
    pub id: PortId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ListPorts {
    pub include_inactive: bool,
}

pub struct PortHandlers {
    ports: Arc<dyn PortRepository>,
    shipments: Arc<dyn ShipmentRepository>,
}

impl PortHandlers {
    pub fn new(ports: Arc<dyn PortRepository>, shipments: Arc<dyn ShipmentRepository>) -> Self {
        Self { ports, shipments }
    }

    #[instrument(skip(self, caller, cmd), fields(code = %cmd.code), err)]
    pub async fn create(&self, caller: &CallerIdentity, cmd: CreatePort) -> Result<PortView, UseCaseError> {
        authorize(caller, &Permission::PORTS_WRITE)?;

        let mut violations = Violations::new();
        let code = violations.capture(PortCode::parse(&cmd.code));
        let port = code.and_then(|code| {
            violations.capture(Port::register(
                PortId::new(),
                code,
                &cmd.name,
                &cmd.country,
                cmd.occurred_at,
                Some(caller.user_id()),
            ))
        });
        if let Some(port) = &port {
            if self.ports.find_by_code(port.code()).await?.is_some() {
                violations.push(format!("port code '{}' is already registered", port.code()));
            }
        }
        violations.finish()?;
        let Some(port) = port else {
            return Err(UseCaseError::validation("port could not be registered"));
        };

        self.ports.save(&port, ExpectedVersion::New).await?;
        tracing::info!(port_id = %port.id_typed(), code = %port.code(), "port registered");
        Ok(PortView::from(&port))
    }

    #[instrument(skip(self, caller, cmd), fields(port_id = %cmd.id), err)]
    pub async fn update(&self, caller: &CallerIdentity, cmd: UpdatePort) -> Result<PortView, UseCaseError> {
        authorize(caller, &Permission::PORTS_WRITE)?;

        let mut port = self.load(cmd.id).await?;
        let loaded = port.version();
        port.update_details(&cmd.name, &cmd.country, cmd.occurred_at, Some(caller.user_id()))?;
        self.ports.save(&port, ExpectedVersion::Exact(loaded)).await?;
        Ok(PortView::from(&port))
    }

    /// Deactivate a port unless an active shipment still routes through it.
    ///
    /// The guard scans every active shipment. Deleting an already inactive
    /// port is a no-op.
    #[instrument(skip(self, caller, cmd), fields(port_id = %cmd.id), err)]
    pub async fn delete(&self, caller: &CallerIdentity, cmd: DeletePort) -> Result<(), UseCaseError> {
        authorize(caller, &Permission::PORTS_WRITE)?;

        let mut port = self.load(cmd.id).await?;
        if !port.is_active() {
            return Ok(());
        }

        let blocking: Vec<String> = self
            .shipments
            .list_active()
            .await?
            .iter()
            .filter(|s| s.touches_port(port.code()))
            .map(|s| s.tracking_number().to_string())
            .collect();
        if !blocking.is_empty() {
            tracing::warn!(
                code = %port.code(),
                references = blocking.len(),
                tracking_numbers = ?blocking,
                "port deactivation refused"
            );
            let shown: Vec<&str> = blocking
                .iter()
                .take(MAX_REPORTED_REFERENCES)
                .map(String::as_str)
                .collect();
            return Err(UseCaseError::Conflict(format!(
                "port {} is referenced by {} active shipment(s): {}",
                port.code(),
                blocking.len(),
                shown.join(", ")
            )));
        }

        let loaded = port.version();
        port.deactivate(cmd.occurred_at, Some(caller.user_id()));
        self.ports.save(&port, ExpectedVersion::Exact(loaded)).await?;
        tracing::info!(code = %port.code(), "port deactivated");
        Ok(())
    }

    pub async fn get(&self, caller: &CallerIdentity, id: PortId) -> Result<PortView, UseCaseError> {
        authorize(caller, &Permission::PORTS_READ)?;
        Ok(PortView::from(&self.load(id).await?))
    }

    pub async fn list(&self, caller: &CallerIdentity, query: ListPorts) -> Result<Vec<PortView>, UseCaseError> {
        authorize(caller, &Permission::PORTS_READ)?;
        Ok(self
            .ports
            .list()
            .await?
            .iter()
            .filter(|p| query.include_inactive || p.is_active())
            .map(PortView::from)
            .collect())
    }

    async fn load(&self, id: PortId) -> Result<Port, UseCaseError> {
        self.ports.find_by_id(id).await?.ok_or(UseCaseError::NotFound)
    }
}
