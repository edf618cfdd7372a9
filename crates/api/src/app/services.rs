//! Service wiring: repositories, identity provider, and use-case handlers.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use shiptrack_auth::{Hs256Jwt, IdentityService, InMemoryIdentityService, TracingNotifier};
use shiptrack_infra::config::{AppConfig, Persistence};
use shiptrack_infra::db;
use shiptrack_infra::repository::{
    InMemoryPortRepository, InMemoryShipmentRepository, PortRepository, PostgresPortRepository,
    PostgresShipmentRepository, ShipmentRepository,
};
use shiptrack_infra::use_cases::{IdentityHandlers, PortHandlers, ShipmentHandlers};

/// Shared application services, one handler per area.
pub struct AppServices {
    pub ports: PortHandlers,
    pub shipments: ShipmentHandlers,
    pub identity: IdentityHandlers,
}

pub async fn build_services(config: &AppConfig, jwt: Arc<Hs256Jwt>) -> anyhow::Result<AppServices> {
    let (ports, shipments) = match &config.persistence {
        Persistence::InMemory => {
            tracing::info!("using in-memory stores");
            in_memory_repositories()
        }
        Persistence::Postgres { database_url } => {
            let pool = db::connect(database_url)
                .await
                .context("failed to initialize postgres")?;
            tracing::info!("using postgres stores");
            postgres_repositories(pool)
        }
    };

    if matches!(config.persistence, Persistence::Postgres { .. }) {
        tracing::warn!("user accounts are kept in memory and reset on restart");
    }
    let identity: Arc<dyn IdentityService> =
        Arc::new(InMemoryIdentityService::new(Arc::new(TracingNotifier)));

    let services = AppServices {
        ports: PortHandlers::new(ports.clone(), shipments.clone()),
        shipments: ShipmentHandlers::new(shipments, ports),
        identity: IdentityHandlers::new(identity, jwt, config.refresh_token_ttl),
    };

    if let Some(seed) = &config.seed_admin {
        services
            .identity
            .seed_admin(&seed.email, &seed.password, Utc::now())
            .await
            .context("failed to seed administrator account")?;
    }

    Ok(services)
}

fn in_memory_repositories() -> (Arc<dyn PortRepository>, Arc<dyn ShipmentRepository>) {
    (
        Arc::new(InMemoryPortRepository::new()),
        Arc::new(InMemoryShipmentRepository::new()),
    )
}

fn postgres_repositories(
    pool: sqlx::PgPool,
) -> (Arc<dyn PortRepository>, Arc<dyn ShipmentRepository>) {
    (
        Arc::new(PostgresPortRepository::new(pool.clone())),
        Arc::new(PostgresShipmentRepository::new(pool)),
    )
}
