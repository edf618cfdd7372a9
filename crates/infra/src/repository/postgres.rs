//! Postgres-backed repositories.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | RepositoryError |
//! |------------|----------------------|-----------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | Any other | `Backend` |
//! | Pool / IO / decode failures | N/A | `Backend` |
//!
//! Optimistic concurrency uses `UPDATE ... WHERE version = $expected`: zero
//! affected rows means another writer got there first. Status history rows
//! are insert-only and keyed by entry id, so re-saving an aggregate never
//! rewrites an existing entry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use shiptrack_core::{
    AggregateRoot, AuditTrail, CustomerId, ExpectedVersion, PortId, ShipmentId, StatusEntryId,
    UserId,
};
use shiptrack_ports::{Port, PortCode};
use shiptrack_shipments::{
    Shipment, ShipmentSnapshot, ShipmentStatus, StatusHistoryEntry, TrackingNumber, Volume, Weight,
};

use super::{PortRepository, RepositoryError, ShipmentRepository};

const PORT_COLUMNS: &str = r#"
    id, code, name, country, is_active, version,
    created_at, created_by, updated_at, updated_by
"#;

const SHIPMENT_COLUMNS: &str = r#"
    id, tracking_number, origin_port, destination_port, weight_kg, volume_cbm,
    customer_reference, customer_id, cargo_description, is_deleted, deleted_at, version,
    created_at, created_by, updated_at, updated_by
"#;

/// Postgres-backed port registry.
#[derive(Debug, Clone)]
pub struct PostgresPortRepository {
    pool: Arc<PgPool>,
}

impl PostgresPortRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl PortRepository for PostgresPortRepository {
    #[instrument(skip(self), fields(port_id = %id), err)]
    async fn find_by_id(&self, id: PortId) -> Result<Option<Port>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PORT_COLUMNS} FROM ports WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_port_by_id", e))?;
        row.as_ref().map(port_from_row).transpose()
    }

    #[instrument(skip(self), fields(code = %code), err)]
    async fn find_by_code(&self, code: &PortCode) -> Result<Option<Port>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PORT_COLUMNS} FROM ports WHERE code = $1"))
            .bind(code.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_port_by_code", e))?;
        row.as_ref().map(port_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<Port>, RepositoryError> {
        let rows = sqlx::query(&format!("SELECT {PORT_COLUMNS} FROM ports ORDER BY code ASC"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_ports", e))?;
        rows.iter().map(port_from_row).collect()
    }

    #[instrument(skip(self, port), fields(port_id = %port.id_typed(), version = port.version()), err)]
    async fn save(&self, port: &Port, expected: ExpectedVersion) -> Result<(), RepositoryError> {
        let audit = port.audit();
        let affected = match expected {
            ExpectedVersion::New => sqlx::query(
                r#"
                INSERT INTO ports (
                    id, code, name, country, is_active, version,
                    created_at, created_by, updated_at, updated_by
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            ),
            ExpectedVersion::Exact(_) => sqlx::query(
                r#"
                UPDATE ports SET
                    code = $2, name = $3, country = $4, is_active = $5, version = $6,
                    created_at = $7, created_by = $8, updated_at = $9, updated_by = $10
                WHERE id = $1 AND version = $11
                "#,
            ),
        }
        .bind(*port.id_typed().as_uuid())
        .bind(port.code().as_str())
        .bind(port.name())
        .bind(port.country())
        .bind(port.is_active())
        .bind(to_db_version(port.version())?)
        .bind(audit.created_at)
        .bind(audit.created_by.map(Uuid::from))
        .bind(audit.updated_at)
        .bind(audit.updated_by.map(Uuid::from));

        let affected = match expected {
            ExpectedVersion::Exact(v) => affected.bind(to_db_version(v)?),
            ExpectedVersion::New => affected,
        }
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_port", e))?
        .rows_affected();

        if affected == 0 {
            return Err(RepositoryError::Conflict(format!(
                "port {} was modified concurrently (expected {expected:?})",
                port.id_typed()
            )));
        }
        Ok(())
    }
}

/// Postgres-backed shipment store. History lives in its own table.
#[derive(Debug, Clone)]
pub struct PostgresShipmentRepository {
    pool: Arc<PgPool>,
}

impl PostgresShipmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn load_history(
        &self,
        shipment_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<StatusHistoryEntry>>, RepositoryError> {
        let mut by_shipment: HashMap<Uuid, Vec<StatusHistoryEntry>> = HashMap::new();
        if shipment_ids.is_empty() {
            return Ok(by_shipment);
        }

        let rows = sqlx::query(
            r#"
            SELECT
                id, shipment_id, sequence, status, description, location,
                event_time, recorded_at, recorded_by
            FROM shipment_status_history
            WHERE shipment_id = ANY($1)
            ORDER BY shipment_id, sequence ASC
            "#,
        )
        .bind(shipment_ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_history", e))?;

        for row in &rows {
            let shipment_id: Uuid = get(row, "shipment_id")?;
            by_shipment
                .entry(shipment_id)
                .or_default()
                .push(history_from_row(row)?);
        }
        Ok(by_shipment)
    }

    async fn hydrate(&self, rows: Vec<PgRow>) -> Result<Vec<Shipment>, RepositoryError> {
        let ids = rows
            .iter()
            .map(|row| get::<Uuid>(row, "id"))
            .collect::<Result<Vec<_>, _>>()?;
        let mut history = self.load_history(&ids).await?;

        rows.iter()
            .zip(ids)
            .map(|(row, id)| shipment_from_row(row, history.remove(&id).unwrap_or_default()))
            .collect()
    }

    async fn find_one(
        &self,
        operation: &'static str,
        column: &'static str,
        bind: impl Into<ShipmentKey>,
    ) -> Result<Option<Shipment>, RepositoryError> {
        let sql = format!("SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE {column} = $1");
        let query = sqlx::query(&sql);
        let query = match bind.into() {
            ShipmentKey::Id(id) => query.bind(id),
            ShipmentKey::TrackingNumber(tn) => query.bind(tn),
        };
        let row = query
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

enum ShipmentKey {
    Id(Uuid),
    TrackingNumber(String),
}

impl From<ShipmentId> for ShipmentKey {
    fn from(value: ShipmentId) -> Self {
        ShipmentKey::Id(value.into())
    }
}

impl From<&TrackingNumber> for ShipmentKey {
    fn from(value: &TrackingNumber) -> Self {
        ShipmentKey::TrackingNumber(value.as_str().to_string())
    }
}

#[async_trait]
impl ShipmentRepository for PostgresShipmentRepository {
    #[instrument(skip(self), fields(shipment_id = %id), err)]
    async fn find_by_id(&self, id: ShipmentId) -> Result<Option<Shipment>, RepositoryError> {
        self.find_one("find_shipment_by_id", "id", id).await
    }

    #[instrument(skip(self), fields(tracking_number = %tracking_number), err)]
    async fn find_by_tracking_number(
        &self,
        tracking_number: &TrackingNumber,
    ) -> Result<Option<Shipment>, RepositoryError> {
        self.find_one("find_shipment_by_tracking_number", "tracking_number", tracking_number)
            .await
    }

    #[instrument(skip(self), err)]
    async fn list_active(&self) -> Result<Vec<Shipment>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE NOT is_deleted ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_active_shipments", e))?;
        self.hydrate(rows).await
    }

    #[instrument(skip(self), err)]
    async fn max_sequence_in_period(&self, period_prefix: &str) -> Result<u32, RepositoryError> {
        let start = period_prefix.len() as i32 + 1;
        let max: i32 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(MAX(CAST(SUBSTRING(tracking_number FROM $2) AS INTEGER)), 0)
            FROM shipments
            WHERE tracking_number LIKE $1
            "#,
        )
        .bind(format!("{period_prefix}%"))
        .bind(start)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("max_sequence_in_period", e))?;

        u32::try_from(max).map_err(|_| RepositoryError::Backend(format!("negative sequence {max}")))
    }

    #[instrument(
        skip(self, shipment),
        fields(
            shipment_id = %shipment.id_typed(),
            tracking_number = %shipment.tracking_number(),
            version = shipment.version()
        ),
        err
    )]
    async fn save(&self, shipment: &Shipment, expected: ExpectedVersion) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        write_shipment_row(&mut tx, shipment, expected).await?;
        for entry in shipment.entries() {
            insert_history_entry(&mut tx, shipment.id_typed(), entry).await?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }
}

async fn write_shipment_row(
    tx: &mut Transaction<'_, Postgres>,
    shipment: &Shipment,
    expected: ExpectedVersion,
) -> Result<(), RepositoryError> {
    let sql = match expected {
        ExpectedVersion::New => {
            r#"
            INSERT INTO shipments (
                id, tracking_number, origin_port, destination_port, weight_kg, volume_cbm,
                customer_reference, customer_id, cargo_description, is_deleted, deleted_at,
                version, created_at, created_by, updated_at, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#
        }
        ExpectedVersion::Exact(_) => {
            r#"
            UPDATE shipments SET
                tracking_number = $2, origin_port = $3, destination_port = $4,
                weight_kg = $5, volume_cbm = $6, customer_reference = $7, customer_id = $8,
                cargo_description = $9, is_deleted = $10, deleted_at = $11, version = $12,
                created_at = $13, created_by = $14, updated_at = $15, updated_by = $16
            WHERE id = $1 AND version = $17
            "#
        }
    };

    let audit = shipment.audit();
    let query = sqlx::query(sql)
        .bind(*shipment.id_typed().as_uuid())
        .bind(shipment.tracking_number().as_str())
        .bind(shipment.origin().as_str())
        .bind(shipment.destination().as_str())
        .bind(shipment.weight().value())
        .bind(shipment.volume().value())
        .bind(shipment.customer_reference())
        .bind(shipment.customer_id().map(Uuid::from))
        .bind(shipment.cargo_description())
        .bind(shipment.is_deleted())
        .bind(shipment.deleted_at())
        .bind(to_db_version(shipment.version())?)
        .bind(audit.created_at)
        .bind(audit.created_by.map(Uuid::from))
        .bind(audit.updated_at)
        .bind(audit.updated_by.map(Uuid::from));
    let query = match expected {
        ExpectedVersion::Exact(v) => query.bind(to_db_version(v)?),
        ExpectedVersion::New => query,
    };

    let affected = query
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("save_shipment", e))?
        .rows_affected();

    if affected == 0 {
        return Err(RepositoryError::Conflict(format!(
            "shipment {} was modified concurrently (expected {expected:?})",
            shipment.tracking_number()
        )));
    }
    Ok(())
}

async fn insert_history_entry(
    tx: &mut Transaction<'_, Postgres>,
    shipment_id: ShipmentId,
    entry: &StatusHistoryEntry,
) -> Result<(), RepositoryError> {
    let sequence = i32::try_from(entry.sequence)
        .map_err(|_| RepositoryError::Backend(format!("sequence {} out of range", entry.sequence)))?;

    sqlx::query(
        r#"
        INSERT INTO shipment_status_history (
            id, shipment_id, sequence, status, description, location,
            event_time, recorded_at, recorded_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(*entry.id.as_uuid())
    .bind(*shipment_id.as_uuid())
    .bind(sequence)
    .bind(entry.status.as_str())
    .bind(entry.description.as_deref())
    .bind(entry.location.as_deref())
    .bind(entry.event_time)
    .bind(entry.recorded_at)
    .bind(entry.recorded_by.map(Uuid::from))
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_history_entry", e))?;
    Ok(())
}

fn port_from_row(row: &PgRow) -> Result<Port, RepositoryError> {
    let code: String = get(row, "code")?;
    Ok(Port::restore(
        PortId::from_uuid(get(row, "id")?),
        PortCode::parse(&code).map_err(corrupt("ports.code"))?,
        get(row, "name")?,
        get(row, "country")?,
        get(row, "is_active")?,
        from_db_version(get(row, "version")?)?,
        audit_from_row(row)?,
    ))
}

fn shipment_from_row(
    row: &PgRow,
    history: Vec<StatusHistoryEntry>,
) -> Result<Shipment, RepositoryError> {
    let tracking_number: String = get(row, "tracking_number")?;
    let origin: String = get(row, "origin_port")?;
    let destination: String = get(row, "destination_port")?;
    let weight: Decimal = get(row, "weight_kg")?;
    let volume: Decimal = get(row, "volume_cbm")?;

    Ok(Shipment::restore(ShipmentSnapshot {
        id: ShipmentId::from_uuid(get(row, "id")?),
        tracking_number: TrackingNumber::parse(&tracking_number)
            .map_err(corrupt("shipments.tracking_number"))?,
        origin: PortCode::parse(&origin).map_err(corrupt("shipments.origin_port"))?,
        destination: PortCode::parse(&destination).map_err(corrupt("shipments.destination_port"))?,
        weight: Weight::from_decimal(weight).map_err(corrupt("shipments.weight_kg"))?,
        volume: Volume::from_decimal(volume).map_err(corrupt("shipments.volume_cbm"))?,
        customer_reference: get(row, "customer_reference")?,
        customer_id: get::<Option<Uuid>>(row, "customer_id")?.map(CustomerId::from_uuid),
        cargo_description: get(row, "cargo_description")?,
        is_deleted: get(row, "is_deleted")?,
        deleted_at: get(row, "deleted_at")?,
        history,
        version: from_db_version(get(row, "version")?)?,
        audit: audit_from_row(row)?,
    }))
}

fn history_from_row(row: &PgRow) -> Result<StatusHistoryEntry, RepositoryError> {
    let status: String = get(row, "status")?;
    let sequence: i32 = get(row, "sequence")?;
    Ok(StatusHistoryEntry {
        id: StatusEntryId::from_uuid(get(row, "id")?),
        status: ShipmentStatus::parse(&status).map_err(corrupt("shipment_status_history.status"))?,
        description: get(row, "description")?,
        location: get(row, "location")?,
        event_time: get(row, "event_time")?,
        sequence: u32::try_from(sequence)
            .map_err(|_| RepositoryError::Backend(format!("negative history sequence {sequence}")))?,
        recorded_at: get(row, "recorded_at")?,
        recorded_by: get::<Option<Uuid>>(row, "recorded_by")?.map(UserId::from_uuid),
    })
}

fn audit_from_row(row: &PgRow) -> Result<AuditTrail, RepositoryError> {
    Ok(AuditTrail {
        created_at: get::<DateTime<Utc>>(row, "created_at")?,
        created_by: get::<Option<Uuid>>(row, "created_by")?.map(UserId::from_uuid),
        updated_at: get(row, "updated_at")?,
        updated_by: get::<Option<Uuid>>(row, "updated_by")?.map(UserId::from_uuid),
    })
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| RepositoryError::Backend(format!("failed to read column {column}: {e}")))
}

fn corrupt<E: core::fmt::Display>(column: &'static str) -> impl Fn(E) -> RepositoryError {
    move |e| RepositoryError::Backend(format!("unreadable value in {column}: {e}"))
}

fn to_db_version(version: u64) -> Result<i64, RepositoryError> {
    i64::try_from(version).map_err(|_| RepositoryError::Backend(format!("version {version} out of range")))
}

fn from_db_version(version: i64) -> Result<u64, RepositoryError> {
    u64::try_from(version).map_err(|_| RepositoryError::Backend(format!("negative version {version}")))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => RepositoryError::Conflict(msg),
                _ => RepositoryError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            RepositoryError::Backend(format!("connection pool closed in {operation}"))
        }
        other => RepositoryError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}
