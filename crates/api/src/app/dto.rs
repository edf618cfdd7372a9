use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use shiptrack_core::{CustomerId, PortId, ShipmentId, UserId};
use shiptrack_infra::use_cases::{identity, ports, shipments};

use crate::app::errors;

// -------------------------
// Auth
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmEmailRequest {
    pub user_id: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub token: String,
    pub new_password: String,
}

// -------------------------
// Ports
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreatePortRequest {
    pub code: String,
    pub name: String,
    pub country: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePortRequest {
    pub name: String,
    pub country: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListPortsQuery {
    pub include_inactive: Option<bool>,
}

// -------------------------
// Shipments
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateShipmentRequest {
    pub origin_port: String,
    pub destination_port: String,
    pub weight_kg: Decimal,
    pub volume_cbm: Decimal,
    pub customer_reference: Option<String>,
    pub customer_id: Option<String>,
    pub cargo_description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateShipmentRequest {
    pub origin_port: Option<String>,
    pub destination_port: Option<String>,
    pub weight_kg: Option<Decimal>,
    pub volume_cbm: Option<Decimal>,
    pub customer_reference: Option<String>,
    pub cargo_description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AppendStatusRequest {
    pub status: String,
    pub description: Option<String>,
    pub location: Option<String>,
    /// Defaults to the time the request is handled.
    pub event_time_utc: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListShipmentsQuery {
    pub status: Option<String>,
    pub customer_id: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

// -------------------------
// Users
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub display_name: String,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role: String,
}

// -------------------------
// Mapping onto use-case commands
// -------------------------

type MapResult<T> = Result<T, axum::response::Response>;

fn optional_customer(raw: Option<&str>) -> MapResult<Option<CustomerId>> {
    raw.filter(|s| !s.trim().is_empty())
        .map(errors::parse_id::<CustomerId>)
        .transpose()
}

pub fn create_shipment(body: CreateShipmentRequest, now: DateTime<Utc>) -> MapResult<shipments::CreateShipment> {
    Ok(shipments::CreateShipment {
        customer_id: optional_customer(body.customer_id.as_deref())?,
        origin_port: body.origin_port,
        destination_port: body.destination_port,
        weight_kg: body.weight_kg,
        volume_cbm: body.volume_cbm,
        customer_reference: body.customer_reference,
        cargo_description: body.cargo_description,
        occurred_at: now,
    })
}

pub fn update_shipment(id: ShipmentId, body: UpdateShipmentRequest, now: DateTime<Utc>) -> shipments::UpdateShipment {
    shipments::UpdateShipment {
        id,
        origin_port: body.origin_port,
        destination_port: body.destination_port,
        weight_kg: body.weight_kg,
        volume_cbm: body.volume_cbm,
        customer_reference: body.customer_reference,
        cargo_description: body.cargo_description,
        occurred_at: now,
    }
}

pub fn append_status(id: ShipmentId, body: AppendStatusRequest, now: DateTime<Utc>) -> shipments::AppendShipmentStatus {
    shipments::AppendShipmentStatus {
        id,
        status: body.status,
        description: body.description,
        location: body.location,
        event_time_utc: body.event_time_utc.unwrap_or(now),
        occurred_at: now,
    }
}

pub fn list_shipments(query: ListShipmentsQuery) -> MapResult<shipments::ListShipments> {
    let defaults = shipments::ListShipments::default();
    Ok(shipments::ListShipments {
        customer_id: optional_customer(query.customer_id.as_deref())?,
        status: query.status.filter(|s| !s.trim().is_empty()),
        page: query.page.unwrap_or(defaults.page),
        page_size: query.page_size.unwrap_or(defaults.page_size),
    })
}

pub fn create_port(body: CreatePortRequest, now: DateTime<Utc>) -> ports::CreatePort {
    ports::CreatePort {
        code: body.code,
        name: body.name,
        country: body.country,
        occurred_at: now,
    }
}

pub fn update_port(id: PortId, body: UpdatePortRequest, now: DateTime<Utc>) -> ports::UpdatePort {
    ports::UpdatePort {
        id,
        name: body.name,
        country: body.country,
        occurred_at: now,
    }
}

pub fn create_user(body: CreateUserRequest, now: DateTime<Utc>) -> identity::CreateUser {
    identity::CreateUser {
        email: body.email,
        display_name: body.display_name,
        password: body.password,
        roles: body.roles,
        occurred_at: now,
    }
}

pub fn update_user(id: UserId, body: UpdateUserRequest) -> identity::UpdateUser {
    identity::UpdateUser {
        id,
        email: body.email,
        display_name: body.display_name,
    }
}

pub fn confirm_email(body: ConfirmEmailRequest) -> MapResult<identity::ConfirmEmail> {
    Ok(identity::ConfirmEmail {
        user_id: errors::parse_id(&body.user_id)?,
        token: body.token,
    })
}
