use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;

use shiptrack_core::PortId;
use shiptrack_infra::use_cases::ports::{DeletePort, ListPorts};

use crate::app::services::AppServices;
use crate::app::extract::{ApiJson, ApiQuery};
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_port).get(list_ports))
        .route("/:id", get(get_port).patch(update_port).delete(delete_port))
}

pub async fn create_port(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<dto::CreatePortRequest>,
) -> Response {
    let cmd = dto::create_port(body, Utc::now());
    match services.ports.create(&principal.caller(), cmd).await {
        Ok(port) => (StatusCode::CREATED, Json(port)).into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}

pub async fn list_ports(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ApiQuery(query): ApiQuery<dto::ListPortsQuery>,
) -> Response {
    let query = ListPorts {
        include_inactive: query.include_inactive.unwrap_or(false),
    };
    match services.ports.list(&principal.caller(), query).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}

pub async fn get_port(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id: PortId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    match services.ports.get(&principal.caller(), id).await {
        Ok(port) => (StatusCode::OK, Json(port)).into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}

pub async fn update_port(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::UpdatePortRequest>,
) -> Response {
    let id: PortId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let cmd = dto::update_port(id, body, Utc::now());
    match services.ports.update(&principal.caller(), cmd).await {
        Ok(port) => (StatusCode::OK, Json(port)).into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}

/// Deactivates the port; 409 while active shipments still reference it.
pub async fn delete_port(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id: PortId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let cmd = DeletePort {
        id,
        occurred_at: Utc::now(),
    };
    match services.ports.delete(&principal.caller(), cmd).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}
