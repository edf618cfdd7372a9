use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;

use shiptrack_core::ShipmentId;
use shiptrack_infra::use_cases::shipments::DeleteShipment;

use crate::app::services::AppServices;
use crate::app::extract::{ApiJson, ApiQuery};
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_shipment).get(list_shipments))
        .route("/tracking/:tracking_number", get(get_by_tracking_number))
        .route(
            "/:id",
            get(get_shipment).patch(update_shipment).delete(delete_shipment),
        )
        .route("/:id/status", post(append_status))
        .route("/:id/history", get(get_history))
}

fn shipment_id(raw: &str) -> Result<ShipmentId, Response> {
    errors::parse_id(raw)
}

pub async fn create_shipment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<dto::CreateShipmentRequest>,
) -> Response {
    let cmd = match dto::create_shipment(body, Utc::now()) {
        Ok(cmd) => cmd,
        Err(res) => return res,
    };
    match services.shipments.create(&principal.caller(), cmd).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}

pub async fn list_shipments(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ApiQuery(query): ApiQuery<dto::ListShipmentsQuery>,
) -> Response {
    let query = match dto::list_shipments(query) {
        Ok(q) => q,
        Err(res) => return res,
    };
    match services.shipments.list(&principal.caller(), query).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}

pub async fn get_shipment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match shipment_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    match services.shipments.get_by_id(&principal.caller(), id).await {
        Ok(details) => (StatusCode::OK, Json(details)).into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}

pub async fn get_by_tracking_number(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(tracking_number): Path<String>,
) -> Response {
    match services
        .shipments
        .get_by_tracking_number(&principal.caller(), &tracking_number)
        .await
    {
        Ok(details) => (StatusCode::OK, Json(details)).into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}

pub async fn update_shipment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::UpdateShipmentRequest>,
) -> Response {
    let id = match shipment_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let cmd = dto::update_shipment(id, body, Utc::now());
    match services.shipments.update(&principal.caller(), cmd).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}

pub async fn delete_shipment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match shipment_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let cmd = DeleteShipment {
        id,
        occurred_at: Utc::now(),
    };
    match services.shipments.delete(&principal.caller(), cmd).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}

pub async fn append_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::AppendStatusRequest>,
) -> Response {
    let id = match shipment_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let cmd = dto::append_status(id, body, Utc::now());
    match services.shipments.append_status(&principal.caller(), cmd).await {
        Ok(entry) => (StatusCode::CREATED, Json(entry)).into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}

pub async fn get_history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match shipment_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    match services.shipments.history(&principal.caller(), id).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}
