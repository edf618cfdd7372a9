use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::Utc;

use shiptrack_core::UserId;

use crate::app::services::AppServices;
use crate::app::extract::ApiJson;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_user).get(list_users))
        .route("/:id", get(get_user).patch(update_user).delete(delete_user))
        .route("/:id/roles", post(assign_role))
        .route("/:id/roles/:role", delete(remove_role))
}

fn user_id(raw: &str) -> Result<UserId, Response> {
    errors::parse_id(raw)
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    ApiJson(body): ApiJson<dto::CreateUserRequest>,
) -> Response {
    let cmd = dto::create_user(body, Utc::now());
    match services.identity.create_user(&principal.caller(), cmd).await {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    match services.identity.list_users(&principal.caller()).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match user_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    match services.identity.get_user(&principal.caller(), id).await {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::UpdateUserRequest>,
) -> Response {
    let id = match user_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    match services
        .identity
        .update_user(&principal.caller(), dto::update_user(id, body))
        .await
    {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let id = match user_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    match services.identity.delete_user(&principal.caller(), id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}

pub async fn assign_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::AssignRoleRequest>,
) -> Response {
    let id = match user_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    match services
        .identity
        .assign_role(&principal.caller(), id, &body.role)
        .await
    {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}

pub async fn remove_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, role)): Path<(String, String)>,
) -> Response {
    let id = match user_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    match services.identity.remove_role(&principal.caller(), id, &role).await {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}
