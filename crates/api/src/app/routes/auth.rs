//! Public authentication endpoints (no bearer token required).

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Utc;

use shiptrack_infra::use_cases::identity::{ForgotPassword, Login, RefreshToken, ResetPassword};

use crate::app::services::AppServices;
use crate::app::extract::ApiJson;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/confirm-email", post(confirm_email))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<dto::LoginRequest>,
) -> Response {
    let cmd = Login {
        email: body.email,
        password: body.password,
        occurred_at: Utc::now(),
    };
    match services.identity.login(cmd).await {
        Ok(tokens) => (StatusCode::OK, Json(tokens)).into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}

pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<dto::RefreshRequest>,
) -> Response {
    let cmd = RefreshToken {
        refresh_token: body.refresh_token,
        occurred_at: Utc::now(),
    };
    match services.identity.refresh(cmd).await {
        Ok(tokens) => (StatusCode::OK, Json(tokens)).into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}

pub async fn confirm_email(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<dto::ConfirmEmailRequest>,
) -> Response {
    let cmd = match dto::confirm_email(body) {
        Ok(cmd) => cmd,
        Err(res) => return res,
    };
    match services.identity.confirm_email(cmd).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}

/// Always 202 for well-formed input; the token goes out through the notifier.
pub async fn forgot_password(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<dto::ForgotPasswordRequest>,
) -> Response {
    let cmd = ForgotPassword {
        email: body.email,
        occurred_at: Utc::now(),
    };
    match services.identity.forgot_password(cmd).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}

pub async fn reset_password(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<dto::ResetPasswordRequest>,
) -> Response {
    let cmd = ResetPassword {
        email: body.email,
        token: body.token,
        new_password: body.new_password,
        occurred_at: Utc::now(),
    };
    match services.identity.reset_password(cmd).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::use_case_error_to_response(e),
    }
}
