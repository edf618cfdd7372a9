use std::str::FromStr;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use shiptrack_core::DomainError;
use shiptrack_infra::use_cases::UseCaseError;

pub fn use_case_error_to_response(err: UseCaseError) -> axum::response::Response {
    match err {
        UseCaseError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        UseCaseError::Validation(errors) => validation_error(errors),
        UseCaseError::Forbidden(msg) => json_error(StatusCode::FORBIDDEN, "forbidden", msg),
        UseCaseError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        UseCaseError::Repository(e) => {
            tracing::error!(error = %e, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "storage failure")
        }
        UseCaseError::Internal(msg) => {
            tracing::error!(error = %msg, "internal failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// 400 with the full violation list.
pub fn validation_error(errors: Vec<String>) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        axum::Json(json!({
            "error": "validation_error",
            "message": errors.join("; "),
            "errors": errors,
        })),
    )
        .into_response()
}

/// Parse a typed identifier from a path or body field.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    T::from_str(raw).map_err(|e| match e {
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        other => json_error(StatusCode::BAD_REQUEST, "invalid_id", other.to_string()),
    })
}
