//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: repository/identity wiring and the use-case handlers
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and their mapping onto use-case commands
//! - `errors.rs`: consistent error responses
//! - `extract.rs`: JSON/query extractors with validation-style rejections

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use shiptrack_auth::Hs256Jwt;
use shiptrack_infra::config::AppConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod extract;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let jwt = Arc::new(Hs256Jwt::new(
        config.jwt_secret.as_bytes(),
        config.access_token_ttl,
    ));
    let services = Arc::new(services::build_services(config, jwt.clone()).await?);
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require a valid bearer token.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Ok(Router::new()
        .route("/health", get(routes::system::health))
        .nest("/auth", routes::auth::router())
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(Extension(services)),
        ))
}
