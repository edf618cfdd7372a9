use axum::{Router, routing::get};

pub mod auth;
pub mod ports;
pub mod shipments;
pub mod system;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/ports", ports::router())
        .nest("/shipments", shipments::router())
        .nest("/users", users::router())
}
