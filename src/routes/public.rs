use crate::{AppState, handlers::users};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints that need no session. Nothing here reads or writes user data.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers; always "ok".
        .route("/health", get(users::health_check))
        // GET /socket
        // The real-time chat transport is a separate service; this path answers 501.
        .route("/socket", get(users::socket_placeholder))
}
