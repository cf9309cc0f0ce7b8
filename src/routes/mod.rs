pub mod health;
pub mod poller;

use axum::{routing::get, Router};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

use crate::services::poller::SharedPollerState;

/// Read-only status router: health and poller state.
pub fn router(pool: SqlitePool, poller_state: SharedPollerState) -> Router {
    let health_routes = Router::new()
        .route("/api/v1/health", get(health::health_check))
        .with_state(pool);

    let poller_routes = Router::new()
        .route("/api/v1/poller/status", get(poller::get_poller_status))
        .with_state(poller_state);

    Router::new()
        .merge(health_routes)
        .merge(poller_routes)
        .layer(TraceLayer::new_for_http())
}
