use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::queries;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" when the freshness row is readable, "degraded" otherwise
    pub status: &'static str,
    pub version: &'static str,
    /// Whether the freshness state could be read
    pub freshness_readable: bool,
    /// Publish time of the last relayed forecast, as stored on disk
    pub last_notified_published_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Health check endpoint.
///
/// Reads the freshness row the poller depends on, so a missing table, a
/// corrupt stored timestamp or an unreachable state file all report
/// "degraded" (still 200).
pub async fn health_check(State(pool): State<SqlitePool>) -> Json<HealthResponse> {
    let (freshness_readable, last_notified_published_at, error) =
        match queries::get_last_notified(&pool).await {
            Ok(last) => (true, last, None),
            Err(e) => {
                tracing::warn!("Health check: freshness state unreadable: {}", e);
                (false, None, Some(e.to_string()))
            }
        };

    Json(HealthResponse {
        status: if freshness_readable { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        freshness_readable,
        last_notified_published_at,
        error,
    })
}
