//! Poller status HTTP endpoint.
//!
//! GET /api/v1/poller/status: returns the state of the background
//! forecast poller as JSON.

use axum::extract::State;
use axum::Json;

use crate::services::poller::{PollerState, SharedPollerState};

/// Get the current poller status (last cycle result, next wakeup, last relayed forecast).
pub async fn get_poller_status(State(state): State<SharedPollerState>) -> Json<PollerState> {
    let s = state.read().await;
    Json(s.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    #[tokio::test]
    async fn test_status_reflects_shared_state() {
        let state: SharedPollerState = Arc::new(RwLock::new(PollerState::new(900, None)));
        state.write().await.total_polls = 7;

        let Json(body) = get_poller_status(State(state)).await;
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["total_polls"], 7);
        assert_eq!(json["check_interval_secs"], 900);
        assert_eq!(json["last_poll_result"], "pending");
        assert!(json["last_published_at"].is_null());
    }
}
