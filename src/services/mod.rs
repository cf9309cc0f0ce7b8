pub mod avalanche;
pub mod forecast;
pub mod poller;
pub mod slack;

use std::time::Duration;

use crate::errors::AppError;

/// Upper bound on any single request to the forecast API or the webhook.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("avycast-relay/", env!("CARGO_PKG_VERSION"));

/// HTTP client shared by the forecast source and the webhook transport.
pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))
}
