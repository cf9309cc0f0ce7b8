// avycast-relay v0.1
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod errors;
mod helpers;
mod routes;
mod services;

use config::AppConfig;
use errors::AppError;
use services::avalanche::AvalancheClient;
use services::poller::{PollerContext, PollerState, SharedPollerState};
use services::slack::SlackClient;
use services::HTTP_TIMEOUT;

#[tokio::main]
async fn main() {
    // A missing .env file is fine; the environment may be set directly
    let dotenv = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "avycast_relay=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    if let Err(e) = run().await {
        tracing::error!("Startup failed: {}", e);
        std::process::exit(1);
    }
}

/// Set up collaborators and run the poller until the process is killed.
async fn run() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;

    let pool = db::connect(&config.db_location).await?;
    tracing::info!("Freshness state at {} ready", config.db_location);

    let last_published_at = db::queries::get_last_notified(&pool).await?;
    match last_published_at {
        Some(t) => tracing::info!("Last relayed forecast was published {}", t),
        None => tracing::info!("No forecast relayed yet"),
    }

    let source = AvalancheClient::new(
        &config.forecast_api_url,
        &config.forecast_center_id,
        &config.forecast_zone_id,
        HTTP_TIMEOUT,
    )?;
    let slack = SlackClient::new(&config.webhook_url, HTTP_TIMEOUT)?;

    let poller_state: SharedPollerState = Arc::new(RwLock::new(PollerState::new(
        config.check_interval_secs,
        last_published_at,
    )));

    if let Some(port) = config.status_port {
        let app = routes::router(pool.clone(), poller_state.clone());
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::Config(format!("Failed to bind status port {}: {}", port, e)))?;
        tracing::info!("Status endpoint listening on {}", addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Status endpoint terminated: {}", e);
            }
        });
    }

    let ctx = PollerContext {
        pool,
        source,
        slack,
        display_tz: config.display_tz,
        message_header: config.message_header,
        full_forecast_url: config.full_forecast_url,
    };

    services::poller::run_poller(ctx, poller_state).await;
    Ok(())
}
