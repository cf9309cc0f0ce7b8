//! Background poller: fetch, dedupe, notify.
//!
//! Every `FORECAST_CHECK_INTERVAL` seconds the poller fetches the zone's
//! forecast and relays it to Slack if its publish time is newer than the last
//! one relayed.
//!
//! Ordering within a cycle:
//! - the new publish time is committed to SQLite before the webhook is called
//! - a failed commit skips the webhook entirely
//! - a failed webhook call does not roll back the commit
//!
//! A crash between commit and send therefore loses one notification instead
//! of posting it twice. Each cycle is isolated: failures are logged and the
//! loop sleeps until the next interval.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::db::queries;
use crate::errors::AppError;
use crate::services::avalanche::AvalancheClient;
use crate::services::forecast::{parse_forecast, ForecastRecord};
use crate::services::slack::{build_message, SlackClient};

// ---------------------------------------------------------------------------
// Poller state (in-memory, shared via Arc<RwLock<>>)
// ---------------------------------------------------------------------------

/// Global poller state, exposed via the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PollerState {
    pub active: bool,
    pub check_interval_secs: u64,
    pub next_wakeup_at: Option<DateTime<Utc>>,
    pub last_poll_completed_at: Option<DateTime<Utc>>,
    pub last_poll_duration_ms: Option<u64>,
    pub total_polls: u64,
    /// "notified", "unchanged", "fetch_failed", "persist_failed", "notify_failed" or "pending"
    pub last_poll_result: String,
    pub last_error: Option<String>,
    /// Publish time of the last forecast committed as notified.
    pub last_published_at: Option<DateTime<Utc>>,
}

impl PollerState {
    pub fn new(check_interval_secs: u64, last_published_at: Option<DateTime<Utc>>) -> Self {
        Self {
            active: true,
            check_interval_secs,
            next_wakeup_at: None,
            last_poll_completed_at: None,
            last_poll_duration_ms: None,
            total_polls: 0,
            last_poll_result: "pending".to_string(),
            last_error: None,
            last_published_at,
        }
    }

    /// Fold a finished cycle into the state.
    pub fn record_cycle(
        &mut self,
        outcome: &CycleOutcome,
        completed_at: DateTime<Utc>,
        duration_ms: u64,
    ) {
        self.total_polls += 1;
        self.last_poll_completed_at = Some(completed_at);
        self.last_poll_duration_ms = Some(duration_ms);
        self.next_wakeup_at = i64::try_from(self.check_interval_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|interval| completed_at.checked_add_signed(interval));
        self.last_poll_result = outcome.as_str().to_string();
        self.last_error = outcome.error().map(str::to_string);

        if let Some(published) = outcome.committed_published_at() {
            self.last_published_at = Some(published);
        }
    }
}

/// Shared poller state handle.
pub type SharedPollerState = Arc<RwLock<PollerState>>;

// ---------------------------------------------------------------------------
// Cycle outcome
// ---------------------------------------------------------------------------

/// What a single poll cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// New forecast committed and posted.
    Notified { published_at: DateTime<Utc> },
    /// Forecast already relayed (same or older publish time).
    Unchanged { published_at: DateTime<Utc> },
    /// Fetch, transport or parse failure; nothing stored.
    FetchFailed(String),
    /// Freshness state could not be read or written; webhook not called.
    PersistFailed(String),
    /// Committed, but the webhook call failed. Not retried.
    NotifyFailed {
        published_at: DateTime<Utc>,
        error: String,
    },
}

impl CycleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleOutcome::Notified { .. } => "notified",
            CycleOutcome::Unchanged { .. } => "unchanged",
            CycleOutcome::FetchFailed(_) => "fetch_failed",
            CycleOutcome::PersistFailed(_) => "persist_failed",
            CycleOutcome::NotifyFailed { .. } => "notify_failed",
        }
    }

    fn error(&self) -> Option<&str> {
        match self {
            CycleOutcome::FetchFailed(e) | CycleOutcome::PersistFailed(e) => Some(e),
            CycleOutcome::NotifyFailed { error, .. } => Some(error),
            CycleOutcome::Notified { .. } | CycleOutcome::Unchanged { .. } => None,
        }
    }

    /// Publish time this cycle wrote to the freshness store, if any.
    fn committed_published_at(&self) -> Option<DateTime<Utc>> {
        match self {
            CycleOutcome::Notified { published_at }
            | CycleOutcome::NotifyFailed { published_at, .. } => Some(*published_at),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Poller context
// ---------------------------------------------------------------------------

/// Everything a cycle needs; built once at startup.
#[derive(Debug, Clone)]
pub struct PollerContext {
    pub pool: SqlitePool,
    pub source: AvalancheClient,
    pub slack: SlackClient,
    pub display_tz: Tz,
    pub message_header: String,
    pub full_forecast_url: String,
}

// ---------------------------------------------------------------------------
// Main poller loop
// ---------------------------------------------------------------------------

/// Run the poller. Never returns (runs until process exit).
pub async fn run_poller(ctx: PollerContext, state: SharedPollerState) {
    let interval_secs = state.read().await.check_interval_secs;
    tracing::info!(
        "Poller: started, checking {} every {}s",
        ctx.source.endpoint(),
        interval_secs
    );

    loop {
        let poll_start = Utc::now();
        let outcome = run_cycle(&ctx).await;
        let completed_at = Utc::now();
        let duration_ms = (completed_at - poll_start).num_milliseconds().max(0) as u64;

        state
            .write()
            .await
            .record_cycle(&outcome, completed_at, duration_ms);

        tracing::debug!(
            "Poller: cycle {} in {}ms, sleeping {}s",
            outcome.as_str(),
            duration_ms,
            interval_secs
        );

        sleep_secs(interval_secs).await;
    }
}

/// Run one fetch → check → commit → notify cycle.
///
/// Never fails: every error is logged and reported through the outcome.
pub async fn run_cycle(ctx: &PollerContext) -> CycleOutcome {
    // Step 1: Fetch and parse
    let record = match fetch_record(ctx).await {
        Ok(record) => record,
        Err(e) => {
            tracing::error!("Poller: failed to fetch the avalanche forecast: {}", e);
            return CycleOutcome::FetchFailed(e.to_string());
        }
    };
    let published_at = record.published_at().with_timezone(&Utc);

    // Step 2: Freshness check
    match queries::is_newer(&ctx.pool, published_at).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(
                "Poller: forecast published {} already relayed",
                record.published_at()
            );
            return CycleOutcome::Unchanged { published_at };
        }
        Err(e) => {
            tracing::error!("Poller: failed to read freshness state: {}", e);
            return CycleOutcome::PersistFailed(e.to_string());
        }
    }

    // Step 3: Commit before notifying
    match queries::commit_if_newer(&ctx.pool, published_at).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(
                "Poller: forecast published {} was committed concurrently, skipping",
                record.published_at()
            );
            return CycleOutcome::Unchanged { published_at };
        }
        Err(e) => {
            tracing::error!(
                "Poller: failed to record forecast published {}, not notifying: {}",
                record.published_at(),
                e
            );
            return CycleOutcome::PersistFailed(e.to_string());
        }
    }

    // Step 4: Notify
    let message = build_message(&record, &ctx.message_header, &ctx.full_forecast_url);
    match ctx.slack.post_message(&message).await {
        Ok(()) => {
            tracing::info!(
                "Poller: relayed forecast published {} by {} (danger: {})",
                record.published_at(),
                record.author(),
                record.max_current_danger()
            );
            CycleOutcome::Notified { published_at }
        }
        Err(e) => {
            tracing::error!(
                "Poller: failed to post the Slack message for forecast published {}: {}",
                record.published_at(),
                e
            );
            CycleOutcome::NotifyFailed {
                published_at,
                error: e.to_string(),
            }
        }
    }
}

async fn fetch_record(ctx: &PollerContext) -> Result<ForecastRecord, AppError> {
    let raw_json = ctx.source.fetch_forecast().await?;
    let record = parse_forecast(&raw_json, ctx.display_tz)?;
    tracing::debug!(
        "Poller: fetched forecast published {} with {} danger entries",
        record.published_at(),
        record.danger_days().len()
    );
    Ok(record)
}

/// Async sleep helper.
async fn sleep_secs(secs: u64) {
    tokio::time::sleep(std::time::Duration::from_secs(secs)).await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
