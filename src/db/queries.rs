use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{SqliteExecutor, SqlitePool};

use super::models::LatestForecast;
use crate::errors::AppError;

/// Fixed key of the single freshness row.
const LATEST_FORECAST_ID: i64 = 1;

/// Read the publish time of the last notified forecast.
///
/// `None` on first run (no row yet). Accepts a pool or a transaction.
pub async fn get_last_notified<'e, E>(executor: E) -> Result<Option<DateTime<Utc>>, AppError>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, LatestForecast>(
        "SELECT id, published_time FROM latest_forecast WHERE id = ?",
    )
    .bind(LATEST_FORECAST_ID)
    .fetch_optional(executor)
    .await?;

    row.and_then(|r| r.published_time)
        .map(|s| parse_stored_time(&s))
        .transpose()
}

/// Whether `candidate` is strictly newer than the stored publish time.
pub async fn is_newer(pool: &SqlitePool, candidate: DateTime<Utc>) -> Result<bool, AppError> {
    let stored = get_last_notified(pool).await?;
    Ok(is_newer_than(candidate, stored))
}

/// Unconditionally replace the stored publish time.
pub async fn record_notified<'e, E>(executor: E, published: DateTime<Utc>) -> Result<(), AppError>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO latest_forecast (id, published_time) VALUES (?, ?)
         ON CONFLICT(id) DO UPDATE SET published_time = excluded.published_time",
    )
    .bind(LATEST_FORECAST_ID)
    .bind(published.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    .execute(executor)
    .await?;
    Ok(())
}

/// Read, compare and store in one transaction.
///
/// Returns `true` if `candidate` was newer and is now durably committed,
/// `false` if the stored value was already equal or later (nothing written).
pub async fn commit_if_newer(pool: &SqlitePool, candidate: DateTime<Utc>) -> Result<bool, AppError> {
    let mut tx = pool.begin().await?;

    let stored = get_last_notified(&mut *tx).await?;
    if !is_newer_than(candidate, stored) {
        tx.rollback().await?;
        return Ok(false);
    }

    record_notified(&mut *tx, candidate).await?;
    tx.commit().await?;
    Ok(true)
}

/// Freshness rule: absent state is always older; equal is not newer.
pub fn is_newer_than(candidate: DateTime<Utc>, stored: Option<DateTime<Utc>>) -> bool {
    match stored {
        Some(stored) => candidate > stored,
        None => true,
    }
}

/// Parse a stored publish time.
///
/// Rows are written as RFC 3339; older state files hold Python's
/// `str(datetime)` form ("2024-01-02 07:04:00-08:00"), which is also accepted.
fn parse_stored_time(s: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z"))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            AppError::Persistence(sqlx::Error::Decode(
                format!("invalid stored published_time '{}': {}", s, e).into(),
            ))
        })
}
