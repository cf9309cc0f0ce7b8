use sqlx::FromRow;

/// The single freshness row: publish time of the last forecast relayed.
#[derive(Debug, Clone, FromRow)]
#[allow(dead_code)] // id populated by FromRow; the row is always keyed 1
pub struct LatestForecast {
    pub id: i64,
    /// RFC 3339 text; `NULL` only if the row was created by hand.
    pub published_time: Option<String>,
}
