/// Every failure the relay can hit. Variants map onto how the poll loop
/// recovers: `Fetch`/`Malformed*`/`Notify` abort or finish a cycle,
/// `Persistence` aborts before notifying, `Config` stops startup.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Forecast fetch failed: {0}")]
    Fetch(String),

    #[error("Malformed forecast: {0}")]
    MalformedForecast(String),

    #[error("Malformed timestamp: {0}")]
    MalformedTimestamp(String),

    #[error("Database error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("Notification failed: {0}")]
    Notify(String),
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Persistence(sqlx::Error::Migrate(Box::new(err)))
    }
}
