pub mod models;
pub mod queries;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::errors::AppError;

/// One connection: the poll loop is the only writer of the freshness row.
const DB_POOL_MAX_CONNECTIONS: u32 = 1;

/// Open (creating if needed) the SQLite state file and apply migrations.
///
/// Migrations only use `CREATE TABLE IF NOT EXISTS`, so pointing this at a
/// state file written by an earlier deployment is safe.
pub async fn connect(db_location: &str) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::new()
        .filename(db_location)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(DB_POOL_MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    sqlx::migrate!().run(&pool).await?;

    Ok(pool)
}
