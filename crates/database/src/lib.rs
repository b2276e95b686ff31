//! Persistence layer for the comment-sentry model lifecycle.
//!
//! Exposes the SQLite pool, embedded migrations, row types and
//! repositories for scan results, validation feedback and model versions.

mod models;
mod repositories;

pub use models::{
    CreateFeedback, CreateScanResult, Feedback, ModelVersion, NewModelVersion, ScanResult,
};
pub use repositories::{FeedbackRepository, ModelVersionRepository, ScanResultRepository};

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

/// Creates a connection pool to the `SQLite` database.
///
/// In-memory URLs are pinned to a single connection: every new `:memory:`
/// connection would otherwise open its own empty database.
///
/// # Errors
///
/// Returns an error if the connection to the database fails.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

/// Runs all pending migrations.
///
/// # Errors
///
/// Returns an error if running migrations fails.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
