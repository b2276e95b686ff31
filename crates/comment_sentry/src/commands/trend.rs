//! Trend command - metrics history across versions.

use anyhow::Result;
use config::Config;
use sqlx::SqlitePool;

/// Runs the trend command.
///
/// # Errors
///
/// Returns an error if the registry query fails.
pub async fn run(config: &Config, pool: &SqlitePool, limit: i64) -> Result<()> {
    let registry = super::registry(config, pool)?;
    let trend = registry.metrics_trend(limit).await?;

    println!("{}", serde_json::to_string_pretty(&trend)?);
    Ok(())
}
