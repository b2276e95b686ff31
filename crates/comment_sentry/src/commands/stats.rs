//! Stats command - feedback statistics.

use anyhow::Result;
use comment_sentry::FeedbackStore;
use config::Config;
use sqlx::SqlitePool;

/// Runs the stats command.
///
/// # Errors
///
/// Returns an error if the underlying queries fail.
pub async fn run(config: &Config, pool: &SqlitePool) -> Result<()> {
    let store = FeedbackStore::new(pool.clone(), config.retraining_threshold);
    let stats = store.stats().await?;

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
