//! Preview command - what the next retraining run would see.

use anyhow::Result;
use config::Config;
use sqlx::SqlitePool;

/// Runs the preview command.
///
/// # Errors
///
/// Returns an error if the underlying queries fail.
pub async fn run(config: &Config, pool: &SqlitePool) -> Result<()> {
    let orchestrator = super::orchestrator(config, pool)?;
    let preview = orchestrator.preview().await?;

    println!("{}", serde_json::to_string_pretty(&preview)?);
    Ok(())
}
