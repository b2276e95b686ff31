//! Rollback command - reactivates a previous model version.

use anyhow::Result;
use config::Config;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Runs the rollback command.
///
/// # Errors
///
/// Returns an error if the target version or its artifact is missing.
pub async fn run(config: &Config, pool: &SqlitePool, version_id: Uuid) -> Result<()> {
    let registry = super::registry(config, pool)?;
    let core = super::prediction_core(config)?;

    let version = registry.rollback(version_id).await?;
    println!("Rolled back to model version {}", version.version);

    if core.hot_swap(Some(&version.file_path)).await {
        println!("Serving model hot-swapped");
    } else {
        println!("Hot swap pending; the restored model activates on next load");
    }

    Ok(())
}
