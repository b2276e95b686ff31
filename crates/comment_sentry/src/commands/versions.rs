//! Versions command - lists recent model versions.

use anyhow::Result;
use config::Config;
use sqlx::SqlitePool;

/// Runs the versions command.
///
/// # Errors
///
/// Returns an error if the registry query fails.
pub async fn run(config: &Config, pool: &SqlitePool, limit: i64) -> Result<()> {
    let registry = super::registry(config, pool)?;
    let versions = registry.list(limit).await?;

    if versions.is_empty() {
        println!("No model versions deployed yet");
        return Ok(());
    }

    println!(
        "{:<28} {:>8} {:>10} {:>10} {:>8}",
        "Version", "Active", "Accuracy", "F1", "Samples"
    );
    for version in versions {
        println!(
            "{:<28} {:>8} {:>10} {:>10} {:>8}",
            version.version,
            if version.is_active { "yes" } else { "no" },
            version
                .accuracy
                .map_or_else(|| "-".to_string(), |v| format!("{v:.4}")),
            version
                .f1_score
                .map_or_else(|| "-".to_string(), |v| format!("{v:.4}")),
            version.training_samples,
        );
    }

    Ok(())
}
