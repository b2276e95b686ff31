//! Retrain command - runs one retraining cycle.

use anyhow::Result;
use comment_sentry::{RunOutcome, Trigger};
use config::Config;
use sqlx::SqlitePool;

/// Runs the retrain command.
///
/// # Errors
///
/// Returns an error if the orchestrator cannot be constructed or the run
/// fails.
pub async fn run(config: &Config, pool: &SqlitePool, auto: bool) -> Result<()> {
    let orchestrator = super::orchestrator(config, pool)?;

    let outcome = if auto {
        orchestrator.run_automatic().await
    } else {
        orchestrator.run(Trigger::Manual).await
    };

    match outcome {
        RunOutcome::Success { version, metrics } => {
            println!("Deployed model version {}", version.version);
            println!(
                "  accuracy={:.4} precision={:.4} recall={:.4} f1={:.4}",
                metrics.accuracy, metrics.precision, metrics.recall, metrics.f1
            );
            println!(
                "  trained on {} samples, evaluated on {}",
                metrics.training_samples, metrics.validation_samples
            );
            Ok(())
        }
        RunOutcome::Skipped {
            reason,
            total_samples,
            unused_feedback,
        } => {
            println!("Retraining skipped: {reason}");
            println!("  samples available: {total_samples}, unused feedback: {unused_feedback}");
            Ok(())
        }
        RunOutcome::Failed { cause } => anyhow::bail!("retraining failed: {cause}"),
    }
}
