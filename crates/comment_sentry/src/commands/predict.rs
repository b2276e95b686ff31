//! Predict command - classifies comments with the active model.

use anyhow::Result;
use config::Config;

/// Runs the predict command.
///
/// # Errors
///
/// Returns an error if no model can be loaded.
pub async fn run(config: &Config, texts: &[String]) -> Result<()> {
    let core = super::prediction_core(config)?;
    let predictions = core.predict_batch(texts).await?;

    for (text, prediction) in texts.iter().zip(&predictions) {
        let label = if prediction.is_gambling {
            "gambling"
        } else {
            "clean"
        };
        println!("{label:>8}  {:.4}  {text}", prediction.confidence);
    }

    Ok(())
}
