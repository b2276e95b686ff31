//! CLI subcommands.

pub mod predict;
pub mod preview;
pub mod retrain;
pub mod rollback;
pub mod stats;
pub mod trend;
pub mod versions;

use std::sync::Arc;

use anyhow::Context;
use comment_sentry::{
    DatasetAssembler, FeedbackStore, ModelRegistry, PredictionCore, RetrainingOrchestrator,
    TrainingPipeline,
};
use config::Config;
use feature_extractor::HybridVectorizerConfig;
use ml_model::{Solver, TrainingConfig};
use sqlx::SqlitePool;

/// Builds the training pipeline from configuration.
fn training_pipeline(config: &Config) -> anyhow::Result<TrainingPipeline> {
    let solver = Solver::from_name(&config.classifier_solver)
        .with_context(|| format!("unknown classifier solver '{}'", config.classifier_solver))?;

    Ok(TrainingPipeline::new(
        HybridVectorizerConfig {
            word_ngram: config.word_ngram,
            char_ngram: config.char_ngram,
            max_features: config.max_features,
        },
        TrainingConfig {
            learning_rate: config.learning_rate,
            epochs: config.epochs,
            batch_size: config.batch_size,
            regularization: config.classifier_c,
            solver,
            seed: 42,
        },
        config.test_fraction,
        config.min_training_samples,
    ))
}

/// Builds the prediction core over the configured artifact store.
fn prediction_core(config: &Config) -> anyhow::Result<Arc<PredictionCore>> {
    Ok(Arc::new(PredictionCore::new(
        config.artifact_store()?,
        config.default_model_path.clone(),
    )))
}

/// Builds the model registry over the configured artifact store.
fn registry(config: &Config, pool: &SqlitePool) -> anyhow::Result<ModelRegistry> {
    Ok(ModelRegistry::new(
        pool.clone(),
        config.artifact_store()?,
        config.default_model_path.clone(),
    ))
}

/// Wires the full retraining orchestrator.
fn orchestrator(config: &Config, pool: &SqlitePool) -> anyhow::Result<RetrainingOrchestrator> {
    Ok(RetrainingOrchestrator::new(
        FeedbackStore::new(pool.clone(), config.retraining_threshold),
        DatasetAssembler::new(pool.clone(), config.corpus_path.clone()),
        training_pipeline(config)?,
        registry(config, pool)?,
        prediction_core(config)?,
    ))
}
