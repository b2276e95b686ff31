//! Coordination of one retraining run: assemble, train, deploy, swap.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use database::ModelVersion;
use ml_model::{Metrics, ModelError};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::assembler::DatasetAssembler;
use crate::feedback::FeedbackStore;
use crate::prediction::PredictionCore;
use crate::registry::ModelRegistry;
use crate::training::TrainingPipeline;

/// What initiated a retraining run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Manual,
    Automatic,
}

impl Trigger {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automatic => "automatic",
        }
    }
}

/// Machine-readable stage tag of a retraining run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Idle,
    CheckingData,
    LoadingData,
    Training,
    Deploying,
    Finalizing,
    Completed,
    Failed,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::CheckingData => "checking-data",
            Self::LoadingData => "loading-data",
            Self::Training => "training",
            Self::Deploying => "deploying",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// A staged progress update. Within one run the percentage is
/// monotonically non-decreasing.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingProgress {
    pub running: bool,
    pub stage: Stage,
    pub percent: f32,
    pub message: String,
}

impl TrainingProgress {
    fn idle() -> Self {
        Self {
            running: false,
            stage: Stage::Idle,
            percent: 0.0,
            message: String::new(),
        }
    }
}

/// Structured outcome of one retraining run.
#[derive(Debug)]
pub enum RunOutcome {
    /// A new version was trained, deployed and (best-effort) hot-swapped.
    Success {
        version: ModelVersion,
        metrics: Metrics,
    },
    /// Nothing to do: an expected steady state, not a fault.
    Skipped {
        reason: String,
        total_samples: usize,
        unused_feedback: i64,
    },
    /// The run aborted; the previously active model keeps serving.
    Failed { cause: String },
}

/// Preview of what the next retraining run would see.
#[derive(Debug, Clone, Serialize)]
pub struct RetrainPreview {
    pub corpus_samples: usize,
    pub total_feedback: i64,
    pub unused_feedback: i64,
    pub corrections: i64,
    pub confirmations: i64,
    pub total_samples: usize,
    pub threshold: i64,
    pub can_retrain: bool,
    pub blocking_reason: Option<String>,
}

/// Drives the full retraining cycle and reports staged progress. Driven by
/// an external scheduler (manual trigger or periodic threshold check); the
/// currently active model keeps serving throughout.
pub struct RetrainingOrchestrator {
    feedback: FeedbackStore,
    assembler: DatasetAssembler,
    pipeline: TrainingPipeline,
    registry: ModelRegistry,
    core: Arc<PredictionCore>,
    running: AtomicBool,
    progress: watch::Sender<TrainingProgress>,
}

impl RetrainingOrchestrator {
    #[must_use]
    pub fn new(
        feedback: FeedbackStore,
        assembler: DatasetAssembler,
        pipeline: TrainingPipeline,
        registry: ModelRegistry,
        core: Arc<PredictionCore>,
    ) -> Self {
        let (progress, _) = watch::channel(TrainingProgress::idle());

        Self {
            feedback,
            assembler,
            pipeline,
            registry,
            core,
            running: AtomicBool::new(false),
            progress,
        }
    }

    /// Runs one retraining cycle. Concurrent calls coalesce: a run that
    /// finds another already in progress reports `Skipped` immediately.
    pub async fn run(&self, trigger: Trigger) -> RunOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return RunOutcome::Skipped {
                reason: "retraining already in progress".to_string(),
                total_samples: 0,
                unused_feedback: 0,
            };
        }

        info!(trigger = trigger.as_str(), "retraining run started");
        let outcome = self.run_stages().await;

        match &outcome {
            RunOutcome::Success { version, metrics } => {
                self.report(Stage::Completed, 100.0, format!("deployed {}", version.version));
                info!(
                    version = %version.version,
                    accuracy = metrics.accuracy,
                    f1 = metrics.f1,
                    "retraining run succeeded"
                );
            }
            RunOutcome::Skipped { reason, .. } => {
                self.report(Stage::Completed, 100.0, reason.clone());
                info!(reason = %reason, "retraining run skipped");
            }
            RunOutcome::Failed { cause } => {
                self.report(Stage::Failed, 100.0, cause.clone());
                error!(cause = %cause, "retraining run failed");
            }
        }

        self.progress.send_replace(TrainingProgress::idle());
        self.running.store(false, Ordering::Release);
        outcome
    }

    /// Threshold-gated entry point for automatic triggers: consults the
    /// unused-feedback count before starting a run.
    pub async fn run_automatic(&self) -> RunOutcome {
        let unused = match self.feedback.unused_count().await {
            Ok(count) => count,
            Err(error) => {
                return RunOutcome::Failed {
                    cause: error.to_string(),
                };
            }
        };

        if unused < self.feedback.threshold() {
            return RunOutcome::Skipped {
                reason: format!(
                    "unused feedback {unused} below threshold {}",
                    self.feedback.threshold()
                ),
                total_samples: 0,
                unused_feedback: unused,
            };
        }

        self.run(Trigger::Automatic).await
    }

    async fn run_stages(&self) -> RunOutcome {
        self.report(Stage::CheckingData, 5.0, "checking available training data");

        let unused_feedback = match self.feedback.unused_count().await {
            Ok(count) => count,
            Err(error) => return fail(error),
        };
        let total_samples = match self.assembler.total_available_samples().await {
            Ok(count) => count,
            Err(error) => return fail(error),
        };

        if total_samples < self.pipeline.min_samples() {
            return RunOutcome::Skipped {
                reason: format!(
                    "insufficient training data: {total_samples} samples (minimum: {})",
                    self.pipeline.min_samples()
                ),
                total_samples,
                unused_feedback,
            };
        }

        self.report(Stage::LoadingData, 15.0, "assembling training set");
        let dataset = match self.assembler.assemble().await {
            Ok(dataset) => dataset,
            // A missing or garbled corpus aborts the run entirely; training
            // never proceeds on a partial base set.
            Err(error) => return fail(error),
        };

        self.report(
            Stage::Training,
            40.0,
            format!("training on {} samples", dataset.len()),
        );
        let (trained, metrics) = match self.pipeline.train_and_evaluate(&dataset) {
            Ok(result) => result,
            Err(ModelError::InsufficientData {
                available,
                required,
            }) => {
                // Deduplication can shrink the set below the floor even
                // when the raw counts passed the pre-check.
                return RunOutcome::Skipped {
                    reason: format!(
                        "insufficient training data: {available} samples (minimum: {required})"
                    ),
                    total_samples: available,
                    unused_feedback,
                };
            }
            Err(error) => return fail(error),
        };

        self.report(Stage::Deploying, 80.0, "persisting and activating new version");
        let version = match self.registry.deploy(&trained, &metrics, None).await {
            Ok(version) => version,
            Err(error) => return fail(error),
        };

        self.report(Stage::Finalizing, 95.0, "hot-swapping serving model");
        if !self.core.hot_swap(Some(&version.file_path)).await {
            // Registry state is authoritative; serving continues on the old
            // model until the next successful load.
            warn!(
                version = %version.version,
                "hot swap deferred; new model activates on next load"
            );
        }

        RunOutcome::Success { version, metrics }
    }

    /// Latest progress snapshot.
    #[must_use]
    pub fn status(&self) -> TrainingProgress {
        self.progress.borrow().clone()
    }

    /// Subscribes to staged progress updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TrainingProgress> {
        self.progress.subscribe()
    }

    /// Whether a run is currently in progress.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Summarizes the data the next run would train on.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying queries fail.
    pub async fn preview(&self) -> anyhow::Result<RetrainPreview> {
        let corpus_samples = self.assembler.corpus_size();
        let total_feedback = self.feedback.total_count().await?;
        let unused_feedback = self.feedback.unused_count().await?;
        let (corrections, confirmations) = self.feedback.unused_breakdown().await?;
        let total_samples = corpus_samples + total_feedback as usize;

        let can_retrain = total_samples >= self.pipeline.min_samples();
        let blocking_reason = if can_retrain {
            None
        } else {
            Some(format!(
                "insufficient training data: {total_samples} samples (minimum: {})",
                self.pipeline.min_samples()
            ))
        };

        Ok(RetrainPreview {
            corpus_samples,
            total_feedback,
            unused_feedback,
            corrections,
            confirmations,
            total_samples,
            threshold: self.feedback.threshold(),
            can_retrain,
            blocking_reason,
        })
    }

    fn report(&self, stage: Stage, percent: f32, message: impl Into<String>) {
        let message = message.into();
        info!(
            stage = stage.as_str(),
            percent = f64::from(percent),
            message = %message,
            "retraining progress"
        );
        self.progress.send_replace(TrainingProgress {
            running: true,
            stage,
            percent,
            message,
        });
    }
}

fn fail(error: impl std::fmt::Display) -> RunOutcome {
    RunOutcome::Failed {
        cause: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;
    use std::path::PathBuf;

    use database::{CreateScanResult, ScanResultRepository, create_pool, run_migrations};
    use feature_extractor::HybridVectorizerConfig;
    use ml_model::{Solver, TrainingConfig};
    use object_store::ObjectStore;
    use object_store::local::LocalFileSystem;
    use sqlx::SqlitePool;
    use uuid::Uuid;

    use super::*;

    struct Harness {
        orchestrator: RetrainingOrchestrator,
        pool: SqlitePool,
        _corpus: tempfile::NamedTempFile,
        _artifacts: tempfile::TempDir,
    }

    /// Builds a full orchestrator over an in-memory database, a temp corpus
    /// of `corpus_rows` labeled samples and a temp artifact store.
    async fn harness(corpus_rows: usize, min_samples: usize, threshold: i64) -> Harness {
        let pool = create_pool("sqlite::memory:").await.expect("pool");
        run_migrations(&pool).await.expect("migrations");

        let mut corpus = tempfile::NamedTempFile::new().expect("corpus file");
        writeln!(corpus, "comment,label").expect("header");
        for i in 0..corpus_rows {
            if i % 2 == 0 {
                writeln!(corpus, "daftar slot gacor maxwin {i},1").expect("row");
            } else {
                writeln!(corpus, "makasih videonya bagus sekali {i},0").expect("row");
            }
        }
        corpus.flush().expect("flush");

        let artifacts = tempfile::tempdir().expect("artifact dir");
        let store: Arc<dyn ObjectStore> =
            Arc::new(LocalFileSystem::new_with_prefix(artifacts.path()).expect("store"));

        let feedback = FeedbackStore::new(pool.clone(), threshold);
        let assembler =
            DatasetAssembler::new(pool.clone(), PathBuf::from(corpus.path()));
        let pipeline = TrainingPipeline::new(
            HybridVectorizerConfig::default(),
            TrainingConfig {
                epochs: 30,
                batch_size: 16,
                learning_rate: 0.1,
                regularization: 10.0,
                solver: Solver::Adam,
                seed: 42,
            },
            0.2,
            min_samples,
        );
        let registry = ModelRegistry::new(
            pool.clone(),
            Arc::clone(&store),
            "models/model_pipeline.json".to_string(),
        );
        let core = Arc::new(PredictionCore::new(
            store,
            "models/model_pipeline.json".to_string(),
        ));

        Harness {
            orchestrator: RetrainingOrchestrator::new(
                feedback, assembler, pipeline, registry, core,
            ),
            pool,
            _corpus: corpus,
            _artifacts: artifacts,
        }
    }

    async fn submit_corrections(pool: &SqlitePool, count: usize) {
        let store = FeedbackStore::new(pool.clone(), 100);
        for i in 0..count {
            let scan = ScanResultRepository::create(
                pool,
                CreateScanResult {
                    comment_text: format!("link gacor terbaru {i}"),
                    is_gambling: false,
                    confidence: 0.55,
                },
            )
            .await
            .expect("scan result")
            .id;

            store
                .submit(scan, Uuid::new_v4(), false, Some(true))
                .await
                .expect("submit");
        }
    }

    #[tokio::test]
    async fn test_successful_run_deploys_and_swaps() {
        let harness = harness(40, 20, 5).await;
        submit_corrections(&harness.pool, 3).await;

        let outcome = harness.orchestrator.run(Trigger::Manual).await;
        let RunOutcome::Success { version, metrics } = outcome else {
            panic!("expected success, got {outcome:?}");
        };

        assert!(version.is_active);
        assert!(metrics.validation_samples > 0);

        // Feedback was flagged as used by the deploy.
        assert_eq!(
            harness.orchestrator.feedback.unused_count().await.expect("count"),
            0
        );

        // The serving core picked up the new model.
        let served = harness.orchestrator.core.current_model().await;
        assert!(served.is_some());

        let prediction = harness
            .orchestrator
            .core
            .predict_one("daftar slot gacor maxwin")
            .await
            .expect("predict");
        assert!(prediction.is_gambling);

        // Progress settles back to idle after the run.
        let status = harness.orchestrator.status();
        assert!(!status.running);
    }

    #[tokio::test]
    async fn test_insufficient_data_is_skipped_not_failed() {
        let harness = harness(6, 100, 5).await;

        let outcome = harness.orchestrator.run(Trigger::Manual).await;
        let RunOutcome::Skipped {
            reason,
            total_samples,
            ..
        } = outcome
        else {
            panic!("expected skipped, got {outcome:?}");
        };

        assert!(reason.contains("insufficient training data"));
        assert_eq!(total_samples, 6);

        // Nothing was deployed.
        assert!(harness.orchestrator.registry.active().await.expect("query").is_none());
    }

    #[tokio::test]
    async fn test_missing_corpus_fails_run() {
        let mut harness = harness(40, 20, 5).await;
        harness.orchestrator.assembler =
            DatasetAssembler::new(harness.pool.clone(), PathBuf::from("/nonexistent.csv"));
        // The raw-count pre-check sees feedback only, so seed enough rows to
        // get past it and exercise the assembly failure.
        submit_corrections(&harness.pool, 25).await;

        let outcome = harness.orchestrator.run(Trigger::Manual).await;
        assert!(matches!(outcome, RunOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_automatic_trigger_respects_threshold() {
        let harness = harness(40, 20, 5).await;
        submit_corrections(&harness.pool, 4).await;

        let outcome = harness.orchestrator.run_automatic().await;
        let RunOutcome::Skipped {
            unused_feedback, ..
        } = outcome
        else {
            panic!("expected skipped below threshold, got {outcome:?}");
        };
        assert_eq!(unused_feedback, 4);

        // One more correction reaches the threshold exactly.
        submit_corrections(&harness.pool, 1).await;
        let outcome = harness.orchestrator.run_automatic().await;
        assert!(matches!(outcome, RunOutcome::Success { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_runs_coalesce() {
        let harness = harness(40, 20, 5).await;

        harness.orchestrator.running.store(true, Ordering::SeqCst);
        let outcome = harness.orchestrator.run(Trigger::Manual).await;
        let RunOutcome::Skipped { reason, .. } = outcome else {
            panic!("expected skipped, got {outcome:?}");
        };
        assert!(reason.contains("already in progress"));
        harness.orchestrator.running.store(false, Ordering::SeqCst);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let harness = harness(40, 20, 5).await;
        let mut receiver = harness.orchestrator.subscribe();

        let mut seen = Vec::new();
        let outcome = {
            let run = harness.orchestrator.run(Trigger::Manual);
            tokio::pin!(run);

            loop {
                tokio::select! {
                    outcome = &mut run => break outcome,
                    changed = receiver.changed() => {
                        if changed.is_ok() {
                            let progress = receiver.borrow_and_update().clone();
                            if progress.running {
                                seen.push(progress.percent);
                            }
                        }
                    }
                }
            }
        };

        assert!(matches!(outcome, RunOutcome::Success { .. }));
        assert!(!seen.is_empty());
        for pair in seen.windows(2) {
            assert!(pair[0] <= pair[1], "progress must not decrease: {seen:?}");
        }
    }

    #[tokio::test]
    async fn test_preview_reports_counts_and_blocking_reason() {
        let harness = harness(10, 100, 5).await;
        submit_corrections(&harness.pool, 2).await;

        let preview = harness.orchestrator.preview().await.expect("preview");
        assert_eq!(preview.corpus_samples, 10);
        assert_eq!(preview.total_feedback, 2);
        assert_eq!(preview.unused_feedback, 2);
        assert_eq!(preview.corrections, 2);
        assert_eq!(preview.confirmations, 0);
        assert_eq!(preview.total_samples, 12);
        assert!(!preview.can_retrain);
        assert!(preview.blocking_reason.is_some());
    }
}
