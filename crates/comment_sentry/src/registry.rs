//! Versioned model bookkeeping: deploy, rollback, history.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use database::{ModelVersion, ModelVersionRepository, NewModelVersion};
use ml_model::{Metrics, ModelArtifact, TrainedPipeline};
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Errors surfaced by the model registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to persist model artifact: {0}")]
    Deployment(String),

    #[error("rollback target {0} not found or its artifact is missing")]
    RollbackTargetMissing(Uuid),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// One point in the metrics history.
#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    pub version: String,
    pub accuracy: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Oldest-vs-newest comparison over the trend window.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImprovementSummary {
    pub accuracy_change: Option<f64>,
    pub accuracy_percent: Option<f64>,
    pub f1_change: Option<f64>,
    pub f1_percent: Option<f64>,
}

/// Chronological metrics history plus an improvement summary.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsTrend {
    pub points: Vec<TrendPoint>,
    pub improvement: ImprovementSummary,
}

/// Tracks model versions and their activity state. Deploy and rollback are
/// the only operations that change which version is active, and both apply
/// their registry changes atomically.
pub struct ModelRegistry {
    pool: SqlitePool,
    store: Arc<dyn ObjectStore>,
    default_model_path: String,
}

impl ModelRegistry {
    #[must_use]
    pub fn new(pool: SqlitePool, store: Arc<dyn ObjectStore>, default_model_path: String) -> Self {
        Self {
            pool,
            store,
            default_model_path,
        }
    }

    /// Persists the trained artifact and registers it as the active
    /// version.
    ///
    /// The artifact write happens first; if it fails, no registry state
    /// changes and the current model stays active. The registry update then
    /// runs as one atomic unit: deactivate the previous version, activate
    /// the new one, and flag every unused feedback row as used against the
    /// new version ID.
    ///
    /// # Errors
    ///
    /// `Deployment` if the artifact cannot be serialized or written.
    pub async fn deploy(
        &self,
        pipeline: &TrainedPipeline,
        metrics: &Metrics,
        version: Option<String>,
    ) -> Result<ModelVersion, RegistryError> {
        let version = version.unwrap_or_else(generate_version);
        let file_path = format!("models/model_{version}.json");

        let bytes = ModelArtifact::from_pipeline(pipeline)
            .and_then(|artifact| artifact.to_bytes())
            .map_err(|error| RegistryError::Deployment(error.to_string()))?;

        self.store
            .put(&ObjectPath::from(file_path.as_str()), PutPayload::from(bytes.clone()))
            .await
            .map_err(|error| RegistryError::Deployment(error.to_string()))?;

        let (row, flagged) = ModelVersionRepository::deploy(
            &self.pool,
            NewModelVersion {
                version,
                file_path,
                training_samples: metrics.training_samples,
                validation_samples: metrics.validation_samples,
                accuracy: metrics.accuracy,
                precision_score: metrics.precision,
                recall_score: metrics.recall,
                f1_score: metrics.f1,
            },
        )
        .await?;

        // Refresh the cold-start copy so a restarted serving process picks
        // up the new model. Best-effort: the versioned artifact is already
        // durable and registry state is authoritative.
        if let Err(error) = self
            .store
            .put(
                &ObjectPath::from(self.default_model_path.as_str()),
                PutPayload::from(bytes),
            )
            .await
        {
            warn!(%error, "failed to refresh default model copy");
        }

        info!(version = %row.version, feedback_flagged = flagged, "model deployed");
        Ok(row)
    }

    /// Reactivates a previously deployed version.
    ///
    /// A registry-state change only: feedback usage flags are untouched
    /// because rollback is not a retraining event.
    ///
    /// # Errors
    ///
    /// `RollbackTargetMissing` if the version ID is unknown or its artifact
    /// no longer exists; the current active model is left untouched.
    pub async fn rollback(&self, target_id: Uuid) -> Result<ModelVersion, RegistryError> {
        let target = ModelVersionRepository::find_by_id(&self.pool, target_id)
            .await?
            .ok_or(RegistryError::RollbackTargetMissing(target_id))?;

        self.store
            .head(&ObjectPath::from(target.file_path.as_str()))
            .await
            .map_err(|_| RegistryError::RollbackTargetMissing(target_id))?;

        let row = ModelVersionRepository::rollback(&self.pool, target_id)
            .await?
            .ok_or(RegistryError::RollbackTargetMissing(target_id))?;

        info!(version = %row.version, "rolled back to previous version");
        Ok(row)
    }

    /// The currently active version, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn active(&self) -> Result<Option<ModelVersion>, RegistryError> {
        Ok(ModelVersionRepository::find_active(&self.pool).await?)
    }

    /// Recent versions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn list(&self, limit: i64) -> Result<Vec<ModelVersion>, RegistryError> {
        Ok(ModelVersionRepository::list(&self.pool, limit).await?)
    }

    /// Chronological metrics history over the most recent `limit` versions,
    /// with an oldest-vs-newest improvement summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn metrics_trend(&self, limit: i64) -> Result<MetricsTrend, RegistryError> {
        let mut versions = ModelVersionRepository::list(&self.pool, limit).await?;
        versions.reverse();

        let points: Vec<TrendPoint> = versions
            .iter()
            .map(|v| TrendPoint {
                version: v.version.clone(),
                accuracy: v.accuracy,
                precision: v.precision_score,
                recall: v.recall_score,
                f1: v.f1_score,
                created_at: v.created_at,
            })
            .collect();

        let mut improvement = ImprovementSummary::default();
        if let (Some(first), Some(last)) = (versions.first(), versions.last())
            && versions.len() >= 2
        {
            if let (Some(old), Some(new)) = (first.accuracy, last.accuracy) {
                improvement.accuracy_change = Some(new - old);
                improvement.accuracy_percent =
                    Some(if old > 0.0 { (new - old) / old * 100.0 } else { 0.0 });
            }
            if let (Some(old), Some(new)) = (first.f1_score, last.f1_score) {
                improvement.f1_change = Some(new - old);
                improvement.f1_percent =
                    Some(if old > 0.0 { (new - old) / old * 100.0 } else { 0.0 });
            }
        }

        Ok(MetricsTrend {
            points,
            improvement,
        })
    }

    #[must_use]
    pub fn default_model_path(&self) -> &str {
        &self.default_model_path
    }
}

/// Timestamp-based version string with a random suffix so two deploys in
/// the same second cannot collide.
fn generate_version() -> String {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("v{timestamp}_{}", &suffix[..8])
}
