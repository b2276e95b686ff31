//! Thread-safe holder of the model currently used for inference.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use ml_model::{ModelArtifact, Prediction, TrainedPipeline};
use object_store::ObjectStore;
use object_store::path::Path as ObjectPath;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Errors surfaced by the prediction core.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("model load failed: {0}")]
    ModelLoad(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Serves predictions from an exclusively-held reference to the current
/// model, safe for many concurrent readers and rare writers.
///
/// Readers take a brief critical section only to clone the `Arc`; inference
/// runs outside any lock, so an in-flight prediction always completes on
/// the reference it started with and never blocks a concurrent swap.
pub struct PredictionCore {
    store: Arc<dyn ObjectStore>,
    default_path: String,
    current: RwLock<Option<Arc<TrainedPipeline>>>,
    swap_in_progress: AtomicBool,
}

impl PredictionCore {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, default_path: String) -> Self {
        Self {
            store,
            default_path,
            current: RwLock::new(None),
            swap_in_progress: AtomicBool::new(false),
        }
    }

    /// Returns the loaded model, reading it from the artifact store on
    /// first use. Idempotent: once a model is loaded, subsequent calls
    /// return it without touching storage.
    ///
    /// # Errors
    ///
    /// `ModelLoad` if the artifact is missing or cannot be deserialized.
    pub async fn load(&self, path: Option<&str>) -> Result<Arc<TrainedPipeline>, PredictionError> {
        if let Some(model) = self.current.read().await.clone() {
            return Ok(model);
        }

        let path = path.unwrap_or(&self.default_path);
        let loaded = Arc::new(self.read_artifact(path).await?);

        let mut guard = self.current.write().await;
        if let Some(existing) = guard.as_ref() {
            // Another caller won the cold-start race; keep its model.
            return Ok(Arc::clone(existing));
        }
        *guard = Some(Arc::clone(&loaded));
        info!(path, "model loaded");

        Ok(loaded)
    }

    /// Atomically replaces the served model with one loaded from `path`
    /// (or the default path).
    ///
    /// The new model is loaded fully before shared state is touched, so a
    /// slow or failing load never affects what is currently serving.
    /// Returns `false` without side effects if the artifact is missing,
    /// fails to load, or another swap is already in progress (concurrent
    /// attempts coalesce to a no-op instead of queueing).
    pub async fn hot_swap(&self, path: Option<&str>) -> bool {
        if self
            .swap_in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("hot swap already in progress; coalescing");
            return false;
        }

        let path = path.unwrap_or(&self.default_path);
        let swapped = match self.read_artifact(path).await {
            Ok(pipeline) => {
                *self.current.write().await = Some(Arc::new(pipeline));
                info!(path, "model hot-swapped");
                true
            }
            Err(error) => {
                warn!(path, %error, "hot swap aborted; current model untouched");
                false
            }
        };

        self.swap_in_progress.store(false, Ordering::Release);
        swapped
    }

    /// Classifies a single text, lazily loading the default model if none
    /// is loaded yet.
    ///
    /// # Errors
    ///
    /// `ModelLoad` if no model is loaded and the cold-start load fails.
    pub async fn predict_one(&self, text: &str) -> Result<Prediction, PredictionError> {
        let model = self.load(None).await?;
        model
            .predict_one(text)
            .map_err(|error| PredictionError::Inference(error.to_string()))
    }

    /// Classifies a batch of texts; output length equals input length and
    /// preserves input order.
    ///
    /// # Errors
    ///
    /// `ModelLoad` if no model is loaded and the cold-start load fails.
    pub async fn predict_batch(
        &self,
        texts: &[String],
    ) -> Result<Vec<Prediction>, PredictionError> {
        let model = self.load(None).await?;
        model
            .predict(texts)
            .map_err(|error| PredictionError::Inference(error.to_string()))
    }

    /// The currently served model reference, if any.
    pub async fn current_model(&self) -> Option<Arc<TrainedPipeline>> {
        self.current.read().await.clone()
    }

    async fn read_artifact(&self, path: &str) -> Result<TrainedPipeline, PredictionError> {
        let location = ObjectPath::from(path);

        let bytes = self
            .store
            .get(&location)
            .await
            .map_err(|error| PredictionError::ModelLoad(error.to_string()))?
            .bytes()
            .await
            .map_err(|error| PredictionError::ModelLoad(error.to_string()))?;

        ModelArtifact::from_bytes(&bytes)
            .and_then(ModelArtifact::into_pipeline)
            .map_err(|error| PredictionError::ModelLoad(error.to_string()))
    }
}
