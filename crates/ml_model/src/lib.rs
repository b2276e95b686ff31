//! ML model crate for gambling-comment classification.
//!
//! This crate uses the Burn deep learning framework (ndarray backend) to
//! define, train and run inference with a logistic-regression classifier
//! over hybrid TF-IDF features. A trained pipeline bundles the fitted
//! vectorizer with the learned weights and serializes into a
//! self-describing JSON artifact.

mod artifact;
mod classifier;
mod dataset;
mod metrics;
mod split;
mod training;

pub use artifact::ModelArtifact;
pub use classifier::GamblingClassifier;
pub use dataset::{CommentBatch, CommentBatcher};
pub use metrics::{Metrics, evaluate};
pub use split::{shuffle_indices, stratified_split};
pub use training::{Solver, TrainingConfig, fit};

use burn::backend::NdArray;
use burn::backend::ndarray::NdArrayDevice;
use feature_extractor::{HybridVectorizer, SparseVector};
use serde::Serialize;
use thiserror::Error;

/// Backend used for inference (and, wrapped in autodiff, for training).
pub type InferenceBackend = NdArray;

/// Texts per inference batch; keeps dense feature tensors bounded.
const PREDICT_CHUNK: usize = 256;

/// Errors produced while training, serializing or running the model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("insufficient training data: {available} samples (minimum: {required})")]
    InsufficientData { available: usize, required: usize },

    #[error("model backend error: {0}")]
    Backend(String),

    #[error("model artifact error: {0}")]
    Artifact(String),
}

/// Classification outcome for one text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub is_gambling: bool,
    /// Probability of the predicted class, clamped into [0, 1].
    pub confidence: f64,
}

/// A fitted vectorizer plus a trained classifier, ready to serve.
#[derive(Debug)]
pub struct TrainedPipeline {
    vectorizer: HybridVectorizer,
    classifier: GamblingClassifier<InferenceBackend>,
    device: NdArrayDevice,
}

impl TrainedPipeline {
    #[must_use]
    pub fn new(vectorizer: HybridVectorizer, classifier: GamblingClassifier<InferenceBackend>) -> Self {
        Self {
            vectorizer,
            classifier,
            device: NdArrayDevice::default(),
        }
    }

    #[must_use]
    pub fn vectorizer(&self) -> &HybridVectorizer {
        &self.vectorizer
    }

    #[must_use]
    pub fn classifier(&self) -> &GamblingClassifier<InferenceBackend> {
        &self.classifier
    }

    /// Classifies a single text.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to produce probabilities.
    pub fn predict_one(&self, text: &str) -> Result<Prediction, ModelError> {
        let predictions = self.predict(std::slice::from_ref(&text.to_string()))?;
        predictions
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::Backend("empty prediction batch".to_string()))
    }

    /// Classifies a batch of texts, one prediction per input, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to produce probabilities.
    pub fn predict(&self, texts: &[String]) -> Result<Vec<Prediction>, ModelError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let batcher =
            CommentBatcher::<InferenceBackend>::new(self.device.clone(), self.vectorizer.dim());
        let mut predictions = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(PREDICT_CHUNK) {
            let rows: Vec<SparseVector> =
                chunk.iter().map(|text| self.vectorizer.transform(text)).collect();
            let row_refs: Vec<&SparseVector> = rows.iter().collect();

            let features = batcher.features(&row_refs);
            let probabilities = self.classifier.probabilities(features)?;

            for probability in probabilities {
                let is_gambling = probability >= 0.5;
                let confidence = if is_gambling {
                    probability
                } else {
                    1.0 - probability
                };
                predictions.push(Prediction {
                    is_gambling,
                    confidence: f64::from(confidence).clamp(0.0, 1.0),
                });
            }
        }

        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_pipeline() -> TrainedPipeline {
        let config = feature_extractor::HybridVectorizerConfig::default();
        let documents = ["daftar slot gacor", "video bagus banget"];
        let vectorizer = HybridVectorizer::fit(&config, &documents);
        let dim = vectorizer.dim();

        // Positive weight on every column: any recognized text leans gambling.
        let classifier =
            GamblingClassifier::from_weights(&vec![4.0; dim], 0.0, &NdArrayDevice::default());

        TrainedPipeline::new(vectorizer, classifier)
    }

    #[test]
    fn test_predict_batch_preserves_order_and_length() {
        let pipeline = toy_pipeline();
        let texts = vec![
            "daftar slot gacor".to_string(),
            "zzzz".to_string(),
            "slot".to_string(),
        ];

        let predictions = pipeline.predict(&texts).expect("predict");
        assert_eq!(predictions.len(), texts.len());

        // Unrecognized text has an all-zero feature row: sigmoid(0) = 0.5,
        // so its confidence sits at the decision boundary.
        assert!((predictions[1].confidence - 0.5).abs() < 1e-6);
        assert!(predictions[0].confidence > predictions[1].confidence);
    }

    #[test]
    fn test_confidence_bounds() {
        let pipeline = toy_pipeline();
        let texts = vec![
            "daftar slot gacor slot gacor".to_string(),
            "video bagus".to_string(),
            String::new(),
        ];

        for prediction in pipeline.predict(&texts).expect("predict") {
            assert!((0.0..=1.0).contains(&prediction.confidence));
        }
    }

    #[test]
    fn test_predict_empty_batch() {
        let pipeline = toy_pipeline();
        assert!(pipeline.predict(&[]).expect("predict").is_empty());
    }
}
