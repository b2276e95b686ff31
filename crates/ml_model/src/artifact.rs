//! Serialized model artifacts.
//!
//! An artifact is a single JSON document bundling the fitted vectorizer
//! (vocabulary, n-gram config, IDF weights) with the learned classifier
//! weights, so it is self-describing at load time: nothing outside the
//! artifact is needed to reproduce the exact serving pipeline.

use burn::backend::ndarray::NdArrayDevice;
use serde::{Deserialize, Serialize};

use crate::classifier::GamblingClassifier;
use crate::{ModelError, TrainedPipeline};

const ARTIFACT_FORMAT: u32 = 1;

/// On-disk representation of a trained pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format: u32,
    pub vectorizer: feature_extractor::HybridVectorizer,
    pub weights: Vec<f32>,
    pub bias: f32,
}

impl ModelArtifact {
    /// Captures a trained pipeline as an artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if the classifier weights cannot be read back.
    pub fn from_pipeline(pipeline: &TrainedPipeline) -> Result<Self, ModelError> {
        let (weights, bias) = pipeline.classifier().weights()?;

        Ok(Self {
            format: ARTIFACT_FORMAT,
            vectorizer: pipeline.vectorizer().clone(),
            weights,
            bias,
        })
    }

    /// Reconstructs the serving pipeline from this artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact is internally inconsistent.
    pub fn into_pipeline(self) -> Result<TrainedPipeline, ModelError> {
        if self.format != ARTIFACT_FORMAT {
            return Err(ModelError::Artifact(format!(
                "unsupported artifact format {}",
                self.format
            )));
        }
        if self.weights.len() != self.vectorizer.dim() {
            return Err(ModelError::Artifact(format!(
                "weight count {} does not match vectorizer dimension {}",
                self.weights.len(),
                self.vectorizer.dim()
            )));
        }

        let classifier =
            GamblingClassifier::from_weights(&self.weights, self.bias, &NdArrayDevice::default());

        Ok(TrainedPipeline::new(self.vectorizer, classifier))
    }

    /// Serializes the artifact to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ModelError> {
        serde_json::to_vec(self).map_err(|error| ModelError::Artifact(error.to_string()))
    }

    /// Deserializes an artifact from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid artifact document.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        serde_json::from_slice(bytes).map_err(|error| ModelError::Artifact(error.to_string()))
    }
}
