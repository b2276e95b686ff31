//! The logistic-regression classifier.

use burn::module::Param;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::sigmoid;

use crate::ModelError;

/// A binary classifier over TF-IDF features: a single linear layer whose
/// sigmoid output is the probability of the gambling class.
#[derive(Module, Debug)]
pub struct GamblingClassifier<B: Backend> {
    pub linear: Linear<B>,
}

impl<B: Backend> GamblingClassifier<B> {
    /// Creates a fresh, untrained classifier for the given feature count.
    pub fn new(device: &B::Device, input_dim: usize) -> Self {
        Self {
            linear: LinearConfig::new(input_dim, 1).init(device),
        }
    }

    /// Rebuilds a classifier from a flat weight vector and bias.
    pub fn from_weights(weights: &[f32], bias: f32, device: &B::Device) -> Self {
        let dim = weights.len();
        let weight = Tensor::<B, 1>::from_floats(weights, device).reshape([dim, 1]);
        let bias = Tensor::<B, 1>::from_floats([bias].as_slice(), device);

        Self {
            linear: Linear {
                weight: Param::from_tensor(weight),
                bias: Some(Param::from_tensor(bias)),
            },
        }
    }

    /// Forward pass.
    ///
    /// # Arguments
    ///
    /// * `input` - Tensor of shape [`batch_size`, `input_dim`]
    ///
    /// # Returns
    ///
    /// Tensor of shape [`batch_size`, 1] containing raw logits.
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        self.linear.forward(input)
    }

    /// Gambling-class probabilities for a feature batch.
    ///
    /// # Errors
    ///
    /// Returns an error if tensor data cannot be read back from the backend.
    pub fn probabilities(&self, input: Tensor<B, 2>) -> Result<Vec<f32>, ModelError> {
        sigmoid(self.forward(input))
            .into_data()
            .to_vec::<f32>()
            .map_err(|error| ModelError::Backend(format!("{error:?}")))
    }

    /// Extracts the learned weights and bias as plain floats.
    ///
    /// # Errors
    ///
    /// Returns an error if tensor data cannot be read back from the backend.
    pub fn weights(&self) -> Result<(Vec<f32>, f32), ModelError> {
        let weights = self
            .linear
            .weight
            .val()
            .into_data()
            .to_vec::<f32>()
            .map_err(|error| ModelError::Backend(format!("{error:?}")))?;

        let bias = match &self.linear.bias {
            Some(bias) => bias
                .val()
                .into_data()
                .to_vec::<f32>()
                .map_err(|error| ModelError::Backend(format!("{error:?}")))?
                .first()
                .copied()
                .unwrap_or(0.0),
            None => 0.0,
        };

        Ok((weights, bias))
    }

    /// Number of input features the classifier expects.
    pub fn input_dim(&self) -> usize {
        self.linear.weight.val().dims()[0]
    }
}
