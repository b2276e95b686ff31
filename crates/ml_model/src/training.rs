//! Training loop for the gambling classifier.

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use burn::module::AutodiffModule;
use burn::nn::loss::{MseLoss, Reduction};
use burn::optim::{AdamConfig, GradientsParams, Optimizer, SgdConfig};
use burn::tensor::activation::sigmoid;
use feature_extractor::SparseVector;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::GamblingClassifier;
use crate::dataset::CommentBatcher;
use crate::split::shuffle_indices;
use crate::{InferenceBackend, ModelError};

type TrainBackend = Autodiff<NdArray>;

/// Optimizer choice for fitting the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Solver {
    Adam,
    Sgd,
}

impl Solver {
    /// Parses a solver name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "adam" => Some(Self::Adam),
            "sgd" => Some(Self::Sgd),
            _ => None,
        }
    }
}

/// Configuration for training the classifier.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Learning rate for the optimizer.
    pub learning_rate: f64,
    /// Number of training epochs.
    pub epochs: usize,
    /// Batch size for training.
    pub batch_size: usize,
    /// Inverse regularization strength; larger means weaker L2 penalty.
    pub regularization: f64,
    /// Optimizer used to fit the weights.
    pub solver: Solver,
    /// Seed for the per-epoch shuffle.
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.05,
            epochs: 150,
            batch_size: 64,
            regularization: 10.0,
            solver: Solver::Adam,
            seed: 42,
        }
    }
}

/// Fits a classifier on sparse feature rows.
///
/// # Errors
///
/// Returns an error if no rows are provided or the backend fails.
pub fn fit(
    rows: &[SparseVector],
    labels: &[bool],
    dim: usize,
    config: &TrainingConfig,
) -> Result<GamblingClassifier<InferenceBackend>, ModelError> {
    if rows.is_empty() {
        return Err(ModelError::InsufficientData {
            available: 0,
            required: 1,
        });
    }

    let device = NdArrayDevice::default();
    let model = GamblingClassifier::<TrainBackend>::new(&device, dim);
    let batcher = CommentBatcher::<TrainBackend>::new(device, dim);

    let trained = match config.solver {
        Solver::Adam => run_epochs(model, AdamConfig::new().init(), &batcher, rows, labels, config),
        Solver::Sgd => run_epochs(model, SgdConfig::new().init(), &batcher, rows, labels, config),
    }?;

    Ok(trained.valid())
}

/// Runs the epoch loop with the chosen optimizer.
fn run_epochs<O>(
    mut model: GamblingClassifier<TrainBackend>,
    mut optimizer: O,
    batcher: &CommentBatcher<TrainBackend>,
    rows: &[SparseVector],
    labels: &[bool],
    config: &TrainingConfig,
) -> Result<GamblingClassifier<TrainBackend>, ModelError>
where
    O: Optimizer<GamblingClassifier<TrainBackend>, TrainBackend>,
{
    let sample_count = rows.len();
    let loss_fn = MseLoss::new();
    // L2 penalty scaled so C behaves like an inverse regularization strength
    // relative to the mean per-sample loss.
    let penalty = (1.0 / (config.regularization * sample_count as f64)) as f32;
    let batch_size = config.batch_size.max(1);

    for epoch in 0..config.epochs {
        let mut indices: Vec<usize> = (0..sample_count).collect();
        shuffle_indices(&mut indices, config.seed.wrapping_add(epoch as u64));

        let mut epoch_loss = 0.0f64;
        let mut batch_count = 0usize;

        for chunk in indices.chunks(batch_size) {
            let batch_rows: Vec<&SparseVector> = chunk.iter().map(|&i| &rows[i]).collect();
            let batch_labels: Vec<bool> = chunk.iter().map(|&i| labels[i]).collect();
            let batch = batcher.batch(&batch_rows, &batch_labels);

            let probabilities = sigmoid(model.forward(batch.features));
            let data_loss = loss_fn.forward(probabilities, batch.targets, Reduction::Mean);
            let l2 = model
                .linear
                .weight
                .val()
                .powf_scalar(2.0)
                .sum()
                .mul_scalar(penalty);
            let loss = data_loss + l2;

            let loss_value: f32 = loss
                .clone()
                .into_data()
                .to_vec()
                .unwrap_or_else(|_| vec![0.0])
                .first()
                .copied()
                .unwrap_or(0.0);
            epoch_loss += f64::from(loss_value);
            batch_count += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(config.learning_rate, model, grads);
        }

        if epoch % 25 == 0 || epoch + 1 == config.epochs {
            let mean_loss = if batch_count > 0 {
                epoch_loss / batch_count as f64
            } else {
                0.0
            };
            debug!(epoch = epoch + 1, loss = mean_loss, "training progress");
        }
    }

    Ok(model)
}
