//! Building, fitting and evaluating candidate models.

use feature_extractor::{HybridVectorizer, HybridVectorizerConfig, LabeledComment, SparseVector};
use ml_model::{Metrics, ModelError, TrainedPipeline, TrainingConfig, evaluate, stratified_split};
use tracing::info;

/// Seed for the train/test split; fixed so evaluation is reproducible
/// across runs on the same dataset.
const SPLIT_SEED: u64 = 42;

/// An untrained model: vectorizer and classifier configuration, ready to
/// be fitted on a dataset.
#[derive(Debug, Clone)]
pub struct UntrainedPipeline {
    vectorizer: HybridVectorizerConfig,
    training: TrainingConfig,
}

impl UntrainedPipeline {
    /// Fits the vectorizer and classifier on the given samples.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails.
    pub fn fit(&self, samples: &[&LabeledComment]) -> Result<TrainedPipeline, ModelError> {
        let texts: Vec<&str> = samples.iter().map(|s| s.text.as_str()).collect();
        let labels: Vec<bool> = samples.iter().map(|s| s.label).collect();

        let vectorizer = HybridVectorizer::fit(&self.vectorizer, &texts);
        let rows: Vec<SparseVector> =
            texts.iter().map(|text| vectorizer.transform(text)).collect();

        let classifier = ml_model::fit(&rows, &labels, vectorizer.dim(), &self.training)?;

        Ok(TrainedPipeline::new(vectorizer, classifier))
    }
}

/// Builds candidate models and evaluates them on a held-out split.
#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    vectorizer: HybridVectorizerConfig,
    training: TrainingConfig,
    test_fraction: f64,
    min_samples: usize,
}

impl TrainingPipeline {
    #[must_use]
    pub fn new(
        vectorizer: HybridVectorizerConfig,
        training: TrainingConfig,
        test_fraction: f64,
        min_samples: usize,
    ) -> Self {
        Self {
            vectorizer,
            training,
            test_fraction,
            min_samples,
        }
    }

    /// Constructs the untrained vectorizer + classifier combination.
    #[must_use]
    pub fn build(&self) -> UntrainedPipeline {
        UntrainedPipeline {
            vectorizer: self.vectorizer.clone(),
            training: self.training.clone(),
        }
    }

    /// Splits the dataset (stratified, deterministic seed), fits on the
    /// train split and computes metrics on the held-out split.
    ///
    /// # Errors
    ///
    /// `InsufficientData` if the dataset is below the minimum-sample floor;
    /// the check runs before any expensive fitting.
    pub fn train_and_evaluate(
        &self,
        dataset: &[LabeledComment],
    ) -> Result<(TrainedPipeline, Metrics), ModelError> {
        if dataset.len() < self.min_samples {
            return Err(ModelError::InsufficientData {
                available: dataset.len(),
                required: self.min_samples,
            });
        }

        let labels: Vec<bool> = dataset.iter().map(|s| s.label).collect();
        let (train_indices, test_indices) =
            stratified_split(&labels, self.test_fraction, SPLIT_SEED);

        let train: Vec<&LabeledComment> = train_indices.iter().map(|&i| &dataset[i]).collect();
        info!(
            train = train.len(),
            test = test_indices.len(),
            "fitting candidate model"
        );

        let trained = self.build().fit(&train)?;

        let test_texts: Vec<String> =
            test_indices.iter().map(|&i| dataset[i].text.clone()).collect();
        let truth: Vec<bool> = test_indices.iter().map(|&i| dataset[i].label).collect();

        let predicted: Vec<bool> = trained
            .predict(&test_texts)?
            .into_iter()
            .map(|p| p.is_gambling)
            .collect();

        let metrics = evaluate(&truth, &predicted, train.len());
        info!(
            accuracy = metrics.accuracy,
            f1 = metrics.f1,
            "candidate model evaluated"
        );

        Ok((trained, metrics))
    }

    #[must_use]
    pub fn min_samples(&self) -> usize {
        self.min_samples
    }
}
