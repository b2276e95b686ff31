//! Continuous model lifecycle for the comment moderation backend.
//!
//! User corrections become training data (`feedback`), the training set is
//! assembled from a static corpus plus all feedback (`assembler`), a new
//! classifier is trained and evaluated (`training`), versioned and
//! deployed with rollback support (`registry`), and served with atomic
//! hot-swap while retraining runs in the background (`prediction`,
//! `retraining`).

pub mod assembler;
pub mod feedback;
pub mod prediction;
pub mod registry;
pub mod retraining;
pub mod training;

pub use assembler::{AssemblyError, DatasetAssembler};
pub use feedback::{BatchAction, BatchOutcome, FeedbackError, FeedbackStats, FeedbackStore};
pub use prediction::{PredictionCore, PredictionError};
pub use registry::{MetricsTrend, ModelRegistry, RegistryError};
pub use retraining::{RetrainPreview, RetrainingOrchestrator, RunOutcome, Stage, Trigger};
pub use training::TrainingPipeline;
