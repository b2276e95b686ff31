use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use object_store::ObjectStore;
use object_store::local::LocalFileSystem;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL.
    pub database_url: String,

    /// Path to the base labeled corpus (CSV with `comment,label` columns).
    pub corpus_path: PathBuf,

    /// Root directory backing the artifact store.
    pub artifact_root: PathBuf,

    /// Artifact path (inside the store) the serving core falls back to on
    /// cold start. Deploys also refresh this copy.
    pub default_model_path: String,

    /// Unused-feedback count that makes automatic retraining eligible.
    pub retraining_threshold: i64,

    /// Minimum combined sample count required before training starts.
    pub min_training_samples: usize,

    /// Held-out fraction for evaluation.
    pub test_fraction: f64,

    /// Inverse regularization strength of the classifier.
    pub classifier_c: f64,

    /// Optimizer used to fit the classifier ("adam" or "sgd").
    pub classifier_solver: String,

    /// Word-level n-gram range.
    pub word_ngram: (usize, usize),

    /// Character-level n-gram range.
    pub char_ngram: (usize, usize),

    /// Vocabulary cap per vectorizer view.
    pub max_features: usize,

    /// Training epochs.
    pub epochs: usize,

    /// Training batch size.
    pub batch_size: usize,

    /// Optimizer learning rate.
    pub learning_rate: f64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults for everything that is not set.
    ///
    /// # Errors
    ///
    /// Returns an error if a set variable cannot be parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env_or_default("DATABASE_URL", "sqlite://comment_sentry.db")?,
            corpus_path: PathBuf::from(env_or_default::<String>(
                "CORPUS_PATH",
                "ml/corpus.csv",
            )?),
            artifact_root: PathBuf::from(env_or_default::<String>("ARTIFACT_ROOT", "ml")?),
            default_model_path: env_or_default(
                "DEFAULT_MODEL_PATH",
                "models/model_pipeline.json",
            )?,
            retraining_threshold: env_or_default("RETRAINING_THRESHOLD", "100")?,
            min_training_samples: env_or_default("MIN_TRAINING_SAMPLES", "100")?,
            test_fraction: env_or_default("RETRAINING_TEST_FRACTION", "0.2")?,
            classifier_c: env_or_default("CLASSIFIER_C", "10.0")?,
            classifier_solver: env_or_default("CLASSIFIER_SOLVER", "adam")?,
            word_ngram: parse_ngram(&env_or_default::<String>("WORD_NGRAM_RANGE", "1,2")?)?,
            char_ngram: parse_ngram(&env_or_default::<String>("CHAR_NGRAM_RANGE", "2,4")?)?,
            max_features: env_or_default("MAX_FEATURES", "10000")?,
            epochs: env_or_default("TRAINING_EPOCHS", "150")?,
            batch_size: env_or_default("TRAINING_BATCH_SIZE", "64")?,
            learning_rate: env_or_default("TRAINING_LEARNING_RATE", "0.05")?,
        })
    }

    /// Builds the local artifact store rooted at `artifact_root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be created or opened.
    pub fn artifact_store(&self) -> anyhow::Result<Arc<dyn ObjectStore>> {
        std::fs::create_dir_all(&self.artifact_root).with_context(|| {
            format!(
                "failed to create artifact root at {}",
                self.artifact_root.display()
            )
        })?;

        let store = LocalFileSystem::new_with_prefix(&self.artifact_root)
            .context("failed to open artifact store")?;

        Ok(Arc::new(store))
    }
}

/// Reads an environment variable, parsing it into `T`, or parses the
/// provided default when the variable is absent.
fn env_or_default<T>(key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse::<T>()
        .with_context(|| format!("failed to parse {key}={raw}"))
}

/// Parses an n-gram range of the form "lo,hi".
fn parse_ngram(raw: &str) -> anyhow::Result<(usize, usize)> {
    let (lo, hi) = raw
        .split_once(',')
        .with_context(|| format!("invalid n-gram range: {raw}"))?;

    let lo: usize = lo.trim().parse().context("invalid n-gram lower bound")?;
    let hi: usize = hi.trim().parse().context("invalid n-gram upper bound")?;

    if lo == 0 || hi < lo {
        anyhow::bail!("invalid n-gram range: {raw}");
    }

    Ok((lo, hi))
}
