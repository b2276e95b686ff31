//! Training-set assembly from the base corpus and stored feedback.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use database::FeedbackRepository;
use feature_extractor::LabeledComment;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors surfaced during dataset assembly.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("base corpus unavailable at {path}: {reason}")]
    CorpusUnavailable { path: String, reason: String },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Combines the static labeled corpus with all stored feedback into one
/// deduplicated training set.
#[derive(Debug, Clone)]
pub struct DatasetAssembler {
    pool: SqlitePool,
    corpus_path: PathBuf,
}

impl DatasetAssembler {
    #[must_use]
    pub fn new(pool: SqlitePool, corpus_path: PathBuf) -> Self {
        Self { pool, corpus_path }
    }

    /// Builds the full training set: base corpus first, then every feedback
    /// row (used and unused; the corpus is cumulative and never shrinks),
    /// deduplicated by exact comment text with the last occurrence winning.
    /// Feedback rows are appended after the corpus in submission order, so
    /// a feedback label always overrides a base-corpus label and later
    /// submissions win among feedback for the same text.
    ///
    /// # Errors
    ///
    /// `CorpusUnavailable` if the base corpus cannot be loaded; assembly is
    /// aborted entirely rather than training on a partial base set.
    pub async fn assemble(&self) -> Result<Vec<LabeledComment>, AssemblyError> {
        let corpus = self.load_corpus()?;
        let feedback = FeedbackRepository::list_all(&self.pool).await?;

        let mut order: Vec<String> = Vec::with_capacity(corpus.len() + feedback.len());
        let mut labels: HashMap<String, bool> = HashMap::with_capacity(corpus.len());

        let samples = corpus.into_iter().chain(
            feedback
                .into_iter()
                .map(|f| LabeledComment::new(f.comment_text, f.corrected_label)),
        );

        for sample in samples {
            if !labels.contains_key(&sample.text) {
                order.push(sample.text.clone());
            }
            labels.insert(sample.text, sample.label);
        }

        let dataset: Vec<LabeledComment> = order
            .into_iter()
            .map(|text| {
                let label = labels[&text];
                LabeledComment::new(text, label)
            })
            .collect();

        debug!(samples = dataset.len(), "assembled training set");
        Ok(dataset)
    }

    /// Base corpus size plus total feedback count, without deduplication.
    /// Used for previews and threshold displays; a missing corpus counts
    /// as zero here instead of failing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn total_available_samples(&self) -> Result<usize, AssemblyError> {
        let feedback = FeedbackRepository::count_all(&self.pool).await?;
        Ok(self.corpus_size() + feedback as usize)
    }

    /// Number of rows in the base corpus, or zero if it cannot be read.
    #[must_use]
    pub fn corpus_size(&self) -> usize {
        match self.load_corpus() {
            Ok(corpus) => corpus.len(),
            Err(error) => {
                warn!(%error, "base corpus not readable");
                0
            }
        }
    }

    fn load_corpus(&self) -> Result<Vec<LabeledComment>, AssemblyError> {
        let content = std::fs::read_to_string(&self.corpus_path).map_err(|error| {
            AssemblyError::CorpusUnavailable {
                path: self.corpus_path.display().to_string(),
                reason: error.to_string(),
            }
        })?;

        parse_corpus(&content).map_err(|reason| AssemblyError::CorpusUnavailable {
            path: self.corpus_path.display().to_string(),
            reason,
        })
    }

    #[must_use]
    pub fn corpus_path(&self) -> &Path {
        &self.corpus_path
    }
}

/// Parses a corpus CSV with a `comment,label` header. Labels are `1`/`true`
/// for gambling, `0`/`false` for clean.
fn parse_corpus(content: &str) -> Result<Vec<LabeledComment>, String> {
    let mut records = parse_csv(content).into_iter();

    let header = records.next().ok_or_else(|| "corpus is empty".to_string())?;
    let header: Vec<String> = header.iter().map(|f| f.trim().to_lowercase()).collect();
    if header.first().map(String::as_str) != Some("comment")
        || header.get(1).map(String::as_str) != Some("label")
    {
        return Err("corpus must have 'comment' and 'label' columns".to_string());
    }

    let mut samples = Vec::new();
    for (index, record) in records.enumerate() {
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        if record.len() < 2 {
            return Err(format!("row {} has {} column(s)", index + 2, record.len()));
        }

        let label = match record[1].trim() {
            "1" | "true" => true,
            "0" | "false" => false,
            other => return Err(format!("row {} has invalid label '{other}'", index + 2)),
        };

        samples.push(LabeledComment::new(record[0].clone(), label));
    }

    Ok(samples)
}

/// Minimal CSV reader: comma-separated fields, double-quote quoting with
/// `""` escapes, quoted fields may contain commas and newlines.
fn parse_csv(content: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    records
}
