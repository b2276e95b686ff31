//! TF-IDF n-gram vectorizers.
//!
//! A fitted vectorizer is plain data (vocabulary, IDF weights, config) and
//! serializes with serde, so a trained model artifact can carry its own
//! feature extraction and reproduce it exactly at load time.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::normalize::normalize_text;

/// A sparse feature row: (column, weight) pairs sorted by column.
pub type SparseVector = Vec<(usize, f32)>;

/// How text is decomposed into terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Analyzer {
    /// N-grams over word tokens (runs of at least two alphanumeric chars).
    Word,
    /// N-grams over the raw character sequence, spaces included.
    Char,
}

/// Configuration for one vectorizer view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizerConfig {
    pub analyzer: Analyzer,
    /// Inclusive n-gram range.
    pub ngram_range: (usize, usize),
    /// Vocabulary cap; the most frequent terms win.
    pub max_features: usize,
}

/// A fitted TF-IDF vectorizer for a single view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vectorizer {
    config: VectorizerConfig,
    /// Term to column index.
    vocabulary: HashMap<String, usize>,
    /// Smoothed inverse document frequency per column.
    idf: Vec<f32>,
}

impl Vectorizer {
    /// Learns the vocabulary and IDF weights from the given documents.
    #[must_use]
    pub fn fit(config: VectorizerConfig, documents: &[&str]) -> Self {
        let mut term_counts: HashMap<String, u64> = HashMap::new();
        let mut document_frequency: HashMap<String, u64> = HashMap::new();

        for document in documents {
            let mut seen = HashSet::new();
            for term in analyze(&config, document) {
                *term_counts.entry(term.clone()).or_insert(0) += 1;
                if seen.insert(term.clone()) {
                    *document_frequency.entry(term).or_insert(0) += 1;
                }
            }
        }

        // Keep the most frequent terms; ties break lexicographically so
        // fitting is deterministic. Column order is lexicographic.
        let mut ranked: Vec<(String, u64)> = term_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(config.max_features);

        let mut terms: Vec<String> = ranked.into_iter().map(|(term, _)| term).collect();
        terms.sort_unstable();

        let total_documents = documents.len() as f32;
        let mut vocabulary = HashMap::with_capacity(terms.len());
        let mut idf = Vec::with_capacity(terms.len());

        for (index, term) in terms.into_iter().enumerate() {
            let df = document_frequency.get(&term).copied().unwrap_or(0) as f32;
            idf.push(((1.0 + total_documents) / (1.0 + df)).ln() + 1.0);
            vocabulary.insert(term, index);
        }

        Self {
            config,
            vocabulary,
            idf,
        }
    }

    /// Transforms one document into an L2-normalized sparse TF-IDF row.
    #[must_use]
    pub fn transform(&self, document: &str) -> SparseVector {
        let mut counts: HashMap<usize, f32> = HashMap::new();
        for term in analyze(&self.config, document) {
            if let Some(&column) = self.vocabulary.get(&term) {
                *counts.entry(column).or_insert(0.0) += 1.0;
            }
        }

        let mut row: SparseVector = counts
            .into_iter()
            .map(|(column, count)| (column, count * self.idf[column]))
            .collect();

        let norm = row.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, weight) in &mut row {
                *weight /= norm;
            }
        }

        row.sort_unstable_by_key(|&(column, _)| column);
        row
    }

    /// Number of columns this view produces.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.idf.len()
    }
}

/// Configuration for the hybrid word + char vectorizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridVectorizerConfig {
    pub word_ngram: (usize, usize),
    pub char_ngram: (usize, usize),
    pub max_features: usize,
}

impl Default for HybridVectorizerConfig {
    fn default() -> Self {
        Self {
            word_ngram: (1, 2),
            char_ngram: (2, 4),
            max_features: 10_000,
        }
    }
}

/// Two independent TF-IDF views over the same normalized text, concatenated
/// into one feature space: word columns first, then char columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridVectorizer {
    word: Vectorizer,
    chars: Vectorizer,
}

impl HybridVectorizer {
    /// Fits both views on the given documents.
    #[must_use]
    pub fn fit(config: &HybridVectorizerConfig, documents: &[&str]) -> Self {
        let word = Vectorizer::fit(
            VectorizerConfig {
                analyzer: Analyzer::Word,
                ngram_range: config.word_ngram,
                max_features: config.max_features,
            },
            documents,
        );
        let chars = Vectorizer::fit(
            VectorizerConfig {
                analyzer: Analyzer::Char,
                ngram_range: config.char_ngram,
                max_features: config.max_features,
            },
            documents,
        );

        Self { word, chars }
    }

    /// Transforms one document into the concatenated sparse feature row.
    #[must_use]
    pub fn transform(&self, document: &str) -> SparseVector {
        let offset = self.word.dim();
        let mut row = self.word.transform(document);
        row.extend(
            self.chars
                .transform(document)
                .into_iter()
                .map(|(column, weight)| (column + offset, weight)),
        );
        row
    }

    /// Total number of feature columns.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.word.dim() + self.chars.dim()
    }
}

/// Produces the n-gram terms of a document under the given config.
///
/// The shared normalization runs here so that fitting and inference can
/// never disagree on preprocessing.
fn analyze(config: &VectorizerConfig, document: &str) -> Vec<String> {
    let normalized = normalize_text(document);
    let (lo, hi) = config.ngram_range;
    let mut terms = Vec::new();

    match config.analyzer {
        Analyzer::Word => {
            let tokens: Vec<&str> = normalized
                .split(|c: char| !c.is_alphanumeric())
                .filter(|token| token.chars().count() >= 2)
                .collect();

            for n in lo..=hi {
                if n == 0 || n > tokens.len() {
                    continue;
                }
                for window in tokens.windows(n) {
                    terms.push(window.join(" "));
                }
            }
        }
        Analyzer::Char => {
            let chars: Vec<char> = normalized.chars().collect();
            for n in lo..=hi {
                if n == 0 || n > chars.len() {
                    continue;
                }
                for window in chars.windows(n) {
                    terms.push(window.iter().collect());
                }
            }
        }
    }

    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_config() -> VectorizerConfig {
        VectorizerConfig {
            analyzer: Analyzer::Word,
            ngram_range: (1, 2),
            max_features: 10_000,
        }
    }

    #[test]
    fn test_word_analyzer_ngrams() {
        let terms = analyze(&word_config(), "daftar slot gacor");
        assert!(terms.contains(&"slot".to_string()));
        assert!(terms.contains(&"daftar slot".to_string()));
        assert!(terms.contains(&"slot gacor".to_string()));
        // Single-char tokens are dropped.
        let terms = analyze(&word_config(), "a slot");
        assert_eq!(terms, vec!["slot".to_string()]);
    }

    #[test]
    fn test_char_analyzer_windows() {
        let config = VectorizerConfig {
            analyzer: Analyzer::Char,
            ngram_range: (2, 3),
            max_features: 10_000,
        };
        let terms = analyze(&config, "slot");
        assert!(terms.contains(&"sl".to_string()));
        assert!(terms.contains(&"lot".to_string()));
        assert_eq!(terms.len(), 3 + 2);
    }

    #[test]
    fn test_fit_transform_basics() {
        let documents = [
            "daftar slot gacor sekarang",
            "slot online terpercaya",
            "video bagus banget",
        ];
        let vectorizer = Vectorizer::fit(word_config(), &documents);

        assert!(vectorizer.dim() > 0);
        assert!(vectorizer.vocabulary.contains_key("slot"));

        let row = vectorizer.transform("slot gacor");
        assert!(!row.is_empty());

        let norm: f32 = row.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "rows are L2-normalized");

        // Columns are sorted and within bounds.
        for pair in row.windows(2) {
            assert!(pair[0].0 < pair[1].0);
        }
        assert!(row.iter().all(|&(c, _)| c < vectorizer.dim()));
    }

    #[test]
    fn test_unseen_terms_produce_empty_row() {
        let vectorizer = Vectorizer::fit(word_config(), &["daftar slot gacor"]);
        assert!(vectorizer.transform("zzz qqq").is_empty());
    }

    #[test]
    fn test_max_features_caps_vocabulary() {
        let documents = ["one two three four five six seven eight"];
        let config = VectorizerConfig {
            analyzer: Analyzer::Word,
            ngram_range: (1, 1),
            max_features: 3,
        };
        let vectorizer = Vectorizer::fit(config, &documents);
        assert_eq!(vectorizer.dim(), 3);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let documents = ["slot gacor", "gacor maxwin", "maxwin slot"];
        let a = Vectorizer::fit(word_config(), &documents);
        let b = Vectorizer::fit(word_config(), &documents);
        assert_eq!(a.vocabulary, b.vocabulary);
        assert_eq!(a.idf, b.idf);
    }

    #[test]
    fn test_hybrid_concatenates_views() {
        let documents = ["daftar slot gacor", "komentar biasa saja"];
        let hybrid = HybridVectorizer::fit(&HybridVectorizerConfig::default(), &documents);

        assert_eq!(hybrid.dim(), hybrid.word.dim() + hybrid.chars.dim());

        let row = hybrid.transform("slot gacor");
        assert!(row.iter().any(|&(c, _)| c < hybrid.word.dim()));
        assert!(row.iter().any(|&(c, _)| c >= hybrid.word.dim()));
        assert!(row.iter().all(|&(c, _)| c < hybrid.dim()));
    }

    #[test]
    fn test_normalization_applied_at_transform() {
        let documents = ["slot gacor"];
        let vectorizer = Vectorizer::fit(word_config(), &documents);
        // Homoglyph-obfuscated input maps onto the learned vocabulary.
        assert_eq!(vectorizer.transform("ЅLОТ gacor"), vectorizer.transform("slot gacor"));
    }

    #[test]
    fn test_serde_round_trip() {
        let documents = ["daftar slot gacor", "komentar biasa"];
        let hybrid = HybridVectorizer::fit(&HybridVectorizerConfig::default(), &documents);

        let json = serde_json::to_string(&hybrid).expect("serialize");
        let restored: HybridVectorizer = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(restored.dim(), hybrid.dim());
        assert_eq!(restored.transform("slot gacor"), hybrid.transform("slot gacor"));
    }
}
