//! Feature extractor crate for the gambling-comment classifier.
//!
//! Transforms raw comment text into ML-ready feature vectors. Two n-gram
//! views (word-level and character-level) are fitted over a shared,
//! normalized representation of the text and concatenated into one sparse
//! vector for training and inference.

mod normalize;
mod vectorizer;

pub use normalize::normalize_text;
pub use vectorizer::{
    Analyzer, HybridVectorizer, HybridVectorizerConfig, SparseVector, Vectorizer, VectorizerConfig,
};

/// One text sample with its binary label (`true` = gambling).
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledComment {
    pub text: String,
    pub label: bool,
}

impl LabeledComment {
    #[must_use]
    pub fn new(text: impl Into<String>, label: bool) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}
