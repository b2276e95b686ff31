//! Evaluation metrics for binary classification.

use serde::Serialize;

/// Evaluation metrics for one trained model.
#[derive(Debug, Clone, Serialize)]
pub struct Metrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Samples the classifier was fitted on.
    pub training_samples: i64,
    /// Held-out samples the metrics were computed on.
    pub validation_samples: i64,
}

/// Computes accuracy, precision, recall and F1 for predicted labels.
///
/// Label skew is expected in adversarial-content detection, so a class
/// absent from the predictions yields 0 for the affected metric instead of
/// a division error.
#[must_use]
pub fn evaluate(truth: &[bool], predicted: &[bool], training_samples: usize) -> Metrics {
    debug_assert_eq!(truth.len(), predicted.len());

    let mut true_positives = 0u64;
    let mut false_positives = 0u64;
    let mut false_negatives = 0u64;
    let mut correct = 0u64;

    for (&actual, &guess) in truth.iter().zip(predicted) {
        if actual == guess {
            correct += 1;
        }
        match (actual, guess) {
            (true, true) => true_positives += 1,
            (false, true) => false_positives += 1,
            (true, false) => false_negatives += 1,
            (false, false) => {}
        }
    }

    let accuracy = safe_ratio(correct, truth.len() as u64);
    let precision = safe_ratio(true_positives, true_positives + false_positives);
    let recall = safe_ratio(true_positives, true_positives + false_negatives);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Metrics {
        accuracy,
        precision,
        recall,
        f1,
        training_samples: training_samples as i64,
        validation_samples: truth.len() as i64,
    }
}

fn safe_ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
