//! Database row types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One scanned comment with the prediction the model made at scan time.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScanResult {
    pub id: Uuid,
    pub comment_text: String,
    pub is_gambling: bool,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

/// A user's verdict on one scan result.
///
/// `comment_text` is a snapshot taken at submission time so upstream edits
/// or deletions cannot corrupt later training runs.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Feedback {
    pub id: Uuid,
    pub scan_result_id: Uuid,
    pub user_id: Uuid,
    pub comment_text: String,
    pub original_prediction: bool,
    pub original_confidence: f64,
    pub corrected_label: bool,
    pub is_correction: bool,
    pub validated_at: DateTime<Utc>,
    pub used_in_training: bool,
    pub model_version_id: Option<Uuid>,
}

/// One trained, deployable model artifact with its evaluation metrics.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ModelVersion {
    pub id: Uuid,
    pub version: String,
    pub file_path: String,
    pub training_samples: i64,
    pub validation_samples: i64,
    pub accuracy: Option<f64>,
    pub precision_score: Option<f64>,
    pub recall_score: Option<f64>,
    pub f1_score: Option<f64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub deactivated_at: Option<DateTime<Utc>>,
}

/// Input for creating a new scan result record.
#[derive(Debug, Clone)]
pub struct CreateScanResult {
    pub comment_text: String,
    pub is_gambling: bool,
    pub confidence: f64,
}

/// Input for creating a new feedback record.
#[derive(Debug, Clone)]
pub struct CreateFeedback {
    pub scan_result_id: Uuid,
    pub user_id: Uuid,
    pub comment_text: String,
    pub original_prediction: bool,
    pub original_confidence: f64,
    pub corrected_label: bool,
    pub is_correction: bool,
}

/// Input for registering a freshly trained model version.
#[derive(Debug, Clone)]
pub struct NewModelVersion {
    pub version: String,
    pub file_path: String,
    pub training_samples: i64,
    pub validation_samples: i64,
    pub accuracy: f64,
    pub precision_score: f64,
    pub recall_score: f64,
    pub f1_score: f64,
}
