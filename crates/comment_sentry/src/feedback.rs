//! User validation feedback against prior predictions.

use chrono::{Duration, Utc};
use database::{CreateFeedback, Feedback, FeedbackRepository, ScanResultRepository};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Seconds after submission during which a feedback can still be retracted.
pub const UNDO_WINDOW_SECONDS: i64 = 5;

/// Errors surfaced by the feedback store.
#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("scan result {0} not found")]
    ItemNotFound(Uuid),

    #[error("corrected_label is required when the prediction is not confirmed")]
    MissingCorrectedLabel,

    #[error("feedback {0} not found for user")]
    NotFound(Uuid),

    #[error("undo window of {UNDO_WINDOW_SECONDS} seconds has expired")]
    WindowExpired,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Batch action applied to a set of scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchAction {
    /// Confirm every prediction as correct.
    ConfirmAll,
    /// Force-label every item as gambling.
    MarkGambling,
    /// Force-label every item as clean.
    MarkClean,
}

/// Per-item outcome of a batch submission.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItemOutcome {
    pub scan_result_id: Uuid,
    pub feedback_id: Option<Uuid>,
    pub error: Option<String>,
}

/// Result of a batch submission; items fail independently and the batch
/// never rolls back on a single failure.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub total_submitted: usize,
    pub successful: usize,
    pub failed: usize,
    pub items: Vec<BatchItemOutcome>,
}

/// Aggregate feedback statistics for the operator surface.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackStats {
    pub total_validated: i64,
    pub corrections_made: i64,
    pub pending_for_training: i64,
    pub threshold: i64,
    /// `pending / threshold` as a percentage, capped at 100.
    pub progress_percent: f64,
}

/// Persists user corrections and confirmations, enforcing the undo window
/// and one feedback per (scan result, user).
#[derive(Debug, Clone)]
pub struct FeedbackStore {
    pool: SqlitePool,
    threshold: i64,
}

impl FeedbackStore {
    #[must_use]
    pub fn new(pool: SqlitePool, threshold: i64) -> Self {
        Self { pool, threshold }
    }

    /// Records a user's verdict on one scan result.
    ///
    /// Confirmations take the item's original prediction as the corrected
    /// label. Corrections must carry an explicit label. `is_correction` is
    /// derived from whether the final label disagrees with the original
    /// prediction. Resubmitting for the same (item, user) overwrites the
    /// existing row in place and resets its training flags: a stale verdict
    /// must not silently count as already trained on.
    ///
    /// # Errors
    ///
    /// `ItemNotFound` if the scan result does not exist,
    /// `MissingCorrectedLabel` if a non-confirmation carries no label.
    pub async fn submit(
        &self,
        scan_result_id: Uuid,
        user_id: Uuid,
        confirmed: bool,
        corrected_label: Option<bool>,
    ) -> Result<Feedback, FeedbackError> {
        let item = ScanResultRepository::find_by_id(&self.pool, scan_result_id)
            .await?
            .ok_or(FeedbackError::ItemNotFound(scan_result_id))?;

        let final_label = if confirmed {
            item.is_gambling
        } else {
            corrected_label.ok_or(FeedbackError::MissingCorrectedLabel)?
        };
        let is_correction = final_label != item.is_gambling;

        let existing =
            FeedbackRepository::find_by_result_and_user(&self.pool, scan_result_id, user_id)
                .await?;

        let feedback = match existing {
            Some(existing) => {
                debug!(feedback_id = %existing.id, "overwriting existing feedback");
                FeedbackRepository::overwrite(&self.pool, existing.id, final_label, is_correction)
                    .await?
            }
            None => {
                FeedbackRepository::create(
                    &self.pool,
                    CreateFeedback {
                        scan_result_id,
                        user_id,
                        comment_text: item.comment_text,
                        original_prediction: item.is_gambling,
                        original_confidence: item.confidence,
                        corrected_label: final_label,
                        is_correction,
                    },
                )
                .await?
            }
        };

        Ok(feedback)
    }

    /// Deletes a feedback within the undo window.
    ///
    /// The window is checked against wall-clock time at call time, so a
    /// feedback becomes permanent deterministically.
    ///
    /// # Errors
    ///
    /// `NotFound` if no such feedback belongs to the user,
    /// `WindowExpired` once more than the undo window has elapsed.
    pub async fn undo(&self, feedback_id: Uuid, user_id: Uuid) -> Result<(), FeedbackError> {
        let feedback = FeedbackRepository::find_by_id_and_user(&self.pool, feedback_id, user_id)
            .await?
            .ok_or(FeedbackError::NotFound(feedback_id))?;

        let elapsed = Utc::now().signed_duration_since(feedback.validated_at);
        if elapsed > Duration::seconds(UNDO_WINDOW_SECONDS) {
            return Err(FeedbackError::WindowExpired);
        }

        FeedbackRepository::delete(&self.pool, feedback_id).await?;
        info!(%feedback_id, "feedback undone");

        Ok(())
    }

    /// Applies one action to each scan result independently; individual
    /// failures are reported per item.
    pub async fn batch_submit(
        &self,
        scan_result_ids: &[Uuid],
        user_id: Uuid,
        action: BatchAction,
    ) -> BatchOutcome {
        let mut items = Vec::with_capacity(scan_result_ids.len());
        let mut successful = 0;
        let mut failed = 0;

        for &scan_result_id in scan_result_ids {
            let result = match action {
                BatchAction::ConfirmAll => {
                    self.submit(scan_result_id, user_id, true, None).await
                }
                BatchAction::MarkGambling => {
                    self.submit(scan_result_id, user_id, false, Some(true)).await
                }
                BatchAction::MarkClean => {
                    self.submit(scan_result_id, user_id, false, Some(false)).await
                }
            };

            match result {
                Ok(feedback) => {
                    successful += 1;
                    items.push(BatchItemOutcome {
                        scan_result_id,
                        feedback_id: Some(feedback.id),
                        error: None,
                    });
                }
                Err(error) => {
                    failed += 1;
                    items.push(BatchItemOutcome {
                        scan_result_id,
                        feedback_id: None,
                        error: Some(error.to_string()),
                    });
                }
            }
        }

        BatchOutcome {
            total_submitted: scan_result_ids.len(),
            successful,
            failed,
            items,
        }
    }

    /// Count of feedback not yet used in training.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn unused_count(&self) -> Result<i64, FeedbackError> {
        Ok(FeedbackRepository::count_unused(&self.pool).await?)
    }

    /// Count of all feedback, used and unused.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn total_count(&self) -> Result<i64, FeedbackError> {
        Ok(FeedbackRepository::count_all(&self.pool).await?)
    }

    /// Pending feedback broken down into (corrections, confirmations).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn unused_breakdown(&self) -> Result<(i64, i64), FeedbackError> {
        Ok(FeedbackRepository::unused_breakdown(&self.pool).await?)
    }

    /// Whether the unused-feedback count has reached the retraining
    /// threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn threshold_reached(&self) -> Result<bool, FeedbackError> {
        Ok(self.unused_count().await? >= self.threshold)
    }

    /// Aggregate statistics for the operator surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn stats(&self) -> Result<FeedbackStats, FeedbackError> {
        let total_validated = FeedbackRepository::count_all(&self.pool).await?;
        let corrections_made = FeedbackRepository::count_corrections(&self.pool).await?;
        let pending_for_training = FeedbackRepository::count_unused(&self.pool).await?;

        let progress_percent = if self.threshold > 0 {
            ((pending_for_training as f64 / self.threshold as f64) * 100.0).min(100.0)
        } else {
            0.0
        };

        Ok(FeedbackStats {
            total_validated,
            corrections_made,
            pending_for_training,
            threshold: self.threshold,
            progress_percent,
        })
    }

    #[must_use]
    pub fn threshold(&self) -> i64 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use database::{CreateScanResult, create_pool, run_migrations};

    use super::*;

    async fn test_store() -> FeedbackStore {
        let pool = create_pool("sqlite::memory:").await.expect("pool");
        run_migrations(&pool).await.expect("migrations");
        FeedbackStore::new(pool, 100)
    }

    async fn seed_item(store: &FeedbackStore, text: &str, is_gambling: bool) -> Uuid {
        ScanResultRepository::create(
            &store.pool,
            CreateScanResult {
                comment_text: text.to_string(),
                is_gambling,
                confidence: 0.8,
            },
        )
        .await
        .expect("scan result")
        .id
    }

    async fn backdate(store: &FeedbackStore, feedback_id: Uuid, seconds: i64) {
        sqlx::query("UPDATE validation_feedback SET validated_at = ? WHERE id = ?")
            .bind(Utc::now() - Duration::seconds(seconds))
            .bind(feedback_id)
            .execute(&store.pool)
            .await
            .expect("backdate");
    }

    #[tokio::test]
    async fn test_confirmation_snapshots_prediction() {
        let store = test_store().await;
        let item = seed_item(&store, "daftar slot gacor", true).await;
        let user = Uuid::new_v4();

        let feedback = store.submit(item, user, true, None).await.expect("submit");

        assert!(feedback.corrected_label);
        assert!(!feedback.is_correction);
        assert!(feedback.original_prediction);
        assert_eq!(feedback.comment_text, "daftar slot gacor");
        assert!(!feedback.used_in_training);
    }

    #[tokio::test]
    async fn test_correction_requires_label() {
        let store = test_store().await;
        let item = seed_item(&store, "subtle spam", true).await;
        let user = Uuid::new_v4();

        let missing = store.submit(item, user, false, None).await;
        assert!(matches!(missing, Err(FeedbackError::MissingCorrectedLabel)));

        let feedback = store
            .submit(item, user, false, Some(false))
            .await
            .expect("submit");
        assert!(!feedback.corrected_label);
        assert!(feedback.is_correction);
    }

    #[tokio::test]
    async fn test_is_correction_is_derived() {
        let store = test_store().await;
        let item = seed_item(&store, "borderline", false).await;
        let user = Uuid::new_v4();

        // An unconfirmed submission that agrees with the prediction is not
        // a correction.
        let feedback = store
            .submit(item, user, false, Some(false))
            .await
            .expect("submit");
        assert!(!feedback.is_correction);
        assert_eq!(feedback.corrected_label, feedback.original_prediction);
    }

    #[tokio::test]
    async fn test_unknown_item_is_rejected() {
        let store = test_store().await;
        let result = store.submit(Uuid::new_v4(), Uuid::new_v4(), true, None).await;
        assert!(matches!(result, Err(FeedbackError::ItemNotFound(_))));
    }

    #[tokio::test]
    async fn test_resubmit_overwrites_in_place() {
        let store = test_store().await;
        let item = seed_item(&store, "free bonus", true).await;
        let user = Uuid::new_v4();

        let first = store.submit(item, user, true, None).await.expect("submit");

        // Simulate a deploy having consumed the feedback.
        sqlx::query(
            "UPDATE validation_feedback SET used_in_training = 1 WHERE id = ?",
        )
        .bind(first.id)
        .execute(&store.pool)
        .await
        .expect("flag");

        let second = store
            .submit(item, user, false, Some(false))
            .await
            .expect("resubmit");

        assert_eq!(second.id, first.id, "overwritten in place");
        assert!(!second.used_in_training, "training flag reset");
        assert!(second.is_correction);
        assert_eq!(store.total_count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn test_undo_inside_window() {
        let store = test_store().await;
        let item = seed_item(&store, "spin now", true).await;
        let user = Uuid::new_v4();

        let feedback = store.submit(item, user, true, None).await.expect("submit");
        store.undo(feedback.id, user).await.expect("undo");

        assert_eq!(store.total_count().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn test_undo_at_exact_window_boundary() {
        let store = test_store().await;
        let item = seed_item(&store, "spin now", true).await;
        let user = Uuid::new_v4();

        let feedback = store.submit(item, user, true, None).await.expect("submit");
        backdate(&store, feedback.id, UNDO_WINDOW_SECONDS).await;

        // Exactly at the boundary still succeeds; the window is inclusive.
        store.undo(feedback.id, user).await.expect("undo at boundary");
    }

    #[tokio::test]
    async fn test_undo_after_window_expires() {
        let store = test_store().await;
        let item = seed_item(&store, "spin now", true).await;
        let user = Uuid::new_v4();

        let feedback = store.submit(item, user, true, None).await.expect("submit");
        backdate(&store, feedback.id, UNDO_WINDOW_SECONDS + 2).await;

        let result = store.undo(feedback.id, user).await;
        assert!(matches!(result, Err(FeedbackError::WindowExpired)));
        assert_eq!(store.total_count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn test_undo_requires_owning_user() {
        let store = test_store().await;
        let item = seed_item(&store, "spin now", true).await;
        let user = Uuid::new_v4();

        let feedback = store.submit(item, user, true, None).await.expect("submit");
        let result = store.undo(feedback.id, Uuid::new_v4()).await;
        assert!(matches!(result, Err(FeedbackError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_batch_submit_partial_failure() {
        let store = test_store().await;
        let good_a = seed_item(&store, "slot slot", true).await;
        let good_b = seed_item(&store, "nice video", false).await;
        let bad = Uuid::new_v4();

        let outcome = store
            .batch_submit(&[good_a, bad, good_b], Uuid::new_v4(), BatchAction::MarkGambling)
            .await;

        assert_eq!(outcome.total_submitted, 3);
        assert_eq!(outcome.successful, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.items.len(), 3);
        assert!(outcome.items[1].error.is_some());
        assert!(outcome.items[0].feedback_id.is_some());

        // The failing item did not roll back its neighbors.
        assert_eq!(store.total_count().await.expect("count"), 2);
    }

    #[tokio::test]
    async fn test_batch_confirm_all_uses_original_predictions() {
        let store = test_store().await;
        let gambling = seed_item(&store, "slot gacor", true).await;
        let clean = seed_item(&store, "nice video", false).await;
        let user = Uuid::new_v4();

        let outcome = store
            .batch_submit(&[gambling, clean], user, BatchAction::ConfirmAll)
            .await;
        assert_eq!(outcome.successful, 2);

        let rows = FeedbackRepository::list_all(&store.pool).await.expect("list");
        assert!(rows.iter().all(|f| !f.is_correction));
        assert!(rows.iter().all(|f| f.corrected_label == f.original_prediction));
    }

    #[tokio::test]
    async fn test_threshold_flips_exactly_at_boundary() {
        let pool = create_pool("sqlite::memory:").await.expect("pool");
        run_migrations(&pool).await.expect("migrations");
        let store = FeedbackStore::new(pool, 5);
        let user = Uuid::new_v4();

        for i in 0..4 {
            let item = seed_item(&store, &format!("comment {i}"), true).await;
            store.submit(item, user, true, None).await.expect("submit");
        }
        assert!(!store.threshold_reached().await.expect("check"));

        let item = seed_item(&store, "comment 4", true).await;
        store.submit(item, user, true, None).await.expect("submit");
        assert!(store.threshold_reached().await.expect("check"));

        // Monotone above the threshold.
        let item = seed_item(&store, "comment 5", true).await;
        store.submit(item, user, true, None).await.expect("submit");
        assert!(store.threshold_reached().await.expect("check"));
    }

    #[tokio::test]
    async fn test_stats_progress() {
        let pool = create_pool("sqlite::memory:").await.expect("pool");
        run_migrations(&pool).await.expect("migrations");
        let store = FeedbackStore::new(pool, 4);
        let user = Uuid::new_v4();

        let confirm = seed_item(&store, "ok comment", false).await;
        store.submit(confirm, user, true, None).await.expect("submit");

        let correct = seed_item(&store, "missed spam", false).await;
        store
            .submit(correct, user, false, Some(true))
            .await
            .expect("submit");

        let stats = store.stats().await.expect("stats");
        assert_eq!(stats.total_validated, 2);
        assert_eq!(stats.corrections_made, 1);
        assert_eq!(stats.pending_for_training, 2);
        assert!((stats.progress_percent - 50.0).abs() < 1e-9);
    }
}
