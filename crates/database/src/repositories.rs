//! Repository types for database operations.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{
    CreateFeedback, CreateScanResult, Feedback, ModelVersion, NewModelVersion, ScanResult,
};

const FEEDBACK_COLUMNS: &str = "id, scan_result_id, user_id, comment_text, original_prediction, \
     original_confidence, corrected_label, is_correction, validated_at, used_in_training, \
     model_version_id";

const MODEL_VERSION_COLUMNS: &str = "id, version, file_path, training_samples, \
     validation_samples, accuracy, precision_score, recall_score, f1_score, is_active, \
     created_at, activated_at, deactivated_at";

/// Repository for scan result operations.
///
/// Scan results are owned by the ingestion side; this subsystem reads them
/// when feedback is submitted and inserts them only for seeding.
pub struct ScanResultRepository;

impl ScanResultRepository {
    /// Creates a new scan result record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn create(pool: &SqlitePool, input: CreateScanResult) -> Result<ScanResult, sqlx::Error> {
        let id = Uuid::new_v4();

        sqlx::query_as::<_, ScanResult>(
            "INSERT INTO scan_results (id, comment_text, is_gambling, confidence, created_at) \
             VALUES (?, ?, ?, ?, ?) \
             RETURNING id, comment_text, is_gambling, confidence, created_at",
        )
        .bind(id)
        .bind(input.comment_text)
        .bind(input.is_gambling)
        .bind(input.confidence)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    /// Finds a scan result by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<ScanResult>, sqlx::Error> {
        sqlx::query_as::<_, ScanResult>(
            "SELECT id, comment_text, is_gambling, confidence, created_at \
             FROM scan_results WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}

/// Repository for validation feedback operations.
pub struct FeedbackRepository;

impl FeedbackRepository {
    /// Creates a new feedback record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails, including when the
    /// (`scan_result_id`, `user_id`) pair already has a feedback row.
    pub async fn create(pool: &SqlitePool, input: CreateFeedback) -> Result<Feedback, sqlx::Error> {
        let id = Uuid::new_v4();

        sqlx::query_as::<_, Feedback>(&format!(
            "INSERT INTO validation_feedback (id, scan_result_id, user_id, comment_text, \
             original_prediction, original_confidence, corrected_label, is_correction, \
             validated_at, used_in_training, model_version_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, NULL) \
             RETURNING {FEEDBACK_COLUMNS}"
        ))
        .bind(id)
        .bind(input.scan_result_id)
        .bind(input.user_id)
        .bind(input.comment_text)
        .bind(input.original_prediction)
        .bind(input.original_confidence)
        .bind(input.corrected_label)
        .bind(input.is_correction)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    /// Overwrites an existing feedback row in place with a fresh verdict.
    ///
    /// Resets `used_in_training` and `model_version_id` so the updated
    /// verdict is picked up by the next training run.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn overwrite(
        pool: &SqlitePool,
        id: Uuid,
        corrected_label: bool,
        is_correction: bool,
    ) -> Result<Feedback, sqlx::Error> {
        sqlx::query_as::<_, Feedback>(&format!(
            "UPDATE validation_feedback \
             SET corrected_label = ?, is_correction = ?, validated_at = ?, \
                 used_in_training = 0, model_version_id = NULL \
             WHERE id = ? \
             RETURNING {FEEDBACK_COLUMNS}"
        ))
        .bind(corrected_label)
        .bind(is_correction)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Finds the feedback a user submitted for a given scan result.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn find_by_result_and_user(
        pool: &SqlitePool,
        scan_result_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Feedback>, sqlx::Error> {
        sqlx::query_as::<_, Feedback>(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM validation_feedback \
             WHERE scan_result_id = ? AND user_id = ?"
        ))
        .bind(scan_result_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Finds a feedback row by ID, scoped to its owning user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn find_by_id_and_user(
        pool: &SqlitePool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Feedback>, sqlx::Error> {
        sqlx::query_as::<_, Feedback>(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM validation_feedback WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a feedback row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM validation_feedback WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Counts all feedback rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn count_all(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM validation_feedback")
            .fetch_one(pool)
            .await
    }

    /// Counts feedback rows not yet used in training.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn count_unused(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM validation_feedback WHERE used_in_training = 0",
        )
        .fetch_one(pool)
        .await
    }

    /// Counts correction rows across all feedback.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn count_corrections(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM validation_feedback WHERE is_correction = 1",
        )
        .fetch_one(pool)
        .await
    }

    /// Breaks pending (unused) feedback down into (corrections, confirmations).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn unused_breakdown(pool: &SqlitePool) -> Result<(i64, i64), sqlx::Error> {
        let corrections = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM validation_feedback \
             WHERE used_in_training = 0 AND is_correction = 1",
        )
        .fetch_one(pool)
        .await?;

        let confirmations = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM validation_feedback \
             WHERE used_in_training = 0 AND is_correction = 0",
        )
        .fetch_one(pool)
        .await?;

        Ok((corrections, confirmations))
    }

    /// Lists every feedback row in submission order (used and unused: the
    /// training corpus is cumulative and never shrinks).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Feedback>, sqlx::Error> {
        sqlx::query_as::<_, Feedback>(&format!(
            "SELECT {FEEDBACK_COLUMNS} FROM validation_feedback ORDER BY validated_at, id"
        ))
        .fetch_all(pool)
        .await
    }
}

/// Repository for model version operations.
///
/// The deploy and rollback activity flips are single transactions here, so
/// the at-most-one-active invariant cannot be observed broken through the
/// pool.
pub struct ModelVersionRepository;

impl ModelVersionRepository {
    /// Finds a model version by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn find_by_id(
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<Option<ModelVersion>, sqlx::Error> {
        sqlx::query_as::<_, ModelVersion>(&format!(
            "SELECT {MODEL_VERSION_COLUMNS} FROM model_versions WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Returns the currently active model version, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn find_active(pool: &SqlitePool) -> Result<Option<ModelVersion>, sqlx::Error> {
        sqlx::query_as::<_, ModelVersion>(&format!(
            "SELECT {MODEL_VERSION_COLUMNS} FROM model_versions WHERE is_active = 1"
        ))
        .fetch_optional(pool)
        .await
    }

    /// Lists recent model versions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn list(pool: &SqlitePool, limit: i64) -> Result<Vec<ModelVersion>, sqlx::Error> {
        sqlx::query_as::<_, ModelVersion>(&format!(
            "SELECT {MODEL_VERSION_COLUMNS} FROM model_versions \
             ORDER BY created_at DESC, version DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Counts all model versions.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn count_all(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM model_versions")
            .fetch_one(pool)
            .await
    }

    /// Registers and activates a freshly trained version in one transaction:
    /// the new row is inserted inactive, the current active version (if any)
    /// is deactivated, the new row is activated, and every unused feedback
    /// row is flagged as used against the new version ID.
    ///
    /// Returns the activated row and the number of feedback rows flagged.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails; no state changes
    /// are applied in that case.
    pub async fn deploy(
        pool: &SqlitePool,
        input: NewModelVersion,
    ) -> Result<(ModelVersion, u64), sqlx::Error> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO model_versions (id, version, file_path, training_samples, \
             validation_samples, accuracy, precision_score, recall_score, f1_score, \
             is_active, created_at, activated_at, deactivated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, NULL, NULL)",
        )
        .bind(id)
        .bind(&input.version)
        .bind(&input.file_path)
        .bind(input.training_samples)
        .bind(input.validation_samples)
        .bind(input.accuracy)
        .bind(input.precision_score)
        .bind(input.recall_score)
        .bind(input.f1_score)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE model_versions SET is_active = 0, deactivated_at = ? WHERE is_active = 1",
        )
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, ModelVersion>(&format!(
            "UPDATE model_versions SET is_active = 1, activated_at = ? WHERE id = ? \
             RETURNING {MODEL_VERSION_COLUMNS}"
        ))
        .bind(now)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let flagged = sqlx::query(
            "UPDATE validation_feedback SET used_in_training = 1, model_version_id = ? \
             WHERE used_in_training = 0",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        Ok((row, flagged))
    }

    /// Reactivates an existing version in one transaction: the current
    /// active version is deactivated and the target activated with its
    /// `deactivated_at` cleared. Feedback flags are untouched.
    ///
    /// Returns `None` if the target ID does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn rollback(
        pool: &SqlitePool,
        target_id: Uuid,
    ) -> Result<Option<ModelVersion>, sqlx::Error> {
        let now = Utc::now();
        let mut tx = pool.begin().await?;

        let target = sqlx::query_as::<_, ModelVersion>(&format!(
            "SELECT {MODEL_VERSION_COLUMNS} FROM model_versions WHERE id = ?"
        ))
        .bind(target_id)
        .fetch_optional(&mut *tx)
        .await?;

        if target.is_none() {
            return Ok(None);
        }

        sqlx::query(
            "UPDATE model_versions SET is_active = 0, deactivated_at = ? WHERE is_active = 1",
        )
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, ModelVersion>(&format!(
            "UPDATE model_versions \
             SET is_active = 1, activated_at = ?, deactivated_at = NULL WHERE id = ? \
             RETURNING {MODEL_VERSION_COLUMNS}"
        ))
        .bind(now)
        .bind(target_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};

    async fn test_pool() -> SqlitePool {
        let pool = create_pool("sqlite::memory:")
            .await
            .expect("in-memory pool");
        run_migrations(&pool).await.expect("migrations");
        pool
    }

    async fn seed_feedback(pool: &SqlitePool, user_id: Uuid, text: &str) -> Feedback {
        let scan = ScanResultRepository::create(
            pool,
            CreateScanResult {
                comment_text: text.to_string(),
                is_gambling: true,
                confidence: 0.9,
            },
        )
        .await
        .expect("scan result");

        FeedbackRepository::create(
            pool,
            CreateFeedback {
                scan_result_id: scan.id,
                user_id,
                comment_text: text.to_string(),
                original_prediction: true,
                original_confidence: 0.9,
                corrected_label: true,
                is_correction: false,
            },
        )
        .await
        .expect("feedback")
    }

    fn version_input(version: &str) -> NewModelVersion {
        NewModelVersion {
            version: version.to_string(),
            file_path: format!("models/model_{version}.json"),
            training_samples: 80,
            validation_samples: 20,
            accuracy: 0.95,
            precision_score: 0.9,
            recall_score: 0.85,
            f1_score: 0.87,
        }
    }

    #[tokio::test]
    async fn test_feedback_unique_per_result_and_user() {
        let pool = test_pool().await;
        let user = Uuid::new_v4();
        let feedback = seed_feedback(&pool, user, "free spins here").await;

        let duplicate = FeedbackRepository::create(
            &pool,
            CreateFeedback {
                scan_result_id: feedback.scan_result_id,
                user_id: user,
                comment_text: "free spins here".to_string(),
                original_prediction: true,
                original_confidence: 0.9,
                corrected_label: false,
                is_correction: true,
            },
        )
        .await;

        assert!(duplicate.is_err(), "composite unique constraint must hold");
    }

    #[tokio::test]
    async fn test_overwrite_resets_training_flags() {
        let pool = test_pool().await;
        let user = Uuid::new_v4();
        let feedback = seed_feedback(&pool, user, "jackpot site").await;

        let (version, flagged) = ModelVersionRepository::deploy(&pool, version_input("v1"))
            .await
            .expect("deploy");
        assert_eq!(flagged, 1);

        let updated = FeedbackRepository::overwrite(&pool, feedback.id, false, true)
            .await
            .expect("overwrite");

        assert!(!updated.used_in_training);
        assert_eq!(updated.model_version_id, None);
        assert!(!updated.corrected_label);
        assert!(updated.is_correction);
        assert!(updated.validated_at >= feedback.validated_at);

        // The version row itself is untouched by the overwrite.
        let version = ModelVersionRepository::find_by_id(&pool, version.id)
            .await
            .expect("query")
            .expect("version row");
        assert!(version.is_active);
    }

    #[tokio::test]
    async fn test_deploy_keeps_exactly_one_active() {
        let pool = test_pool().await;
        let user = Uuid::new_v4();
        seed_feedback(&pool, user, "bonus link").await;

        let (first, flagged) = ModelVersionRepository::deploy(&pool, version_input("v1"))
            .await
            .expect("first deploy");
        assert!(first.is_active);
        assert!(first.activated_at.is_some());
        assert_eq!(flagged, 1);

        seed_feedback(&pool, Uuid::new_v4(), "another bonus link").await;

        let (second, flagged) = ModelVersionRepository::deploy(&pool, version_input("v2"))
            .await
            .expect("second deploy");
        assert_eq!(flagged, 1, "only previously-unused feedback is flagged");

        let first = ModelVersionRepository::find_by_id(&pool, first.id)
            .await
            .expect("query")
            .expect("first version");
        assert!(!first.is_active);
        assert!(first.deactivated_at.is_some());

        let active = ModelVersionRepository::find_active(&pool)
            .await
            .expect("query")
            .expect("active version");
        assert_eq!(active.id, second.id);

        // Flags from the first deploy keep pointing at the first version.
        let rows = FeedbackRepository::list_all(&pool).await.expect("list");
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|f| f.used_in_training));
        assert!(rows.iter().any(|f| f.model_version_id == Some(first.id)));
        assert!(rows.iter().any(|f| f.model_version_id == Some(second.id)));
    }

    #[tokio::test]
    async fn test_rollback_flips_activity() {
        let pool = test_pool().await;

        let (first, _) = ModelVersionRepository::deploy(&pool, version_input("v1"))
            .await
            .expect("deploy v1");
        let (second, _) = ModelVersionRepository::deploy(&pool, version_input("v2"))
            .await
            .expect("deploy v2");

        let restored = ModelVersionRepository::rollback(&pool, first.id)
            .await
            .expect("rollback")
            .expect("target exists");

        assert!(restored.is_active);
        assert_eq!(restored.deactivated_at, None);

        let second = ModelVersionRepository::find_by_id(&pool, second.id)
            .await
            .expect("query")
            .expect("second version");
        assert!(!second.is_active);
        assert!(second.deactivated_at.is_some());

        let missing = ModelVersionRepository::rollback(&pool, Uuid::new_v4())
            .await
            .expect("rollback call");
        assert!(missing.is_none());

        // The failed rollback left the previous activation in place.
        let active = ModelVersionRepository::find_active(&pool)
            .await
            .expect("query")
            .expect("active version");
        assert_eq!(active.id, first.id);
    }

    #[tokio::test]
    async fn test_counts_and_breakdown() {
        let pool = test_pool().await;
        let user = Uuid::new_v4();

        let confirm = seed_feedback(&pool, user, "normal comment").await;
        assert!(!confirm.is_correction);

        let scan = ScanResultRepository::create(
            &pool,
            CreateScanResult {
                comment_text: "subtle ad".to_string(),
                is_gambling: false,
                confidence: 0.6,
            },
        )
        .await
        .expect("scan result");

        FeedbackRepository::create(
            &pool,
            CreateFeedback {
                scan_result_id: scan.id,
                user_id: user,
                comment_text: "subtle ad".to_string(),
                original_prediction: false,
                original_confidence: 0.6,
                corrected_label: true,
                is_correction: true,
            },
        )
        .await
        .expect("correction feedback");

        assert_eq!(FeedbackRepository::count_all(&pool).await.expect("count"), 2);
        assert_eq!(
            FeedbackRepository::count_unused(&pool).await.expect("count"),
            2
        );
        assert_eq!(
            FeedbackRepository::unused_breakdown(&pool)
                .await
                .expect("breakdown"),
            (1, 1)
        );
    }
}
