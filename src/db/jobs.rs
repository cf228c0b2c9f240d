//! Job rows and lifecycle transitions.

use crate::error::DatabaseError;
use crate::store::JobRow;
use crate::types::{ExportFormat, ItemStatus, JobId, JobState};
use crate::{Error, Result};
use std::path::Path;

use super::Database;

// SQLite default SQLITE_MAX_VARIABLE_NUMBER is 999; each item binds 5 values.
const MAX_ITEMS_PER_INSERT: usize = 190;

impl Database {
    /// Insert a CREATED job and its PENDING items in one transaction
    pub async fn insert_job(&self, label: Option<&str>, identifiers: &[String]) -> Result<JobId> {
        let now = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin transaction: {}",
                e
            )))
        })?;

        let result = sqlx::query(
            r#"
            INSERT INTO jobs (label, state, total, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(label)
        .bind(JobState::Created.to_i32())
        .bind(identifiers.len() as i64)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert job: {}",
                e
            )))
        })?;

        let job_id = JobId(result.last_insert_rowid());

        for (chunk_index, chunk) in identifiers.chunks(MAX_ITEMS_PER_INSERT).enumerate() {
            let offset = chunk_index * MAX_ITEMS_PER_INSERT;
            let mut query_builder = sqlx::QueryBuilder::new(
                "INSERT INTO job_items (job_id, position, identifier, status, updated_at) ",
            );

            query_builder.push_values(chunk.iter().enumerate(), |mut b, (i, identifier)| {
                b.push_bind(job_id)
                    .push_bind((offset + i) as i64)
                    .push_bind(identifier)
                    .push_bind(ItemStatus::Pending.to_i32())
                    .push_bind(now);
            });

            query_builder.build().execute(&mut *tx).await.map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to insert job items: {}",
                    e
                )))
            })?;
        }

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit job {}: {}",
                job_id, e
            )))
        })?;

        Ok(job_id)
    }

    /// Get a job by ID
    pub async fn get_job_row(&self, id: JobId) -> Result<Option<JobRow>> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT
                id, label, state, total, export_format, result_path, result_size,
                error_message, created_at, started_at, completed_at
            FROM jobs
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get job: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// List jobs in a given state, oldest first
    pub async fn list_jobs_by_state(&self, state: JobState) -> Result<Vec<JobRow>> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT
                id, label, state, total, export_format, result_path, result_size,
                error_message, created_at, started_at, completed_at
            FROM jobs
            WHERE state = ?
            ORDER BY id ASC
            "#,
        )
        .bind(state.to_i32())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list jobs by state: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// CREATED -> RUNNING, stamping started_at
    pub async fn mark_job_running(&self, id: JobId) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET state = ?, started_at = COALESCE(started_at, ?)
            WHERE id = ? AND state = ?
            "#,
        )
        .bind(JobState::Running.to_i32())
        .bind(now)
        .bind(id)
        .bind(JobState::Created.to_i32())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mark job running: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// RUNNING -> COMPLETED, stamping completed_at
    pub async fn mark_job_completed(&self, id: JobId) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET state = ?, completed_at = ?
            WHERE id = ? AND state = ?
            "#,
        )
        .bind(JobState::Completed.to_i32())
        .bind(now)
        .bind(id)
        .bind(JobState::Running.to_i32())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mark job completed: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Move a job to FAILED unless it already is, or already has an export
    pub async fn mark_job_failed(&self, id: JobId, message: &str) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET state = ?, error_message = ?, completed_at = ?
            WHERE id = ? AND state != ? AND result_path IS NULL
            "#,
        )
        .bind(JobState::Failed.to_i32())
        .bind(message)
        .bind(now)
        .bind(id)
        .bind(JobState::Failed.to_i32())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mark job failed: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Record the written export document for a COMPLETED job
    pub async fn record_export(
        &self,
        id: JobId,
        format: ExportFormat,
        path: &Path,
        size_bytes: u64,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET export_format = ?, result_path = ?, result_size = ?
            WHERE id = ? AND state = ? AND result_path IS NULL
            "#,
        )
        .bind(format.tag())
        .bind(path.to_string_lossy().to_string())
        .bind(size_bytes as i64)
        .bind(id)
        .bind(JobState::Completed.to_i32())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to record export: {}",
                e
            )))
        })?;

        if result.rows_affected() == 0 {
            return Err(Error::Database(DatabaseError::ConstraintViolation(format!(
                "job {} is not awaiting an export",
                id
            ))));
        }

        Ok(())
    }
}
