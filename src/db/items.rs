//! Item claims, transitions, counts, and export pages.
//!
//! Every transition is a single UPDATE guarded on the current status. A
//! `false` return means the item was not in the expected status and nothing
//! changed.

use crate::error::DatabaseError;
use crate::store::{ItemRow, ResultRow};
use crate::types::{FetchErrorKind, ItemCounts, ItemStatus, JobId};
use crate::{Error, Result};

use super::Database;

const ITEM_COLUMNS: &str = "id, job_id, position, identifier, status, attempts, \
                            error_kind, last_error, payload, updated_at";

impl Database {
    /// Count items per bucket with one grouped query
    pub async fn count_items(&self, id: JobId) -> Result<ItemCounts> {
        let rows: Vec<(i32, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*)
            FROM job_items
            WHERE job_id = ?
            GROUP BY status
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to count items: {}",
                e
            )))
        })?;

        let mut counts = ItemCounts::default();
        for (status, count) in rows {
            let count = count.max(0) as u64;
            match ItemStatus::from_i32(status) {
                ItemStatus::Succeeded => counts.completed += count,
                ItemStatus::Failed => counts.failed += count,
                ItemStatus::Pending | ItemStatus::InProgress => counts.pending += count,
            }
        }

        Ok(counts)
    }

    /// IDs of PENDING items in submission order
    pub async fn list_pending_item_ids(&self, id: JobId) -> Result<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM job_items
            WHERE job_id = ? AND status = ?
            ORDER BY position ASC
            "#,
        )
        .bind(id)
        .bind(ItemStatus::Pending.to_i32())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list pending items: {}",
                e
            )))
        })?;

        Ok(ids)
    }

    /// Get an item by ID
    pub async fn get_item_row(&self, item_id: i64) -> Result<Option<ItemRow>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM job_items WHERE id = ?");
        let row = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to get item: {}",
                    e
                )))
            })?;

        Ok(row)
    }

    /// PENDING -> IN_PROGRESS with attempts + 1
    ///
    /// Returns the claimed row, or `None` when the item was not PENDING.
    pub async fn try_claim_item(&self, item_id: i64) -> Result<Option<ItemRow>> {
        let now = chrono::Utc::now().timestamp();
        let sql = format!(
            "UPDATE job_items \
             SET status = ?, attempts = attempts + 1, updated_at = ? \
             WHERE id = ? AND status = ? \
             RETURNING {ITEM_COLUMNS}"
        );

        let row = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(ItemStatus::InProgress.to_i32())
            .bind(now)
            .bind(item_id)
            .bind(ItemStatus::Pending.to_i32())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to claim item: {}",
                    e
                )))
            })?;

        Ok(row)
    }

    /// IN_PROGRESS -> SUCCEEDED with payload
    pub async fn complete_item(&self, item_id: i64, payload: &str) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            UPDATE job_items
            SET status = ?, payload = ?, error_kind = NULL, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(ItemStatus::Succeeded.to_i32())
        .bind(payload)
        .bind(now)
        .bind(item_id)
        .bind(ItemStatus::InProgress.to_i32())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mark item succeeded: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// IN_PROGRESS -> FAILED with the terminal error kind
    pub async fn fail_item(&self, item_id: i64, kind: FetchErrorKind) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            UPDATE job_items
            SET status = ?, error_kind = ?, last_error = ?, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(ItemStatus::Failed.to_i32())
        .bind(kind.as_str())
        .bind(kind.as_str())
        .bind(now)
        .bind(item_id)
        .bind(ItemStatus::InProgress.to_i32())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mark item failed: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// IN_PROGRESS -> PENDING, keeping the failure kind as `last_error`
    pub async fn requeue_item(&self, item_id: i64, kind: FetchErrorKind) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            UPDATE job_items
            SET status = ?, last_error = ?, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(ItemStatus::Pending.to_i32())
        .bind(kind.as_str())
        .bind(now)
        .bind(item_id)
        .bind(ItemStatus::InProgress.to_i32())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to requeue item: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// IN_PROGRESS -> PENDING, giving back the interrupted attempt
    pub async fn release_claim(&self, item_id: i64) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            UPDATE job_items
            SET status = ?, attempts = MAX(attempts - 1, 0), updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(ItemStatus::Pending.to_i32())
        .bind(now)
        .bind(item_id)
        .bind(ItemStatus::InProgress.to_i32())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to release item: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Release every IN_PROGRESS item of a job
    pub async fn release_job_claims(&self, id: JobId) -> Result<u64> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            UPDATE job_items
            SET status = ?, attempts = MAX(attempts - 1, 0), updated_at = ?
            WHERE job_id = ? AND status = ?
            "#,
        )
        .bind(ItemStatus::Pending.to_i32())
        .bind(now)
        .bind(id)
        .bind(ItemStatus::InProgress.to_i32())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to release in-progress items: {}",
                e
            )))
        })?;

        Ok(result.rows_affected())
    }

    /// Keyset page of SUCCEEDED items ordered by position
    pub async fn list_succeeded_after(
        &self,
        id: JobId,
        after_position: i64,
        limit: u32,
    ) -> Result<Vec<ResultRow>> {
        let rows = sqlx::query_as::<_, ResultRow>(
            r#"
            SELECT id, position, identifier, payload
            FROM job_items
            WHERE job_id = ? AND status = ? AND position > ? AND payload IS NOT NULL
            ORDER BY position ASC
            LIMIT ?
            "#,
        )
        .bind(id)
        .bind(ItemStatus::Succeeded.to_i32())
        .bind(after_position)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list succeeded items: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// FAILED items in submission order
    pub async fn list_failed_items(&self, id: JobId) -> Result<Vec<ItemRow>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM job_items \
             WHERE job_id = ? AND status = ? \
             ORDER BY position ASC"
        );

        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(id)
            .bind(ItemStatus::Failed.to_i32())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to list failed items: {}",
                    e
                )))
            })?;

        Ok(rows)
    }
}
