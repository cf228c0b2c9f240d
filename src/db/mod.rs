//! Database layer for provider-batch
//!
//! Handles SQLite persistence for jobs and their items.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`]: database lifecycle, schema migrations
//! - [`jobs`]: job rows and lifecycle transitions
//! - [`items`]: item claims, transitions, counts, and export pages
//!
//! [`Database`] implements [`JobStore`] by delegating to those methods.

use crate::Result;
use crate::store::{ItemRow, JobRow, JobStore, ResultRow};
use crate::types::{ExportFormat, FetchErrorKind, ItemCounts, JobId, JobState};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use std::path::Path;

mod items;
mod jobs;
mod migrations;

/// Database handle for provider-batch
pub struct Database {
    pool: SqlitePool,
}

#[async_trait]
impl JobStore for Database {
    async fn create_job(&self, label: Option<&str>, identifiers: &[String]) -> Result<JobId> {
        self.insert_job(label, identifiers).await
    }

    async fn get_job(&self, id: JobId) -> Result<Option<JobRow>> {
        self.get_job_row(id).await
    }

    async fn item_counts(&self, id: JobId) -> Result<ItemCounts> {
        self.count_items(id).await
    }

    async fn set_job_running(&self, id: JobId) -> Result<bool> {
        self.mark_job_running(id).await
    }

    async fn set_job_completed(&self, id: JobId) -> Result<bool> {
        self.mark_job_completed(id).await
    }

    async fn set_job_failed(&self, id: JobId, message: &str) -> Result<bool> {
        self.mark_job_failed(id, message).await
    }

    async fn set_export_result(
        &self,
        id: JobId,
        format: ExportFormat,
        path: &Path,
        size_bytes: u64,
    ) -> Result<()> {
        self.record_export(id, format, path, size_bytes).await
    }

    async fn pending_item_ids(&self, id: JobId) -> Result<Vec<i64>> {
        self.list_pending_item_ids(id).await
    }

    async fn get_item(&self, item_id: i64) -> Result<Option<ItemRow>> {
        self.get_item_row(item_id).await
    }

    async fn claim_item(&self, item_id: i64) -> Result<Option<ItemRow>> {
        self.try_claim_item(item_id).await
    }

    async fn mark_item_succeeded(&self, item_id: i64, payload: &str) -> Result<bool> {
        self.complete_item(item_id, payload).await
    }

    async fn mark_item_failed(&self, item_id: i64, kind: FetchErrorKind) -> Result<bool> {
        self.fail_item(item_id, kind).await
    }

    async fn mark_item_retry(&self, item_id: i64, kind: FetchErrorKind) -> Result<bool> {
        self.requeue_item(item_id, kind).await
    }

    async fn release_item(&self, item_id: i64) -> Result<bool> {
        self.release_claim(item_id).await
    }

    async fn release_in_progress(&self, id: JobId) -> Result<u64> {
        self.release_job_claims(id).await
    }

    async fn jobs_in_state(&self, state: JobState) -> Result<Vec<JobRow>> {
        self.list_jobs_by_state(state).await
    }

    async fn succeeded_page(
        &self,
        id: JobId,
        after_position: i64,
        limit: u32,
    ) -> Result<Vec<ResultRow>> {
        self.list_succeeded_after(id, after_position, limit).await
    }

    async fn failed_items(&self, id: JobId) -> Result<Vec<ItemRow>> {
        self.list_failed_items(id).await
    }
}
