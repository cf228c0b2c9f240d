//! Job state store seam
//!
//! [`JobStore`] is the single source of truth for job and item progress. The
//! coordinator and workers only ever hold an `Arc<dyn JobStore>`, so tests can
//! swap the SQLite [`Database`](crate::db::Database) for anything else that
//! honors the same conditional-transition contract:
//!
//! - every item transition is one conditional update keyed on the current
//!   status, so a transition applied by someone else is reported as `false`
//!   rather than silently overwriting it
//! - counts are computed from item rows, never kept as separate counters

use crate::error::Result;
use crate::record::ProviderRecord;
use crate::types::{ExportFormat, FetchErrorKind, ItemCounts, ItemStatus, JobId, JobState};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::FromRow;
use std::path::{Path, PathBuf};

/// Job record from the store
#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    /// Unique database ID
    pub id: i64,
    /// Optional label supplied at submission
    pub label: Option<String>,
    /// Lifecycle state code (see [`JobState::from_i32`])
    pub state: i32,
    /// Number of submitted identifiers, fixed at creation
    pub total: i64,
    /// Export format tag, set once the document is written
    pub export_format: Option<String>,
    /// Path of the written document
    pub result_path: Option<String>,
    /// Size of the written document in bytes
    pub result_size: Option<i64>,
    /// Failure cause when state is FAILED
    pub error_message: Option<String>,
    /// Unix timestamp when the job was created
    pub created_at: i64,
    /// Unix timestamp when dispatch started
    pub started_at: Option<i64>,
    /// Unix timestamp when the job reached COMPLETED or FAILED
    pub completed_at: Option<i64>,
}

impl JobRow {
    /// Typed job ID
    pub fn job_id(&self) -> JobId {
        JobId(self.id)
    }

    /// Typed lifecycle state
    pub fn job_state(&self) -> JobState {
        JobState::from_i32(self.state)
    }

    /// Typed export format, if one was recorded
    pub fn format(&self) -> Option<ExportFormat> {
        self.export_format.as_deref().and_then(ExportFormat::from_tag)
    }

    /// Path of the export document, if written
    pub fn result_file(&self) -> Option<PathBuf> {
        self.result_path.as_ref().map(PathBuf::from)
    }
}

/// Item record from the store
#[derive(Debug, Clone, FromRow)]
pub struct ItemRow {
    /// Unique database ID
    pub id: i64,
    /// Parent job
    pub job_id: i64,
    /// 0-based index in the submitted list
    pub position: i64,
    /// Identifier as submitted (trimmed)
    pub identifier: String,
    /// Status code (see [`ItemStatus::from_i32`])
    pub status: i32,
    /// Attempts claimed so far
    pub attempts: i64,
    /// Terminal error kind, set only when FAILED
    pub error_kind: Option<String>,
    /// Most recent failure kind, kept across retries for diagnostics
    pub last_error: Option<String>,
    /// JSON-encoded [`ProviderRecord`], set only when SUCCEEDED
    pub payload: Option<String>,
    /// Unix timestamp of the last transition
    pub updated_at: i64,
}

impl ItemRow {
    /// Typed status
    pub fn item_status(&self) -> ItemStatus {
        ItemStatus::from_i32(self.status)
    }

    /// Typed terminal error kind
    pub fn failure_kind(&self) -> Option<FetchErrorKind> {
        self.error_kind.as_deref().and_then(FetchErrorKind::parse)
    }

    /// Attempts as an unsigned count
    pub fn attempt_count(&self) -> u32 {
        u32::try_from(self.attempts).unwrap_or(0)
    }
}

/// Succeeded item as read by the export pipeline
#[derive(Debug, Clone, FromRow)]
pub struct ResultRow {
    /// Item ID
    pub id: i64,
    /// 0-based index in the submitted list
    pub position: i64,
    /// Identifier as submitted
    pub identifier: String,
    /// JSON-encoded [`ProviderRecord`]
    pub payload: String,
}

impl ResultRow {
    /// Decode the stored payload
    pub fn record(&self) -> Result<ProviderRecord> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}

/// Convert a stored unix timestamp to a UTC datetime
pub fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).single().unwrap_or_else(Utc::now)
}

/// Durable job and item state
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a CREATED job and one PENDING item per identifier in one transaction
    async fn create_job(&self, label: Option<&str>, identifiers: &[String]) -> Result<JobId>;

    /// Fetch a job row
    async fn get_job(&self, id: JobId) -> Result<Option<JobRow>>;

    /// Count items per bucket with a single grouped query
    async fn item_counts(&self, id: JobId) -> Result<ItemCounts>;

    /// CREATED -> RUNNING
    async fn set_job_running(&self, id: JobId) -> Result<bool>;

    /// RUNNING -> COMPLETED
    async fn set_job_completed(&self, id: JobId) -> Result<bool>;

    /// Any non-terminal or COMPLETED-without-export job -> FAILED with a cause
    async fn set_job_failed(&self, id: JobId, message: &str) -> Result<bool>;

    /// Record the written export document
    async fn set_export_result(
        &self,
        id: JobId,
        format: ExportFormat,
        path: &Path,
        size_bytes: u64,
    ) -> Result<()>;

    /// IDs of PENDING items, in submission order
    async fn pending_item_ids(&self, id: JobId) -> Result<Vec<i64>>;

    /// Fetch a single item
    async fn get_item(&self, item_id: i64) -> Result<Option<ItemRow>>;

    /// PENDING -> IN_PROGRESS with attempts + 1; `None` if the item was not PENDING
    async fn claim_item(&self, item_id: i64) -> Result<Option<ItemRow>>;

    /// IN_PROGRESS -> SUCCEEDED with payload
    async fn mark_item_succeeded(&self, item_id: i64, payload: &str) -> Result<bool>;

    /// IN_PROGRESS -> FAILED with error kind
    async fn mark_item_failed(&self, item_id: i64, kind: FetchErrorKind) -> Result<bool>;

    /// IN_PROGRESS -> PENDING, recording the failure kind for diagnostics
    async fn mark_item_retry(&self, item_id: i64, kind: FetchErrorKind) -> Result<bool>;

    /// IN_PROGRESS -> PENDING without counting the interrupted attempt
    async fn release_item(&self, item_id: i64) -> Result<bool>;

    /// Release every IN_PROGRESS item of a job; returns how many were released
    async fn release_in_progress(&self, id: JobId) -> Result<u64>;

    /// Jobs currently in `state`, oldest first
    async fn jobs_in_state(&self, state: JobState) -> Result<Vec<JobRow>>;

    /// Up to `limit` SUCCEEDED items with position greater than `after_position`
    async fn succeeded_page(
        &self,
        id: JobId,
        after_position: i64,
        limit: u32,
    ) -> Result<Vec<ResultRow>>;

    /// FAILED items, in submission order
    async fn failed_items(&self, id: JobId) -> Result<Vec<ItemRow>>;
}
