//! Core types for provider-batch

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Unique identifier for a batch job
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl JobId {
    /// Create a new JobId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for JobId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<JobId> for i64 {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

// Implement sqlx Type, Encode, and Decode for database operations
impl sqlx::Type<sqlx::Sqlite> for JobId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for JobId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for JobId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// Job lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Persisted, items not yet dispatched
    Created,
    /// Items are being fetched
    Running,
    /// Every item reached a terminal status (some may have failed)
    Completed,
    /// The export pipeline could not produce a document
    Failed,
}

impl JobState {
    /// Convert integer state code to JobState enum
    pub fn from_i32(state: i32) -> Self {
        match state {
            0 => JobState::Created,
            1 => JobState::Running,
            2 => JobState::Completed,
            3 => JobState::Failed,
            _ => JobState::Failed, // Default to Failed for unknown state
        }
    }

    /// Convert JobState enum to integer state code
    pub fn to_i32(&self) -> i32 {
        match self {
            JobState::Created => 0,
            JobState::Running => 1,
            JobState::Completed => 2,
            JobState::Failed => 3,
        }
    }

    /// Whether no further transitions will happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// Per-item status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Waiting to be claimed (first attempt or retry)
    Pending,
    /// Owned by exactly one fetch execution
    InProgress,
    /// Record fetched and stored
    Succeeded,
    /// Permanent failure or retries exhausted
    Failed,
}

impl ItemStatus {
    /// Convert integer status code to ItemStatus enum
    pub fn from_i32(status: i32) -> Self {
        match status {
            0 => ItemStatus::Pending,
            1 => ItemStatus::InProgress,
            2 => ItemStatus::Succeeded,
            3 => ItemStatus::Failed,
            _ => ItemStatus::Failed,
        }
    }

    /// Convert ItemStatus enum to integer status code
    pub fn to_i32(&self) -> i32 {
        match self {
            ItemStatus::Pending => 0,
            ItemStatus::InProgress => 1,
            ItemStatus::Succeeded => 2,
            ItemStatus::Failed => 3,
        }
    }
}

/// Failure reported by a provider lookup
///
/// Item failures are data, not errors: the kind is recorded on the item row
/// and never propagates to the coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// The provider has no record for this identifier
    NotFound,
    /// The call exceeded its per-call timeout
    Timeout,
    /// The provider answered with a server-side failure
    ServerError,
    /// The provider throttled the request
    RateLimited,
    /// Malformed identifier or undecodable response
    Malformed,
}

impl FetchErrorKind {
    /// Stable string code stored in the database and shown in exports
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchErrorKind::NotFound => "not_found",
            FetchErrorKind::Timeout => "timeout",
            FetchErrorKind::ServerError => "server_error",
            FetchErrorKind::RateLimited => "rate_limited",
            FetchErrorKind::Malformed => "malformed",
        }
    }

    /// Parse a stored code back into a kind
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "not_found" => Some(FetchErrorKind::NotFound),
            "timeout" => Some(FetchErrorKind::Timeout),
            "server_error" => Some(FetchErrorKind::ServerError),
            "rate_limited" => Some(FetchErrorKind::RateLimited),
            "malformed" => Some(FetchErrorKind::Malformed),
            _ => None,
        }
    }
}

impl std::fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical export format, chosen from result volume
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ExportFormat {
    /// Styled workbook built in memory
    #[serde(rename = "full")]
    Full,
    /// Workbook written progressively in fixed-size chunks
    #[serde(rename = "streaming")]
    Streaming,
    /// UTF-8 (BOM) delimited text with section marker rows
    #[serde(rename = "flat-text")]
    FlatText,
}

impl ExportFormat {
    /// Format tag exposed to collaborators
    pub fn tag(&self) -> &'static str {
        match self {
            ExportFormat::Full => "full",
            ExportFormat::Streaming => "streaming",
            ExportFormat::FlatText => "flat-text",
        }
    }

    /// Parse a format tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "full" => Some(ExportFormat::Full),
            "streaming" => Some(ExportFormat::Streaming),
            "flat-text" => Some(ExportFormat::FlatText),
            _ => None,
        }
    }

    /// File extension of the written document
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Full | ExportFormat::Streaming => "xlsx",
            ExportFormat::FlatText => "csv",
        }
    }

    /// MIME type of the written document
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Full | ExportFormat::Streaming => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::FlatText => "text/csv; charset=utf-8",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Item counts for one job, derived from item rows
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ItemCounts {
    /// Items that reached SUCCEEDED
    pub completed: u64,
    /// Items that reached FAILED
    pub failed: u64,
    /// Items still PENDING or IN_PROGRESS
    pub pending: u64,
}

impl ItemCounts {
    /// Sum of all buckets
    pub fn total(&self) -> u64 {
        self.completed + self.failed + self.pending
    }
}

/// Progress snapshot returned to pollers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct JobStatus {
    /// Job ID
    pub id: JobId,
    /// Optional label supplied at submission (e.g. the uploaded filename)
    pub label: Option<String>,
    /// Lifecycle state
    pub state: JobState,
    /// Number of submitted identifiers
    pub total: u64,
    /// Items that succeeded
    pub completed: u64,
    /// Items that failed
    pub failed: u64,
    /// Items not yet terminal
    pub pending: u64,
    /// Terminal items as a percentage of total (0-100)
    pub progress_percentage: u8,
    /// Export format, once chosen
    pub export_format: Option<ExportFormat>,
    /// Failure cause when state is FAILED
    pub error: Option<String>,
    /// When the job was created
    pub created_at: DateTime<Utc>,
    /// When dispatch started
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,
}

/// Finished export returned to the collaborator
#[derive(Clone, Debug)]
pub struct ExportDocument {
    /// Document bytes
    pub bytes: Vec<u8>,
    /// Detected format
    pub format: ExportFormat,
    /// Length of `bytes`
    pub content_length: u64,
    /// Suggested download file name
    pub file_name: String,
}

impl ExportDocument {
    /// MIME type for the document
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}
