//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`jobs`] - Submission, status, result download
//! - [`system`] - Health, OpenAPI

use crate::types::JobId;
use serde::{Deserialize, Serialize};

mod jobs;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use jobs::*;
pub use system::*;

/// Request body for POST /jobs
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CreateJobRequest {
    /// Optional label shown in the export summary (e.g. the uploaded filename)
    #[serde(default)]
    pub label: Option<String>,
    /// Identifiers to look up, in order; duplicates are kept
    pub identifiers: Vec<String>,
}

/// Response for POST /jobs
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CreateJobResponse {
    /// ID of the created job
    pub id: JobId,
}

/// Response for GET /health
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// Always "ok" when the server answers
    pub status: String,
    /// Crate version
    pub version: String,
    /// Whether new jobs are accepted
    pub accepting_jobs: bool,
    /// Provider calls currently in flight
    pub fetches_in_flight: usize,
}
