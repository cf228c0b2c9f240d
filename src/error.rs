//! Error types for provider-batch
//!
//! This module provides the library's error handling:
//! - Crate-wide [`Error`] plus [`DatabaseError`] and [`ExportError`]
//! - HTTP status code mapping for API integration ([`ToHttpStatus`])
//! - Structured error responses with machine-readable error codes ([`ApiError`])
//!
//! Per-item provider failures are not errors here: they are recorded as
//! [`FetchErrorKind`](crate::types::FetchErrorKind) values on item rows.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for provider-batch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for provider-batch
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "batch.max_attempts")
        key: Option<String>,
    },

    /// Submitted identifier list was rejected before touching the store
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Job not found
    #[error("job not found: {0}")]
    NotFound(String),

    /// Result requested before the export document exists
    #[error("job {id} is not ready: {state}")]
    NotReady {
        /// The job whose result was requested
        id: i64,
        /// Current lifecycle description (e.g. "running", "exporting")
        state: String,
    },

    /// The job ended FAILED because no export could be produced
    #[error("export failed for job {id}: {message}")]
    ExportFailed {
        /// The failed job
        id: i64,
        /// Recorded failure cause
        message: String,
    },

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Export writer error
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),

    /// Constraint violation (e.g., foreign key)
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Export pipeline errors
#[derive(Debug, Error)]
pub enum ExportError {
    /// Workbook container could not be written
    #[error("zip container error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Delimited text could not be written
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Export file could not be created, written, or renamed
    #[error("export I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Export invoked for a job that is not in an exportable state
    #[error("invalid export state: {0}")]
    InvalidState(String),
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "not_ready",
///     "message": "job 12 is not ready: running",
///     "details": {
///       "job_id": 12
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "invalid_input")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create an "invalid input" error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new("invalid_input", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Error::Config { .. } => 400,
            Error::InvalidInput(_) => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,
            Error::Database(DatabaseError::NotFound(_)) => 404,

            // 409 Conflict - result not produced yet
            Error::NotReady { .. } => 409,

            // 500 Internal Server Error
            Error::ExportFailed { .. } => 500,
            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::Export(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway
            Error::Network(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidInput(_) => "invalid_input",
            Error::NotFound(_) => "not_found",
            Error::Database(DatabaseError::NotFound(_)) => "not_found",
            Error::NotReady { .. } => "not_ready",
            Error::ExportFailed { .. } => "export_failed",
            Error::ShuttingDown => "shutting_down",
            Error::Database(_) => "database_error",
            Error::Sqlx(_) => "database_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::Export(_) => "export_error",
            Error::Network(_) => "network_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::NotReady { id, state } => Some(serde_json::json!({
                "job_id": id,
                "state": state,
            })),
            Error::ExportFailed { id, .. } => Some(serde_json::json!({
                "job_id": id,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    /// Returns (Error, expected_status_code, expected_error_code) for every
    /// reachable match arm in ToHttpStatus.
    fn all_error_variants() -> Vec<(Error, u16, &'static str)> {
        vec![
            (
                Error::Config {
                    message: "bad value".into(),
                    key: Some("batch.max_attempts".into()),
                },
                400,
                "config_error",
            ),
            (
                Error::InvalidInput("empty list".into()),
                400,
                "invalid_input",
            ),
            (Error::NotFound("job 99".into()), 404, "not_found"),
            (
                Error::Database(DatabaseError::NotFound("job 99".into())),
                404,
                "not_found",
            ),
            (
                Error::NotReady {
                    id: 1,
                    state: "running".into(),
                },
                409,
                "not_ready",
            ),
            (
                Error::ExportFailed {
                    id: 1,
                    message: "disk full".into(),
                },
                500,
                "export_failed",
            ),
            (
                Error::Database(DatabaseError::QueryFailed("locked".into())),
                500,
                "database_error",
            ),
            (
                Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
                500,
                "io_error",
            ),
            (
                Error::Export(ExportError::InvalidState("still running".into())),
                500,
                "export_error",
            ),
            (Error::Other("unknown".into()), 500, "internal_error"),
            (Error::ShuttingDown, 503, "shutting_down"),
        ]
    }

    #[test]
    fn every_variant_maps_to_expected_status_code() {
        for (error, expected_status, expected_code) in all_error_variants() {
            let actual_status = error.status_code();
            assert_eq!(
                actual_status, expected_status,
                "Error variant with error_code={expected_code} returned status {actual_status}, expected {expected_status}"
            );
        }
    }

    #[test]
    fn every_variant_maps_to_expected_error_code() {
        for (error, expected_status, expected_code) in all_error_variants() {
            let actual_code = error.error_code();
            assert_eq!(
                actual_code, expected_code,
                "Error variant with expected status={expected_status} returned error_code={actual_code}, expected {expected_code}"
            );
        }
    }

    #[test]
    fn not_ready_is_409_not_404() {
        let err = Error::NotReady {
            id: 5,
            state: "exporting".into(),
        };
        assert_eq!(err.status_code(), 409);
    }

    #[test]
    fn api_error_from_not_ready_has_job_id_and_state() {
        let err = Error::NotReady {
            id: 42,
            state: "running".into(),
        };
        let api: ApiError = err.into();

        assert_eq!(api.error.code, "not_ready");
        let details = api.error.details.expect("should have details");
        assert_eq!(details["job_id"], 42);
        assert_eq!(details["state"], "running");
    }

    #[test]
    fn api_error_from_export_failed_has_job_id() {
        let err = Error::ExportFailed {
            id: 7,
            message: "no space left on device".into(),
        };
        let api: ApiError = err.into();

        assert_eq!(api.error.code, "export_failed");
        assert!(api.error.message.contains("no space left"));
        let details = api.error.details.expect("should have details");
        assert_eq!(details["job_id"], 7);
    }

    #[test]
    fn api_error_from_invalid_input_has_no_details() {
        let api: ApiError = Error::InvalidInput("identifier list is empty".into()).into();
        assert_eq!(api.error.code, "invalid_input");
        assert!(api.error.details.is_none());
    }

    #[test]
    fn api_error_serializes_without_null_details() {
        let api = ApiError::not_found("job 3");
        let json = serde_json::to_value(&api).unwrap();

        assert_eq!(json["error"]["code"], "not_found");
        assert_eq!(json["error"]["message"], "job 3 not found");
        assert!(json["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn reqwest_error_converts_into_network_error() {
        let reqwest_err = reqwest::Client::new()
            .get("http://")
            .send()
            .await
            .unwrap_err();
        let err: Error = reqwest_err.into();

        assert!(matches!(err, Error::Network(_)));
        assert_eq!(err.status_code(), 502);
        assert_eq!(err.error_code(), "network_error");
    }

    #[test]
    fn export_error_converts_into_crate_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = ExportError::from(io).into();
        assert!(matches!(err, Error::Export(ExportError::Io(_))));
        assert_eq!(err.error_code(), "export_error");
    }
}
