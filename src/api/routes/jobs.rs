//! Job handlers: submit, status, result download.

use super::{CreateJobRequest, CreateJobResponse};
use crate::api::AppState;
use crate::error::{ApiError, Result};
use crate::types::JobId;
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderName, StatusCode, header},
    response::{IntoResponse, Response},
};

/// Header carrying the export format tag of a result download
pub const EXPORT_FORMAT_HEADER: &str = "x-export-format";

/// POST /jobs - Submit an identifier list
#[utoipa::path(
    post,
    path = "/jobs",
    tag = "jobs",
    request_body = CreateJobRequest,
    responses(
        (status = 201, description = "Job created and dispatched", body = CreateJobResponse),
        (status = 400, description = "Empty, oversized, or blank identifier list", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn create_job(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateJobRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiError::invalid_input(rejection.body_text())),
            )
                .into_response();
        }
    };

    match state
        .coordinator
        .create_job_with_label(request.label.as_deref(), &request.identifiers)
        .await
    {
        Ok(id) => (StatusCode::CREATED, Json(CreateJobResponse { id })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /jobs/:id - Progress snapshot
#[utoipa::path(
    get,
    path = "/jobs/{id}",
    tag = "jobs",
    params(
        ("id" = i64, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job status", body = crate::types::JobStatus),
        (status = 404, description = "Job not found", body = crate::error::ApiError)
    )
)]
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let status = state.coordinator.get_status(JobId(id)).await?;
    Ok(Json(status))
}

/// GET /jobs/:id/result - Download the export document
#[utoipa::path(
    get,
    path = "/jobs/{id}/result",
    tag = "jobs",
    params(
        ("id" = i64, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Export document (xlsx or csv) as an attachment"),
        (status = 404, description = "Job not found", body = crate::error::ApiError),
        (status = 409, description = "Job still running or exporting", body = crate::error::ApiError),
        (status = 500, description = "Export failed", body = crate::error::ApiError)
    )
)]
pub async fn get_job_result(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let document = state.coordinator.get_result(JobId(id)).await?;

    let headers = [
        (header::CONTENT_TYPE, document.content_type().to_string()),
        (header::CONTENT_LENGTH, document.content_length.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", document.file_name),
        ),
        (
            HeaderName::from_static(EXPORT_FORMAT_HEADER),
            document.format.tag().to_string(),
        ),
    ];

    Ok((StatusCode::OK, headers, document.bytes))
}
