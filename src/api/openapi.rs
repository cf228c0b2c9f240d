//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the provider-batch REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the provider-batch REST API
///
/// Served as JSON at `/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "provider-batch REST API",
        version = "0.1.0",
        description = "Submit identifier lists, follow job progress, and download the exported workbook",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:6790", description = "Local development server")
    ),
    paths(
        // Jobs
        crate::api::routes::create_job,
        crate::api::routes::get_job_status,
        crate::api::routes::get_job_result,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        crate::types::JobId,
        crate::types::JobState,
        crate::types::ItemStatus,
        crate::types::FetchErrorKind,
        crate::types::ExportFormat,
        crate::types::ItemCounts,
        crate::types::JobStatus,

        crate::record::ProviderRecord,
        crate::record::GeneralInfo,
        crate::record::Partner,
        crate::record::Representative,
        crate::record::AdminRole,

        crate::api::routes::CreateJobRequest,
        crate::api::routes::CreateJobResponse,
        crate::api::routes::HealthResponse,

        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "jobs", description = "Batch jobs - Submit identifier lists, poll progress, download results"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec"),
    )
)]
pub struct ApiDoc;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_has_job_paths() {
        let spec = ApiDoc::openapi();

        for path in ["/jobs", "/jobs/{id}", "/jobs/{id}/result", "/health"] {
            assert!(
                spec.paths.paths.contains_key(path),
                "missing path {path}"
            );
        }
    }

    #[test]
    fn test_openapi_spec_has_schemas() {
        let spec = ApiDoc::openapi();
        let components = spec.components.expect("components defined");

        for schema in ["JobStatus", "CreateJobRequest", "ProviderRecord", "ApiError"] {
            assert!(
                components.schemas.contains_key(schema),
                "missing schema {schema}"
            );
        }
    }

    #[test]
    fn test_openapi_spec_info_and_tags() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "provider-batch REST API");

        let tags = spec.tags.unwrap();
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert!(names.contains(&"jobs"), "Should have 'jobs' tag");
        assert!(names.contains(&"system"), "Should have 'system' tag");
    }

    #[test]
    fn test_openapi_spec_version() {
        let json = serde_json::to_value(ApiDoc::openapi()).expect("Should serialize to JSON");
        let version = json.get("openapi").and_then(|v| v.as_str()).unwrap();
        assert!(version.starts_with("3."), "Should use OpenAPI 3.x version");
    }
}
