//! REST API server module
//!
//! A thin JSON surface over [`BatchCoordinator`]: submit an identifier list,
//! poll its status, download the export document.

use crate::{BatchCoordinator, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Jobs
/// - `POST /jobs` - Submit an identifier list
/// - `GET /jobs/:id` - Progress snapshot
/// - `GET /jobs/:id/result` - Download the export document
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
pub fn create_router(coordinator: Arc<BatchCoordinator>) -> Router {
    let api_config = coordinator.config().api.clone();
    let state = AppState::new(coordinator);

    let router = Router::new()
        // Jobs
        .route("/jobs", post(routes::create_job))
        .route("/jobs/:id", get(routes::get_job_status))
        .route("/jobs/:id/result", get(routes::get_job_result))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config
    if api_config.cors_enabled {
        router.layer(build_cors_layer(&api_config.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins ("*" allows any origin)
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Serve the API on `api.bind_address` until the listener fails
///
/// # Example
///
/// ```no_run
/// use provider_batch::{BatchCoordinator, Config};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let coordinator = Arc::new(BatchCoordinator::from_config(Config::default()).await?);
/// coordinator.restore_jobs().await?;
///
/// // Start API server (blocks until shutdown)
/// provider_batch::api::start_api_server(coordinator).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(coordinator: Arc<BatchCoordinator>) -> Result<()> {
    let bind_address = coordinator.config().api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(coordinator);
    let listener = TcpListener::bind(bind_address).await?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app).await?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
