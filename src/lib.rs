//! # provider-batch
//!
//! Batch lookups against a single remote data provider, persisted in SQLite
//! and exported as a spreadsheet.
//!
//! ## Design Philosophy
//!
//! provider-batch is designed to be:
//! - **Durable** - Jobs and items live in SQLite and survive restarts
//! - **Bounded** - One process-wide cap on concurrent provider calls
//! - **Library-first** - Embed the coordinator, or serve it over the REST API
//!
//! ## Quick Start
//!
//! ```no_run
//! use provider_batch::{BatchCoordinator, Config};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let coordinator = BatchCoordinator::from_config(Config::default()).await?;
//!
//!     // Pick up jobs interrupted by a previous run
//!     coordinator.restore_jobs().await?;
//!
//!     let ids = vec!["20100047218".to_string(), "20131312955".to_string()];
//!     let job = coordinator.create_job(&ids).await?;
//!
//!     let status = coordinator
//!         .wait_for_terminal(job, Duration::from_millis(500), Duration::from_secs(600))
//!         .await?;
//!     println!("{:?}: {}/{} succeeded", status.state, status.completed, status.total);
//!
//!     let document = coordinator.get_result(job).await?;
//!     std::fs::write(&document.file_name, &document.bytes)?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Job coordinator: submission, dispatch, status, restore
pub mod batch;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Export pipeline: format selection and document writers
pub mod export;
/// Provider client abstraction
pub mod provider;
/// Provider record model
pub mod record;
/// Retry classification and backoff
pub mod retry;
/// Persistence contract between the coordinator and storage
pub mod store;
/// Core types
pub mod types;

// Re-export commonly used types
pub use batch::{BatchCoordinator, FetchGauge, ItemOutcome};
pub use config::{ApiConfig, BatchConfig, Config, ExportConfig, PersistenceConfig, ProviderConfig};
pub use db::Database;
pub use error::{ApiError, DatabaseError, Error, ErrorDetail, ExportError, Result, ToHttpStatus};
pub use export::{ExportPipeline, select_format};
pub use provider::{HttpProviderClient, ProviderClient};
pub use record::ProviderRecord;
pub use retry::{RetryDecision, RetryPolicy};
pub use store::JobStore;
pub use types::{
    ExportDocument, ExportFormat, FetchErrorKind, ItemCounts, ItemStatus, JobId, JobState,
    JobStatus,
};

/// Helper function to run the coordinator with graceful signal handling.
///
/// Waits for a termination signal and then calls the coordinator's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use provider_batch::{BatchCoordinator, Config, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let coordinator = Arc::new(BatchCoordinator::from_config(Config::default()).await?);
///     coordinator.restore_jobs().await?;
///
///     tokio::spawn(provider_batch::api::start_api_server(coordinator.clone()));
///
///     // Run with automatic signal handling
///     run_with_shutdown(&coordinator).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(coordinator: &BatchCoordinator) -> Result<()> {
    wait_for_signal().await;
    coordinator.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}
