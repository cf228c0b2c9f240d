//! Batch coordinator split into focused submodules.
//!
//! The `BatchCoordinator` struct and its methods are organized by domain:
//! - [`submit`] - Input validation and job creation
//! - [`status`] - Progress snapshots and result retrieval
//! - [`runner`] - Per-job worker set, completion detection, export trigger
//! - [`worker`] - One fetch execution for one item
//! - [`lifecycle`] - Restore on startup and graceful shutdown

mod lifecycle;
mod runner;
mod status;
mod submit;
mod worker;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use worker::ItemOutcome;

use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::export::ExportPipeline;
use crate::provider::{HttpProviderClient, ProviderClient};
use crate::retry::RetryPolicy;
use crate::store::JobStore;
use crate::types::JobId;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Current and peak number of provider calls in flight
///
/// Cloning shares the same counters.
#[derive(Clone, Debug, Default)]
pub struct FetchGauge {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl FetchGauge {
    /// Create a gauge at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a call as in flight until the returned guard is dropped
    pub fn enter(&self) -> FetchGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        FetchGuard {
            current: Arc::clone(&self.current),
        }
    }

    /// Calls currently in flight
    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous calls observed
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Keeps one call counted in a [`FetchGauge`]
pub struct FetchGuard {
    current: Arc<AtomicUsize>,
}

impl Drop for FetchGuard {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Dispatch state shared by every job runner
#[derive(Clone)]
pub(crate) struct DispatchState {
    /// Global bound on concurrent provider calls (max_concurrent_fetches)
    pub(crate) fetch_limit: Arc<tokio::sync::Semaphore>,
    /// Jobs with a live runner; guards against dispatching a job twice
    pub(crate) active_jobs: Arc<tokio::sync::Mutex<HashSet<JobId>>>,
    /// Set to false once shutdown begins
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Cancelled once shutdown begins; runners stop claiming new items
    pub(crate) shutdown: tokio_util::sync::CancellationToken,
}

/// Owns job lifecycles (cloneable - all fields are Arc-wrapped)
///
/// Submitting a job persists it with one PENDING item per identifier and
/// spawns a runner task for it. Progress is observed by polling
/// [`get_status`](Self::get_status); the document is fetched with
/// [`get_result`](Self::get_result) once the job is COMPLETED and exported.
#[derive(Clone)]
pub struct BatchCoordinator {
    /// Durable job and item state
    pub(crate) store: Arc<dyn JobStore>,
    /// External record source
    pub(crate) provider: Arc<dyn ProviderClient>,
    /// Static configuration
    pub(crate) config: Arc<Config>,
    /// Attempt cap and backoff
    pub(crate) policy: RetryPolicy,
    /// Document writer
    pub(crate) exporter: Arc<ExportPipeline>,
    /// In-flight provider call gauge
    pub(crate) gauge: FetchGauge,
    /// Shared dispatch state
    pub(crate) dispatch: DispatchState,
}

impl BatchCoordinator {
    /// Create a coordinator over an existing store and provider client
    ///
    /// Nothing is dispatched until a job is submitted or
    /// [`restore_jobs`](Self::restore_jobs) is called.
    pub fn new(
        store: Arc<dyn JobStore>,
        provider: Arc<dyn ProviderClient>,
        config: Config,
    ) -> Result<Self> {
        config.validate()?;

        let dispatch = DispatchState {
            fetch_limit: Arc::new(tokio::sync::Semaphore::new(
                config.batch.max_concurrent_fetches,
            )),
            active_jobs: Arc::new(tokio::sync::Mutex::new(HashSet::new())),
            accepting_new: Arc::new(AtomicBool::new(true)),
            shutdown: tokio_util::sync::CancellationToken::new(),
        };

        Ok(Self {
            store,
            provider,
            policy: RetryPolicy::from_config(&config.batch),
            exporter: Arc::new(ExportPipeline::new(config.export.clone())),
            gauge: FetchGauge::new(),
            config: Arc::new(config),
            dispatch,
        })
    }

    /// Open the SQLite store and HTTP provider client named in `config`
    pub async fn from_config(config: Config) -> Result<Self> {
        let db = Database::new(&config.persistence.database_path).await?;
        let provider = HttpProviderClient::new(&config.provider)?;
        Self::new(Arc::new(db), Arc::new(provider), config)
    }

    /// Store backing this coordinator
    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// In-flight provider call gauge
    pub fn fetch_gauge(&self) -> &FetchGauge {
        &self.gauge
    }

    /// Whether new jobs are accepted
    pub fn is_accepting(&self) -> bool {
        self.dispatch.accepting_new.load(Ordering::SeqCst)
    }
}
