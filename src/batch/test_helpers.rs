//! Shared test helpers for creating BatchCoordinator instances in tests.

use crate::batch::BatchCoordinator;
use crate::config::Config;
use crate::db::Database;
use crate::error::{DatabaseError, Error, Result};
use crate::provider::ProviderClient;
use crate::record::{GeneralInfo, ProviderRecord};
use crate::store::{ItemRow, JobRow, JobStore, ResultRow};
use crate::types::{ExportFormat, FetchErrorKind, ItemCounts, JobId, JobState};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::{TempDir, tempdir};

type Reply = std::result::Result<ProviderRecord, FetchErrorKind>;

/// Scripted provider: per-identifier replies, then a default
pub(crate) struct MockProvider {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    fallback: Option<FetchErrorKind>,
    delay: Option<Duration>,
    panic_once: Mutex<HashSet<String>>,
    panic_always: HashSet<String>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockProvider {
    /// Every call succeeds with [`sample_record`]
    pub(crate) fn succeeding() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback: None,
            delay: None,
            panic_once: Mutex::new(HashSet::new()),
            panic_always: HashSet::new(),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Every unscripted call fails with `kind`
    pub(crate) fn failing(kind: FetchErrorKind) -> Self {
        Self {
            fallback: Some(kind),
            ..Self::succeeding()
        }
    }

    /// Sleep this long inside every call
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Reply to `identifier` with `replies` in order before falling back
    pub(crate) fn script(self, identifier: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(identifier.to_string(), replies.into());
        self
    }

    /// Panic on the first call for `identifier`
    pub(crate) fn panic_once(self, identifier: &str) -> Self {
        self.panic_once
            .lock()
            .unwrap()
            .insert(identifier.to_string());
        self
    }

    /// Panic on every call for `identifier`
    pub(crate) fn panic_always(mut self, identifier: &str) -> Self {
        self.panic_always.insert(identifier.to_string());
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    async fn fetch(&self, identifier: &str) -> Reply {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.panic_always.contains(identifier) {
            panic!("scripted panic for {identifier}");
        }

        if self.panic_once.lock().unwrap().remove(identifier) {
            panic!("scripted panic for {identifier}");
        }

        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(identifier)
            .and_then(VecDeque::pop_front);

        match scripted {
            Some(reply) => reply,
            None => match self.fallback {
                Some(kind) => Err(kind),
                None => Ok(sample_record(identifier)),
            },
        }
    }
}

/// Record whose legal name is derived from the identifier
pub(crate) fn sample_record(identifier: &str) -> ProviderRecord {
    ProviderRecord {
        general: Some(GeneralInfo {
            legal_name: Some(format!("COMPANY {identifier}")),
            taxpayer_status: Some("ACTIVE".into()),
            taxpayer_type: Some("SAC".into()),
            ..Default::default()
        }),
        partners: Some(vec![]),
        representatives: None,
        admin_roles: None,
    }
}

/// Config rooted in a temp dir with fast retries
pub(crate) fn test_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = temp_dir.path().join("test.db");
    config.export.export_dir = temp_dir.path().join("exports");
    config.batch.max_concurrent_fetches = 4;
    config.batch.retry_base_delay = Duration::from_millis(10);
    config.batch.fetch_timeout = Duration::from_secs(5);
    config.batch.shutdown_grace = Duration::from_secs(5);
    config
}

/// Coordinator over a fresh SQLite store and the given provider.
/// Returns the coordinator and the tempdir (which must be kept alive).
pub(crate) async fn create_test_coordinator(
    provider: Arc<MockProvider>,
    configure: impl FnOnce(&mut Config),
) -> (BatchCoordinator, TempDir) {
    let temp_dir = tempdir().unwrap();
    let mut config = test_config(&temp_dir);
    configure(&mut config);

    let db = Database::new(&config.persistence.database_path)
        .await
        .unwrap();
    let provider: Arc<dyn ProviderClient> = provider;
    let coordinator = BatchCoordinator::new(Arc::new(db), provider, config).unwrap();
    (coordinator, temp_dir)
}

/// Identifiers `ID0..IDn`
pub(crate) fn identifiers(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("ID{i}")).collect()
}

/// Store that fails a set number of item writes before delegating to SQLite
pub(crate) struct FlakyStore {
    inner: Database,
    outcome_failures: AtomicUsize,
    release_failures: AtomicUsize,
    releases: AtomicUsize,
}

impl FlakyStore {
    pub(crate) fn new(inner: Database) -> Self {
        Self {
            inner,
            outcome_failures: AtomicUsize::new(0),
            release_failures: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        }
    }

    /// Fail the next `n` outcome writes (succeeded, failed, retry)
    pub(crate) fn fail_outcomes(self, n: usize) -> Self {
        self.outcome_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Fail the next `n` releases
    pub(crate) fn fail_releases(self, n: usize) -> Self {
        self.release_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Release calls seen, failed ones included
    pub(crate) fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    fn trip(counter: &AtomicUsize, what: &str) -> Result<()> {
        let tripped = counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if tripped {
            return Err(Error::Database(DatabaseError::QueryFailed(format!(
                "{what}: database is locked"
            ))));
        }
        Ok(())
    }
}

#[async_trait]
impl JobStore for FlakyStore {
    async fn create_job(&self, label: Option<&str>, identifiers: &[String]) -> Result<JobId> {
        self.inner.create_job(label, identifiers).await
    }

    async fn get_job(&self, id: JobId) -> Result<Option<JobRow>> {
        self.inner.get_job(id).await
    }

    async fn item_counts(&self, id: JobId) -> Result<ItemCounts> {
        self.inner.item_counts(id).await
    }

    async fn set_job_running(&self, id: JobId) -> Result<bool> {
        self.inner.set_job_running(id).await
    }

    async fn set_job_completed(&self, id: JobId) -> Result<bool> {
        self.inner.set_job_completed(id).await
    }

    async fn set_job_failed(&self, id: JobId, message: &str) -> Result<bool> {
        self.inner.set_job_failed(id, message).await
    }

    async fn set_export_result(
        &self,
        id: JobId,
        format: ExportFormat,
        path: &Path,
        size_bytes: u64,
    ) -> Result<()> {
        self.inner
            .set_export_result(id, format, path, size_bytes)
            .await
    }

    async fn pending_item_ids(&self, id: JobId) -> Result<Vec<i64>> {
        self.inner.pending_item_ids(id).await
    }

    async fn get_item(&self, item_id: i64) -> Result<Option<ItemRow>> {
        self.inner.get_item(item_id).await
    }

    async fn claim_item(&self, item_id: i64) -> Result<Option<ItemRow>> {
        self.inner.claim_item(item_id).await
    }

    async fn mark_item_succeeded(&self, item_id: i64, payload: &str) -> Result<bool> {
        Self::trip(&self.outcome_failures, "mark_item_succeeded")?;
        self.inner.mark_item_succeeded(item_id, payload).await
    }

    async fn mark_item_failed(&self, item_id: i64, kind: FetchErrorKind) -> Result<bool> {
        Self::trip(&self.outcome_failures, "mark_item_failed")?;
        self.inner.mark_item_failed(item_id, kind).await
    }

    async fn mark_item_retry(&self, item_id: i64, kind: FetchErrorKind) -> Result<bool> {
        Self::trip(&self.outcome_failures, "mark_item_retry")?;
        self.inner.mark_item_retry(item_id, kind).await
    }

    async fn release_item(&self, item_id: i64) -> Result<bool> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Self::trip(&self.release_failures, "release_item")?;
        self.inner.release_item(item_id).await
    }

    async fn release_in_progress(&self, id: JobId) -> Result<u64> {
        self.inner.release_in_progress(id).await
    }

    async fn jobs_in_state(&self, state: JobState) -> Result<Vec<JobRow>> {
        self.inner.jobs_in_state(state).await
    }

    async fn succeeded_page(
        &self,
        id: JobId,
        after_position: i64,
        limit: u32,
    ) -> Result<Vec<ResultRow>> {
        self.inner.succeeded_page(id, after_position, limit).await
    }

    async fn failed_items(&self, id: JobId) -> Result<Vec<ItemRow>> {
        self.inner.failed_items(id).await
    }
}

/// Coordinator over a [`FlakyStore`] built by `wrap`
pub(crate) async fn create_flaky_coordinator(
    provider: Arc<MockProvider>,
    wrap: impl FnOnce(FlakyStore) -> FlakyStore,
) -> (BatchCoordinator, Arc<FlakyStore>, TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(&temp_dir);

    let db = Database::new(&config.persistence.database_path)
        .await
        .unwrap();
    let store = Arc::new(wrap(FlakyStore::new(db)));
    let provider: Arc<dyn ProviderClient> = provider;
    let coordinator = BatchCoordinator::new(store.clone(), provider, config).unwrap();
    (coordinator, store, temp_dir)
}
