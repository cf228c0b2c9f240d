//! Scripted provider and record fixtures

use async_trait::async_trait;
use provider_batch::record::GeneralInfo;
use provider_batch::{FetchErrorKind, ProviderClient, ProviderRecord};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Identifiers `ID00000..`, zero-padded so submission and sort order agree
pub fn identifiers(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("ID{i:05}")).collect()
}

/// Active SAC record whose legal name is derived from the identifier
pub fn record_for(identifier: &str) -> ProviderRecord {
    ProviderRecord {
        general: Some(GeneralInfo {
            legal_name: Some(format!("COMPANY {identifier}")),
            taxpayer_status: Some("ACTIVE".into()),
            taxpayer_type: Some("SAC".into()),
            ..Default::default()
        }),
        partners: Some(vec![]),
        representatives: Some(vec![]),
        admin_roles: Some(vec![]),
    }
}

/// What the provider does for one identifier
#[derive(Clone, Debug)]
pub enum Behavior {
    /// Return [`record_for`]
    Succeed,
    /// Return a record without a taxpayer type
    SucceedWithoutType,
    /// Always fail with this kind
    Fail(FetchErrorKind),
    /// Never answer within any reasonable fetch timeout
    Hang,
}

/// Provider with per-identifier behavior, call counting and in-flight tracking
pub struct ScriptedProvider {
    behaviors: HashMap<String, Behavior>,
    delay: Duration,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fail_first: Mutex<HashSet<String>>,
}

impl ScriptedProvider {
    /// Every identifier succeeds immediately
    pub fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
            delay: Duration::ZERO,
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            fail_first: Mutex::new(HashSet::new()),
        }
    }

    /// Override the behavior for one identifier
    pub fn with(mut self, identifier: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(identifier.to_string(), behavior);
        self
    }

    /// Sleep this long inside every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// First call for `identifier` fails with a server error, later calls succeed
    pub fn fail_once(self, identifier: &str) -> Self {
        self.fail_first
            .lock()
            .expect("fail_first lock")
            .insert(identifier.to_string());
        self
    }

    /// Calls made for one identifier
    pub fn calls_for(&self, identifier: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .get(identifier)
            .copied()
            .unwrap_or(0)
    }

    /// Calls made in total
    pub fn total_calls(&self) -> usize {
        self.calls.lock().expect("calls lock").values().sum()
    }

    /// Highest number of simultaneous calls observed
    pub fn max_in_flight(&self) -> usize {
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
impl ProviderClient for ScriptedProvider {
    async fn fetch(&self, identifier: &str) -> Result<ProviderRecord, FetchErrorKind> {
        *self
            .calls
            .lock()
            .expect("calls lock")
            .entry(identifier.to_string())
            .or_insert(0) += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self
            .fail_first
            .lock()
            .expect("fail_first lock")
            .remove(identifier)
        {
            return Err(FetchErrorKind::ServerError);
        }

        match self
            .behaviors
            .get(identifier)
            .cloned()
            .unwrap_or(Behavior::Succeed)
        {
            Behavior::Succeed => Ok(record_for(identifier)),
            Behavior::SucceedWithoutType => {
                let mut record = record_for(identifier);
                if let Some(general) = record.general.as_mut() {
                    general.taxpayer_type = None;
                }
                Ok(record)
            }
            Behavior::Fail(kind) => Err(kind),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(FetchErrorKind::Timeout)
            }
        }
    }
}
