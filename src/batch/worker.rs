//! Fetch worker: one provider call for one item, recorded as a store transition.
//!
//! Item transitions:
//!
//! ```text
//! PENDING --claim--> IN_PROGRESS --ok----------------------------> SUCCEEDED
//!                                --permanent / retries exhausted-> FAILED
//!                                --transient, attempts left------> PENDING (re-enqueued after backoff)
//!                                --panicked----------------------> as a server_error failure
//!                                --interrupted-------------------> PENDING (attempt not counted)
//! ```

use super::FetchGauge;
use crate::provider::ProviderClient;
use crate::record::ProviderRecord;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::error::Result;
use crate::store::JobStore;
use crate::types::{FetchErrorKind, ItemStatus, JobId};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Upper bound on the backoff multiplier while a release keeps failing
const RELEASE_BACKOFF_CAP: u32 = 10;

/// What happened to an item in one execution
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Record stored, item SUCCEEDED
    Succeeded,
    /// Item FAILED with this kind
    Failed(FetchErrorKind),
    /// Item is PENDING again and must be re-enqueued after `delay`
    Retry {
        /// Backoff before the next claim
        delay: Duration,
    },
    /// Another execution owns the item; nothing was done
    Skipped,
}

/// Everything one execution needs, cloned into each spawned execution
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub(crate) job_id: JobId,
    pub(crate) store: Arc<dyn JobStore>,
    pub(crate) provider: Arc<dyn ProviderClient>,
    pub(crate) fetch_limit: Arc<tokio::sync::Semaphore>,
    pub(crate) gauge: FetchGauge,
    pub(crate) policy: RetryPolicy,
    pub(crate) fetch_timeout: Duration,
    pub(crate) shutdown: CancellationToken,
}

/// Claim, fetch, and record one item
///
/// Never returns an error: store failures after a claim release the item and
/// ask for a retry, so it cannot be left IN_PROGRESS.
pub(crate) async fn execute(ctx: &WorkerContext, item_id: i64) -> ItemOutcome {
    let item = match ctx.store.claim_item(item_id).await {
        Ok(Some(item)) => item,
        Ok(None) => {
            tracing::debug!(job_id = ctx.job_id.0, item_id, "Item already claimed, skipping");
            return ItemOutcome::Skipped;
        }
        Err(e) => {
            tracing::warn!(job_id = ctx.job_id.0, item_id, error = %e, "Failed to claim item");
            return ItemOutcome::Retry {
                delay: ctx.policy.backoff(1),
            };
        }
    };

    let attempt = item.attempt_count();
    let fetched = fetch_bounded(ctx, &item.identifier).await;

    let recorded = match fetched {
        Ok(record) => match serde_json::to_string(&record) {
            Ok(payload) => ctx
                .store
                .mark_item_succeeded(item.id, &payload)
                .await
                .map(|applied| (applied, ItemOutcome::Succeeded)),
            Err(e) => {
                tracing::warn!(job_id = ctx.job_id.0, item_id, error = %e, "Record could not be encoded");
                ctx.store
                    .mark_item_failed(item.id, FetchErrorKind::Malformed)
                    .await
                    .map(|applied| (applied, ItemOutcome::Failed(FetchErrorKind::Malformed)))
            }
        },
        Err(kind) => record_failure(ctx, item.id, attempt, kind).await,
    };

    settle(ctx, item.id, recorded).await
}

/// Record a panicked execution as a `server_error` failure of its claimed attempt
///
/// The attempt stays counted, so an identifier that always crashes the
/// provider reaches FAILED once retries are exhausted.
pub(crate) async fn record_crash(ctx: &WorkerContext, item_id: i64) -> ItemOutcome {
    let item = match ctx.store.get_item(item_id).await {
        Ok(Some(item)) => item,
        Ok(None) => return ItemOutcome::Skipped,
        Err(e) => {
            tracing::error!(job_id = ctx.job_id.0, item_id, error = %e, "Failed to load crashed item");
            release_until_applied(ctx, item_id).await;
            return ItemOutcome::Retry {
                delay: ctx.policy.backoff(1),
            };
        }
    };

    match item.item_status() {
        ItemStatus::InProgress => {}
        // Crashed before the claim landed
        ItemStatus::Pending => {
            return ItemOutcome::Retry {
                delay: ctx.policy.backoff(1),
            };
        }
        ItemStatus::Succeeded | ItemStatus::Failed => return ItemOutcome::Skipped,
    }

    let recorded = record_failure(
        ctx,
        item_id,
        item.attempt_count(),
        FetchErrorKind::ServerError,
    )
    .await;
    settle(ctx, item_id, recorded).await
}

/// Apply the retry policy to a failed attempt
async fn record_failure(
    ctx: &WorkerContext,
    item_id: i64,
    attempt: u32,
    kind: FetchErrorKind,
) -> Result<(bool, ItemOutcome)> {
    match ctx.policy.decide(attempt, kind) {
        RetryDecision::Retry { delay } => {
            tracing::debug!(
                job_id = ctx.job_id.0,
                item_id,
                attempt,
                error_kind = %kind,
                delay_ms = delay.as_millis() as u64,
                "Transient failure, retrying after backoff"
            );
            ctx.store
                .mark_item_retry(item_id, kind)
                .await
                .map(|applied| (applied, ItemOutcome::Retry { delay }))
        }
        RetryDecision::GiveUp => {
            tracing::info!(
                job_id = ctx.job_id.0,
                item_id,
                attempt,
                error_kind = %kind,
                "Item failed"
            );
            ctx.store
                .mark_item_failed(item_id, kind)
                .await
                .map(|applied| (applied, ItemOutcome::Failed(kind)))
        }
    }
}

/// Turn a recorded transition into an outcome, releasing the claim if the store refused it
async fn settle(
    ctx: &WorkerContext,
    item_id: i64,
    recorded: Result<(bool, ItemOutcome)>,
) -> ItemOutcome {
    match recorded {
        Ok((true, outcome)) => outcome,
        Ok((false, _)) => {
            tracing::warn!(
                job_id = ctx.job_id.0,
                item_id,
                "Item left IN_PROGRESS before its outcome was recorded"
            );
            ItemOutcome::Skipped
        }
        Err(e) => {
            tracing::error!(
                job_id = ctx.job_id.0,
                item_id,
                error = %e,
                "Failed to record item outcome, releasing claim"
            );
            release_until_applied(ctx, item_id).await;
            ItemOutcome::Retry {
                delay: ctx.policy.backoff(1),
            }
        }
    }
}

/// Put a claimed item back to PENDING, retrying with backoff until the store accepts it
///
/// Gives up only when shutdown starts; restore releases whatever is still
/// IN_PROGRESS on the next start.
pub(crate) async fn release_until_applied(ctx: &WorkerContext, item_id: i64) {
    let mut failures: u32 = 0;
    loop {
        match ctx.store.release_item(item_id).await {
            Ok(_) => return,
            Err(e) => {
                failures = failures.saturating_add(1);
                let delay = ctx.policy.backoff(failures.min(RELEASE_BACKOFF_CAP));
                tracing::error!(
                    job_id = ctx.job_id.0,
                    item_id,
                    failures,
                    error = %e,
                    "Failed to release item, retrying"
                );
                tokio::select! {
                    _ = ctx.shutdown.cancelled() => {
                        tracing::warn!(job_id = ctx.job_id.0, item_id, "Shutdown while releasing item, left for restore");
                        return;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

/// Provider call under the global permit, the gauge, and the per-call timeout
///
/// The permit and gauge guard are released before the caller touches the store.
async fn fetch_bounded(
    ctx: &WorkerContext,
    identifier: &str,
) -> std::result::Result<ProviderRecord, FetchErrorKind> {
    let Ok(_permit) = ctx.fetch_limit.acquire().await else {
        tracing::warn!(job_id = ctx.job_id.0, "Fetch limiter closed");
        return Err(FetchErrorKind::ServerError);
    };
    let _in_flight = ctx.gauge.enter();

    match tokio::time::timeout(ctx.fetch_timeout, ctx.provider.fetch(identifier)).await {
        Ok(result) => result,
        Err(_) => Err(FetchErrorKind::Timeout),
    }
}
