//! Job runner: fans a job's items out over a bounded worker set, detects
//! completion from store counts, then hands the job to the export pipeline.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::BatchCoordinator;
use super::worker::{self, ItemOutcome, WorkerContext};
use crate::types::{JobId, JobState};

/// How long an idle worker waits on the queue before re-checking counts
const IDLE_RECHECK_INTERVAL: Duration = Duration::from_millis(500);

type ItemQueue = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<i64>>>;

impl BatchCoordinator {
    /// Spawn the runner for `job_id` unless one is already live
    ///
    /// Returns `false` when the job was already being dispatched.
    pub(crate) async fn spawn_runner(&self, job_id: JobId) -> bool {
        {
            let mut active = self.dispatch.active_jobs.lock().await;
            if !active.insert(job_id) {
                tracing::debug!(job_id = job_id.0, "Job already dispatched");
                return false;
            }
        }

        let coordinator = self.clone();
        tokio::spawn(async move {
            coordinator.run_job(job_id).await;
            coordinator.dispatch.active_jobs.lock().await.remove(&job_id);
        });
        true
    }

    /// Drive one RUNNING job to COMPLETED and export it
    async fn run_job(&self, job_id: JobId) {
        let pending = match self.store.pending_item_ids(job_id).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(job_id = job_id.0, error = %e, "Failed to load pending items");
                return;
            }
        };

        if !pending.is_empty() {
            self.dispatch_items(job_id, pending).await;
        }

        if self.dispatch.shutdown.is_cancelled() {
            tracing::info!(job_id = job_id.0, "Shutdown in progress, job left for restore");
            return;
        }

        match self.store.item_counts(job_id).await {
            Ok(counts) if counts.pending == 0 => {}
            Ok(counts) => {
                tracing::warn!(
                    job_id = job_id.0,
                    pending = counts.pending,
                    "Workers stopped with items still pending"
                );
                return;
            }
            Err(e) => {
                tracing::error!(job_id = job_id.0, error = %e, "Failed to read item counts");
                return;
            }
        }

        self.finish_job(job_id).await;
    }

    /// Run `min(max_concurrent_fetches, items)` workers until no item is pending
    async fn dispatch_items(&self, job_id: JobId, pending: Vec<i64>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker_count = self.config.batch.max_concurrent_fetches.min(pending.len());

        for item_id in pending {
            // Receiver is alive until the workers below exit
            let _ = tx.send(item_id);
        }

        let queue: ItemQueue = Arc::new(tokio::sync::Mutex::new(rx));
        let done = CancellationToken::new();
        let ctx = WorkerContext {
            job_id,
            store: Arc::clone(&self.store),
            provider: Arc::clone(&self.provider),
            fetch_limit: Arc::clone(&self.dispatch.fetch_limit),
            gauge: self.gauge.clone(),
            policy: self.policy,
            fetch_timeout: self.config.batch.fetch_timeout,
            shutdown: self.dispatch.shutdown.clone(),
        };

        tracing::info!(job_id = job_id.0, workers = worker_count, "Dispatching job items");

        let workers = (0..worker_count).map(|_| {
            let ctx = ctx.clone();
            let queue = Arc::clone(&queue);
            let requeue = tx.clone();
            let done = done.clone();
            let shutdown = self.dispatch.shutdown.clone();
            tokio::spawn(async move { worker_loop(ctx, queue, requeue, done, shutdown).await })
        });

        for joined in join_all(workers).await {
            if let Err(e) = joined {
                tracing::error!(job_id = job_id.0, error = %e, "Worker task ended abnormally");
            }
        }
    }

    /// COMPLETED, then export; FAILED if no document could be produced
    async fn finish_job(&self, job_id: JobId) {
        match self.store.set_job_completed(job_id).await {
            Ok(true) => tracing::info!(job_id = job_id.0, "Job completed"),
            Ok(false) => {}
            Err(e) => {
                tracing::error!(job_id = job_id.0, error = %e, "Failed to mark job completed");
                return;
            }
        }

        let job = match self.store.get_job(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(job_id = job_id.0, error = %e, "Failed to reload job");
                return;
            }
        };

        if job.job_state() != JobState::Completed || job.result_path.is_some() {
            return;
        }

        let message = match self.exporter.export(self.store.as_ref(), &job).await {
            Ok(written) => {
                match self
                    .store
                    .set_export_result(job_id, written.format, &written.path, written.size_bytes)
                    .await
                {
                    Ok(()) => return,
                    Err(e) => format!("failed to record export: {e}"),
                }
            }
            Err(e) => format!("export failed: {e}"),
        };

        tracing::error!(job_id = job_id.0, error = %message, "Job export failed");
        if let Err(e) = self.store.set_job_failed(job_id, &message).await {
            tracing::error!(job_id = job_id.0, error = %e, "Failed to mark job failed");
        }
    }
}

/// One worker: take item ids off the queue until the job is done or shutdown starts
async fn worker_loop(
    ctx: WorkerContext,
    queue: ItemQueue,
    requeue: mpsc::UnboundedSender<i64>,
    done: CancellationToken,
    shutdown: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = done.cancelled() => break,
            next = tokio::time::timeout(IDLE_RECHECK_INTERVAL, async {
                queue.lock().await.recv().await
            }) => next,
        };

        let item_id = match next {
            Ok(Some(item_id)) => item_id,
            Ok(None) => break,
            Err(_) => {
                // Idle: items may be waiting out a backoff, or already terminal
                check_done(&ctx, &done).await;
                continue;
            }
        };

        let execution = {
            let ctx = ctx.clone();
            tokio::spawn(async move { worker::execute(&ctx, item_id).await })
        };

        let outcome = match execution.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    job_id = ctx.job_id.0,
                    item_id,
                    error = %e,
                    "Fetch execution panicked"
                );
                worker::record_crash(&ctx, item_id).await
            }
        };

        if let ItemOutcome::Retry { delay } = outcome {
            schedule_retry(requeue.clone(), item_id, delay, shutdown.clone());
        }

        check_done(&ctx, &done).await;
    }
}

/// Signal every worker of the job to stop once no item is pending
async fn check_done(ctx: &WorkerContext, done: &CancellationToken) {
    match ctx.store.item_counts(ctx.job_id).await {
        Ok(counts) if counts.pending == 0 => done.cancel(),
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(job_id = ctx.job_id.0, error = %e, "Failed to read item counts");
        }
    }
}

/// Re-enqueue `item_id` after `delay` without holding a worker or a permit
fn schedule_retry(
    requeue: mpsc::UnboundedSender<i64>,
    item_id: i64,
    delay: Duration,
    shutdown: CancellationToken,
) {
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = tokio::time::sleep(delay) => {
                if requeue.send(item_id).is_err() {
                    tracing::debug!(item_id, "Job queue closed before retry");
                }
            }
        }
    });
}
