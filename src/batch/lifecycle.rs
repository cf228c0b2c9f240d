//! Startup restore and shutdown coordination.

use std::sync::atomic::Ordering;
use std::time::Duration;

use super::BatchCoordinator;
use crate::error::Result;
use crate::types::JobState;

/// Interval between checks for live runners during shutdown
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(100);

impl BatchCoordinator {
    /// Resume jobs interrupted by a previous process
    ///
    /// - RUNNING jobs have their IN_PROGRESS items released (the interrupted
    ///   attempt is not counted) and are dispatched again
    /// - COMPLETED jobs without an export are marked FAILED; exports are not
    ///   resumed, the list must be resubmitted
    /// - CREATED jobs are started
    ///
    /// Returns the number of jobs dispatched.
    pub async fn restore_jobs(&self) -> Result<usize> {
        let mut dispatched = 0;

        for job in self.store.jobs_in_state(JobState::Running).await? {
            let id = job.job_id();
            let released = self.store.release_in_progress(id).await?;
            tracing::info!(job_id = id.0, released, "Restoring running job");
            if self.spawn_runner(id).await {
                dispatched += 1;
            }
        }

        for job in self.store.jobs_in_state(JobState::Completed).await? {
            if job.result_path.is_some() {
                continue;
            }
            let id = job.job_id();
            let active = self.dispatch.active_jobs.lock().await.contains(&id);
            if active {
                continue;
            }
            tracing::warn!(job_id = id.0, "Export was interrupted, marking job failed");
            self.store
                .set_job_failed(
                    id,
                    "export interrupted by restart; resubmit the identifier list",
                )
                .await?;
        }

        for job in self.store.jobs_in_state(JobState::Created).await? {
            let id = job.job_id();
            self.store.set_job_running(id).await?;
            tracing::info!(job_id = id.0, "Starting job left in created state");
            if self.spawn_runner(id).await {
                dispatched += 1;
            }
        }

        if dispatched > 0 {
            tracing::info!(dispatched, "Restored {} job(s)", dispatched);
        } else {
            tracing::debug!("No jobs to restore");
        }

        Ok(dispatched)
    }

    /// Gracefully shut down dispatching
    ///
    /// 1. Stops accepting new jobs
    /// 2. Signals runners to stop claiming items
    /// 3. Waits up to `batch.shutdown_grace` for in-flight executions
    ///
    /// Unclaimed items stay PENDING and are picked up by
    /// [`restore_jobs`](Self::restore_jobs) on the next start. Jobs are not
    /// cancelled.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.dispatch.accepting_new.store(false, Ordering::SeqCst);
        self.dispatch.shutdown.cancel();
        tracing::info!("Stopped accepting new jobs");

        let grace = self.config.batch.shutdown_grace;
        match tokio::time::timeout(grace, self.wait_for_active_jobs()).await {
            Ok(()) => tracing::info!("All job runners stopped"),
            Err(_) => tracing::warn!(
                grace_secs = grace.as_secs(),
                "Timeout waiting for job runners, proceeding with shutdown"
            ),
        }

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    async fn wait_for_active_jobs(&self) {
        loop {
            let active_count = self.dispatch.active_jobs.lock().await.len();
            if active_count == 0 {
                return;
            }
            tracing::debug!(active_count, "Waiting for job runners to stop");
            tokio::time::sleep(SHUTDOWN_POLL_INTERVAL).await;
        }
    }
}
