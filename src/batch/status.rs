//! Progress snapshots and result retrieval.

use std::time::Duration;

use super::BatchCoordinator;
use crate::error::{Error, Result};
use crate::store::{JobRow, timestamp_to_datetime};
use crate::types::{ExportDocument, ItemCounts, JobId, JobState, JobStatus};

impl BatchCoordinator {
    /// Current progress of a job
    ///
    /// Counts are derived from item rows on every call, so
    /// `completed + failed + pending == total` holds in each snapshot.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for an unknown job id.
    pub async fn get_status(&self, id: JobId) -> Result<JobStatus> {
        let job = self.load_job(id).await?;
        let counts = self.store.item_counts(id).await?;
        Ok(snapshot(&job, counts))
    }

    /// The export document of a finished job
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] for an unknown job id
    /// - [`Error::NotReady`] while the job is CREATED or RUNNING, or COMPLETED
    ///   with its export still being written
    /// - [`Error::ExportFailed`] when the job is FAILED
    pub async fn get_result(&self, id: JobId) -> Result<ExportDocument> {
        let job = self.load_job(id).await?;

        match job.job_state() {
            JobState::Created => Err(not_ready(id, "created")),
            JobState::Running => Err(not_ready(id, "running")),
            JobState::Failed => Err(Error::ExportFailed {
                id: id.0,
                message: job
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "no export was produced".to_string()),
            }),
            JobState::Completed => {
                let (Some(path), Some(format)) = (job.result_file(), job.format()) else {
                    return Err(not_ready(id, "exporting"));
                };

                let bytes = tokio::fs::read(&path).await?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| format!("job-{}.{}", id, format.extension()));

                Ok(ExportDocument {
                    content_length: bytes.len() as u64,
                    bytes,
                    format,
                    file_name,
                })
            }
        }
    }

    /// Poll [`get_status`](Self::get_status) until the job is FAILED, or
    /// COMPLETED with its export recorded
    ///
    /// Observes only; in-flight work is unaffected when the wait gives up.
    ///
    /// # Errors
    ///
    /// [`Error::NotReady`] if `timeout` elapses first.
    pub async fn wait_for_terminal(
        &self,
        id: JobId,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<JobStatus> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let status = self.get_status(id).await?;
            let finished = match status.state {
                JobState::Failed => true,
                JobState::Completed => status.export_format.is_some(),
                JobState::Created | JobState::Running => false,
            };
            if finished {
                return Ok(status);
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(not_ready(id, &format!("{:?}", status.state).to_lowercase()));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    async fn load_job(&self, id: JobId) -> Result<JobRow> {
        self.store
            .get_job(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("job {id}")))
    }
}

fn not_ready(id: JobId, state: &str) -> Error {
    Error::NotReady {
        id: id.0,
        state: state.to_string(),
    }
}

/// Build the status snapshot for a job row and its counts
pub(crate) fn snapshot(job: &JobRow, counts: ItemCounts) -> JobStatus {
    let total = job.total.max(0) as u64;
    let terminal = counts.completed + counts.failed;
    let progress_percentage = if total == 0 {
        100
    } else {
        (terminal.min(total) * 100 / total) as u8
    };

    JobStatus {
        id: job.job_id(),
        label: job.label.clone(),
        state: job.job_state(),
        total,
        completed: counts.completed,
        failed: counts.failed,
        pending: counts.pending,
        progress_percentage,
        export_format: job.format(),
        error: job.error_message.clone(),
        created_at: timestamp_to_datetime(job.created_at),
        started_at: job.started_at.map(timestamp_to_datetime),
        completed_at: job.completed_at.map(timestamp_to_datetime),
    }
}
