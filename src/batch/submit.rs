//! Input validation and job creation.

use super::BatchCoordinator;
use crate::error::{Error, Result};
use crate::types::JobId;

impl BatchCoordinator {
    /// Submit an identifier list as a new job
    ///
    /// See [`create_job_with_label`](Self::create_job_with_label).
    pub async fn create_job(&self, identifiers: &[String]) -> Result<JobId> {
        self.create_job_with_label(None, identifiers).await
    }

    /// Submit an identifier list with a label shown in the export summary
    ///
    /// Identifiers are trimmed; duplicates are kept as separate items. The job
    /// and its items are persisted in one transaction, the job is moved to
    /// RUNNING, and its runner is spawned before this returns.
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] once shutdown has begun
    /// - [`Error::InvalidInput`] for an empty list, a list longer than
    ///   `batch.max_identifiers`, or a blank identifier; the store is not touched
    pub async fn create_job_with_label(
        &self,
        label: Option<&str>,
        identifiers: &[String],
    ) -> Result<JobId> {
        if !self.is_accepting() {
            return Err(Error::ShuttingDown);
        }

        let identifiers = normalize_identifiers(identifiers, self.config.batch.max_identifiers)?;
        let label = label.map(str::trim).filter(|l| !l.is_empty());

        let id = self.store.create_job(label, &identifiers).await?;
        self.store.set_job_running(id).await?;

        tracing::info!(
            job_id = id.0,
            total = identifiers.len(),
            label = label.unwrap_or(""),
            "Job submitted"
        );

        self.spawn_runner(id).await;
        Ok(id)
    }
}

/// Trim identifiers and enforce list bounds
pub(crate) fn normalize_identifiers(identifiers: &[String], max: usize) -> Result<Vec<String>> {
    if identifiers.is_empty() {
        return Err(Error::InvalidInput("identifier list is empty".to_string()));
    }
    if identifiers.len() > max {
        return Err(Error::InvalidInput(format!(
            "{} identifiers submitted, the limit is {}",
            identifiers.len(),
            max
        )));
    }

    identifiers
        .iter()
        .enumerate()
        .map(|(position, raw)| {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                Err(Error::InvalidInput(format!(
                    "identifier at position {position} is blank"
                )))
            } else {
                Ok(trimmed.to_string())
            }
        })
        .collect()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn list(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_trims_and_keeps_duplicates() {
        let ids = normalize_identifiers(&list(&[" 2010 ", "2010", "X9\t"]), 10).unwrap();
        assert_eq!(ids, list(&["2010", "2010", "X9"]));
    }

    #[test]
    fn test_normalize_rejects_empty_list() {
        assert!(matches!(
            normalize_identifiers(&[], 10),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_normalize_rejects_oversized_list() {
        let ids = list(&["A", "B", "C"]);
        assert!(normalize_identifiers(&ids, 3).is_ok());
        let err = normalize_identifiers(&ids, 2).unwrap_err();
        assert!(err.to_string().contains("limit is 2"));
    }

    #[test]
    fn test_normalize_rejects_blank_identifier() {
        let err = normalize_identifiers(&list(&["A", "  "]), 10).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref m) if m.contains("position 1")));
    }
}
