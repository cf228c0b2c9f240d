//! Run summary: totals, category breakdowns, and failed identifiers.
//!
//! Breakdowns never compare raw optional values. Every category goes through
//! [`CategoryKey`] first, which turns absent or blank values into
//! [`CategoryKey::Unknown`].

use super::sections::Cell;
use crate::record::ProviderRecord;
use crate::store::ItemRow;
use crate::types::JobId;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Bucket key for a categorical attribute
///
/// Ordering puts every known value (alphabetically) before `Unknown`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CategoryKey {
    /// A reported, non-blank value
    Known(String),
    /// Absent or blank
    Unknown,
}

impl CategoryKey {
    /// Bucket an optional attribute value
    pub fn from_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => CategoryKey::Known(v.to_string()),
            _ => CategoryKey::Unknown,
        }
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryKey::Known(v) => f.write_str(v),
            CategoryKey::Unknown => f.write_str("UNKNOWN"),
        }
    }
}

/// Occurrence counts per category
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    counts: BTreeMap<CategoryKey, u64>,
}

impl CategoryCounts {
    /// Count one occurrence of `key`
    pub fn record(&mut self, key: CategoryKey) {
        *self.counts.entry(key).or_insert(0) += 1;
    }

    /// All buckets sorted by key
    pub fn by_key(&self) -> Vec<(CategoryKey, u64)> {
        self.counts.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    /// The `n` largest buckets, by count descending then key
    pub fn top(&self, n: usize) -> Vec<(CategoryKey, u64)> {
        let mut entries = self.by_key();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.truncate(n);
        entries
    }

    /// Sum of all buckets
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// One failed identifier as listed in the summary
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailedEntry {
    /// Identifier as submitted
    pub identifier: String,
    /// Terminal error kind code
    pub error: String,
    /// Attempts made
    pub attempts: u32,
}

impl From<&ItemRow> for FailedEntry {
    fn from(row: &ItemRow) -> Self {
        Self {
            identifier: row.identifier.clone(),
            error: row
                .error_kind
                .clone()
                .unwrap_or_else(|| CategoryKey::Unknown.to_string()),
            attempts: row.attempt_count(),
        }
    }
}

/// Aggregates written to the summary section
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// Job being exported
    pub job_id: JobId,
    /// Submission label, if any
    pub label: Option<String>,
    /// When the document was generated
    pub generated_at: DateTime<Utc>,
    /// Submitted identifiers
    pub submitted: u64,
    /// Succeeded items observed
    pub succeeded: u64,
    /// Breakdown by taxpayer status
    pub by_status: CategoryCounts,
    /// Breakdown by taxpayer type
    pub by_type: CategoryCounts,
    /// Failed identifiers in submission order
    pub failures: Vec<FailedEntry>,
}

impl RunSummary {
    /// Start an empty summary for a job
    pub fn new(job_id: JobId, label: Option<String>, submitted: u64) -> Self {
        Self {
            job_id,
            label,
            generated_at: Utc::now(),
            submitted,
            succeeded: 0,
            by_status: CategoryCounts::default(),
            by_type: CategoryCounts::default(),
            failures: Vec::new(),
        }
    }

    /// Fold one succeeded record into the breakdowns
    pub fn observe(&mut self, record: &ProviderRecord) {
        self.succeeded += 1;
        self.by_status
            .record(CategoryKey::from_value(record.taxpayer_status()));
        self.by_type
            .record(CategoryKey::from_value(record.taxpayer_type()));
    }

    /// Attach the failed items
    pub fn with_failures(mut self, failed: &[ItemRow]) -> Self {
        self.failures = failed.iter().map(FailedEntry::from).collect();
        self
    }

    /// Failed count
    pub fn failed(&self) -> u64 {
        self.failures.len() as u64
    }

    /// Rows of the summary section
    pub fn rows(&self, top_n: usize) -> Vec<Vec<Cell>> {
        let mut rows = vec![
            vec![Cell::text("Batch lookup report")],
            vec![Cell::text("Job"), Cell::int(self.job_id.0)],
            vec![
                Cell::text("Source"),
                Cell::text(self.label.as_deref().unwrap_or("")),
            ],
            vec![
                Cell::text("Generated at"),
                Cell::text(self.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
            ],
            vec![Cell::text("Submitted"), Cell::count(self.submitted)],
            vec![Cell::text("Succeeded"), Cell::count(self.succeeded)],
            vec![Cell::text("Failed"), Cell::count(self.failed())],
            vec![],
            vec![Cell::text("Taxpayer status"), Cell::text("Count")],
        ];

        for (key, count) in self.by_status.by_key() {
            rows.push(vec![Cell::text(key.to_string()), Cell::count(count)]);
        }

        rows.push(vec![]);
        rows.push(vec![
            Cell::text(format!("Taxpayer type (top {top_n})")),
            Cell::text("Count"),
        ]);
        for (key, count) in self.by_type.top(top_n) {
            rows.push(vec![Cell::text(key.to_string()), Cell::count(count)]);
        }

        rows.push(vec![]);
        rows.push(vec![
            Cell::text("Failed identifier"),
            Cell::text("Error"),
            Cell::text("Attempts"),
        ]);
        for failure in &self.failures {
            rows.push(vec![
                Cell::text(failure.identifier.clone()),
                Cell::text(failure.error.clone()),
                Cell::count(u64::from(failure.attempts)),
            ]);
        }

        rows
    }
}
