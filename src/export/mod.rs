//! Export pipeline
//!
//! Once every item of a job is terminal, the pipeline writes one consolidated
//! document with five sections (summary, results, and three detail tables).
//! The physical format is chosen from the number of succeeded items:
//!
//! | Volume                          | Format      | Container            |
//! |---------------------------------|-------------|----------------------|
//! | `<= full_max_rows`              | `full`      | styled xlsx, in memory |
//! | `<= streaming_max_rows`         | `streaming` | plain xlsx, paged    |
//! | larger                          | `flat-text` | CSV with BOM, paged  |
//!
//! Records are read back from the store in keyset pages of `chunk_size`, so
//! only the `full` format ever holds the whole document in memory.

pub mod flat_text;
pub mod sections;
pub mod summary;
pub mod xlsx;

mod workbook;

use crate::config::ExportConfig;
use crate::error::{Error, ExportError, Result};
use crate::record::ProviderRecord;
use crate::store::{JobRow, JobStore};
use crate::types::{ExportFormat, JobId, JobState};
use flat_text::FlatTextWriter;
use sections::{Cell, Section};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use summary::RunSummary;

/// Destination for section rows, shared by every physical writer
pub trait RowSink {
    /// Start a section (new worksheet, or marker and header rows)
    fn begin_section(&mut self, section: Section) -> std::result::Result<(), ExportError>;

    /// Append one row to the current section
    fn write_row(&mut self, cells: &[Cell]) -> std::result::Result<(), ExportError>;
}

/// Choose the physical format for `volume` succeeded items
pub fn select_format(volume: u64, config: &ExportConfig) -> ExportFormat {
    if volume <= config.full_max_rows {
        ExportFormat::Full
    } else if volume <= config.streaming_max_rows {
        ExportFormat::Streaming
    } else {
        ExportFormat::FlatText
    }
}

/// A document that was written and renamed into place
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrittenExport {
    /// Format used
    pub format: ExportFormat,
    /// Final location
    pub path: PathBuf,
    /// File size
    pub size_bytes: u64,
}

/// Keyset cursor over a job's succeeded items, in submission order
pub struct PageCursor {
    job_id: JobId,
    limit: u32,
    after_position: i64,
    exhausted: bool,
}

impl PageCursor {
    /// Cursor starting before the first item
    pub fn new(job_id: JobId, limit: u32) -> Self {
        Self {
            job_id,
            limit: limit.max(1),
            after_position: -1,
            exhausted: false,
        }
    }

    /// Next page of decoded records, or `None` once the job is exhausted
    pub async fn next_page(
        &mut self,
        store: &dyn JobStore,
    ) -> Result<Option<Vec<(String, ProviderRecord)>>> {
        if self.exhausted {
            return Ok(None);
        }

        let rows = store
            .succeeded_page(self.job_id, self.after_position, self.limit)
            .await?;

        if rows.len() < self.limit as usize {
            self.exhausted = true;
        }

        let Some(last) = rows.last() else {
            return Ok(None);
        };
        self.after_position = last.position;

        let mut page = Vec::with_capacity(rows.len());
        for row in rows {
            let record = row.record()?;
            page.push((row.identifier, record));
        }
        Ok(Some(page))
    }
}

/// Writes export documents for completed jobs
#[derive(Clone, Debug)]
pub struct ExportPipeline {
    config: ExportConfig,
}

impl ExportPipeline {
    /// Create a pipeline with the given thresholds and output directory
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    /// Export settings
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Final location of a job's document
    pub fn document_path(&self, job_id: JobId, format: ExportFormat) -> PathBuf {
        self.config
            .export_dir
            .join(format!("job-{}.{}", job_id, format.extension()))
    }

    /// Write the document for a COMPLETED job
    ///
    /// The document is written to a temporary file next to its final
    /// location and renamed once complete; on error the temporary file is
    /// removed and nothing is left at the final path.
    pub async fn export(&self, store: &dyn JobStore, job: &JobRow) -> Result<WrittenExport> {
        let job_id = job.job_id();
        if job.job_state() != JobState::Completed {
            return Err(ExportError::InvalidState(format!(
                "job {} is {:?}, expected Completed",
                job_id,
                job.job_state()
            ))
            .into());
        }

        let counts = store.item_counts(job_id).await?;
        if counts.pending > 0 {
            return Err(ExportError::InvalidState(format!(
                "job {} still has {} pending items",
                job_id, counts.pending
            ))
            .into());
        }

        let format = select_format(counts.completed, &self.config);
        tokio::fs::create_dir_all(&self.config.export_dir).await?;

        let path = self.document_path(job_id, format);
        let tmp = path.with_extension(format!("{}.tmp", format.extension()));

        tracing::info!(
            job_id = job_id.0,
            format = %format,
            volume = counts.completed,
            "Exporting job results"
        );

        if let Err(e) = self.write_document(store, job, format, &tmp).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                tracing::debug!(job_id = job_id.0, error = %cleanup, "No temporary export to remove");
            }
            return Err(e);
        }

        tokio::fs::rename(&tmp, &path).await?;
        let size_bytes = tokio::fs::metadata(&path).await?.len();

        tracing::info!(
            job_id = job_id.0,
            format = %format,
            path = %path.display(),
            size_bytes,
            "Export written"
        );

        Ok(WrittenExport {
            format,
            path,
            size_bytes,
        })
    }

    async fn write_document(
        &self,
        store: &dyn JobStore,
        job: &JobRow,
        format: ExportFormat,
        target: &Path,
    ) -> Result<()> {
        let summary = self.summarize(store, job).await?;
        let job_id = job.job_id();

        match format {
            ExportFormat::Full => {
                workbook::write_full(self, store, job_id, &summary, target).await
            }
            ExportFormat::Streaming => {
                workbook::write_streaming(self, store, job_id, &summary, target).await
            }
            ExportFormat::FlatText => {
                let target = target.to_path_buf();
                let writer = blocking_write(move || {
                    let file = std::fs::File::create(&target)?;
                    FlatTextWriter::new(BufWriter::new(file))
                })
                .await?;
                let writer = self.write_sections(store, job_id, &summary, writer).await?;
                blocking_write(move || {
                    writer.finish()?.flush()?;
                    Ok(())
                })
                .await
            }
        }
    }

    /// Single pass over succeeded records building the summary aggregates
    async fn summarize(&self, store: &dyn JobStore, job: &JobRow) -> Result<RunSummary> {
        let job_id = job.job_id();
        let failed = store.failed_items(job_id).await?;
        let mut summary = RunSummary::new(job_id, job.label.clone(), job.total.max(0) as u64)
            .with_failures(&failed);

        let mut cursor = PageCursor::new(job_id, self.config.chunk_size);
        while let Some(page) = cursor.next_page(store).await? {
            for (_, record) in &page {
                summary.observe(record);
            }
        }

        Ok(summary)
    }

    /// Emit all five sections into `sink`, paging records from the store
    ///
    /// Pages are read on the runtime; every batch of row writes runs on the
    /// blocking pool and hands the sink back.
    pub(crate) async fn write_sections<S: RowSink + Send + 'static>(
        &self,
        store: &dyn JobStore,
        job_id: JobId,
        summary: &RunSummary,
        sink: S,
    ) -> Result<S> {
        let summary_rows = summary.rows(self.config.top_categories);
        let mut sink = blocking_write(move || {
            let mut sink = sink;
            sink.begin_section(Section::Summary)?;
            for row in &summary_rows {
                sink.write_row(row)?;
            }
            Ok(sink)
        })
        .await?;

        for section in Section::RECORD_SECTIONS {
            sink = blocking_write(move || {
                let mut sink = sink;
                sink.begin_section(section)?;
                Ok(sink)
            })
            .await?;

            let mut cursor = PageCursor::new(job_id, self.config.chunk_size);
            while let Some(page) = cursor.next_page(store).await? {
                sink = blocking_write(move || {
                    let mut sink = sink;
                    for (identifier, record) in &page {
                        for row in section.rows_for(identifier, record) {
                            sink.write_row(&row)?;
                        }
                    }
                    Ok(sink)
                })
                .await?;
            }
        }

        Ok(sink)
    }
}

/// Run synchronous writer work (zip, csv, file creation) on the blocking pool
pub(crate) async fn blocking_write<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> std::result::Result<T, ExportError> + Send + 'static,
{
    let written = tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::Other(format!("export writer task panicked: {}", e)))?;
    Ok(written?)
}
