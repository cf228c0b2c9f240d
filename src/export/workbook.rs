//! Workbook writers for the `full` and `streaming` formats.

use super::sections::{Cell, Section};
use super::summary::RunSummary;
use super::xlsx::{HeaderStyle, WorkbookWriter};
use super::{ExportPipeline, RowSink, blocking_write};
use crate::error::{ExportError, Result};
use crate::store::JobStore;
use crate::types::JobId;
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::Path;

impl<W: Write + Seek> RowSink for WorkbookWriter<W> {
    fn begin_section(&mut self, section: Section) -> std::result::Result<(), ExportError> {
        self.start_sheet(section.sheet_name(), section.headers(), section.widths())
    }

    fn write_row(&mut self, cells: &[Cell]) -> std::result::Result<(), ExportError> {
        WorkbookWriter::write_row(self, cells)
    }
}

/// Styled workbook assembled in memory, then written in one go
pub(super) async fn write_full(
    pipeline: &ExportPipeline,
    store: &dyn JobStore,
    job_id: JobId,
    summary: &RunSummary,
    target: &Path,
) -> Result<()> {
    let workbook = WorkbookWriter::new(Cursor::new(Vec::new()), HeaderStyle::Styled);
    let workbook = pipeline
        .write_sections(store, job_id, summary, workbook)
        .await?;
    let bytes = blocking_write(move || Ok(workbook.finish()?.into_inner())).await?;
    tokio::fs::write(target, bytes).await?;
    Ok(())
}

/// Plain workbook written into the file page by page
pub(super) async fn write_streaming(
    pipeline: &ExportPipeline,
    store: &dyn JobStore,
    job_id: JobId,
    summary: &RunSummary,
    target: &Path,
) -> Result<()> {
    let target = target.to_path_buf();
    let workbook = blocking_write(move || {
        let file = std::fs::File::create(&target)?;
        Ok(WorkbookWriter::new(BufWriter::new(file), HeaderStyle::Plain))
    })
    .await?;
    let workbook = pipeline
        .write_sections(store, job_id, summary, workbook)
        .await?;
    blocking_write(move || {
        workbook.finish()?.flush()?;
        Ok(())
    })
    .await
}
