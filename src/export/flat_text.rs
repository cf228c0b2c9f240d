//! Delimited text writer for the largest result volumes.
//!
//! The file starts with a UTF-8 byte order mark so spreadsheet applications
//! pick the right encoding. Each section is introduced by a single-field
//! marker row (`=== RESULTS ===`) followed by its header row.

use super::RowSink;
use super::sections::{Cell, Section};
use crate::error::ExportError;
use std::io::Write;

/// UTF-8 byte order mark
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Sectioned CSV writer
pub struct FlatTextWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> FlatTextWriter<W> {
    /// Write the byte order mark and wrap `inner`
    pub fn new(mut inner: W) -> Result<Self, ExportError> {
        inner.write_all(UTF8_BOM)?;
        let writer = csv::WriterBuilder::new().flexible(true).from_writer(inner);
        Ok(Self { writer })
    }

    /// Flush and return the underlying writer
    pub fn finish(self) -> Result<W, ExportError> {
        self.writer
            .into_inner()
            .map_err(|e| ExportError::Io(e.into_error()))
    }
}

impl<W: Write> RowSink for FlatTextWriter<W> {
    fn begin_section(&mut self, section: Section) -> Result<(), ExportError> {
        self.writer.write_record([section.marker()])?;
        let headers = section.headers();
        if !headers.is_empty() {
            self.writer.write_record(headers)?;
        }
        Ok(())
    }

    fn write_row(&mut self, cells: &[Cell]) -> Result<(), ExportError> {
        if cells.is_empty() {
            self.writer.write_record([""])?;
        } else {
            self.writer.write_record(cells.iter().map(Cell::render))?;
        }
        Ok(())
    }
}
