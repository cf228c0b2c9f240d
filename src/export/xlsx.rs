//! Minimal SpreadsheetML (.xlsx) writer over a zip container.
//!
//! Worksheets are written one at a time, row by row, straight into their zip
//! entry, so memory use does not depend on the number of rows. The workbook
//! parts that list the sheets are written by [`WorkbookWriter::finish`].

use super::sections::Cell;
use crate::error::ExportError;
use std::io::{Seek, Write};
use zip::ZipWriter;
use zip::write::FileOptions;

/// Header styling applied by a [`WorkbookWriter`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderStyle {
    /// Filled, bold, bordered header; frozen first row; fixed widths; auto-filter
    Styled,
    /// Bold header only
    Plain,
}

impl HeaderStyle {
    fn style_index(&self) -> u32 {
        match self {
            HeaderStyle::Styled => 1,
            HeaderStyle::Plain => 2,
        }
    }
}

struct OpenSheet {
    next_row: u32,
    columns: usize,
    filtered: bool,
}

/// Writes a workbook sheet by sheet
pub struct WorkbookWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    style: HeaderStyle,
    sheet_names: Vec<String>,
    open: Option<OpenSheet>,
}

impl<W: Write + Seek> WorkbookWriter<W> {
    /// Start a workbook on `inner`
    pub fn new(inner: W, style: HeaderStyle) -> Self {
        Self {
            zip: ZipWriter::new(inner),
            style,
            sheet_names: Vec::new(),
            open: None,
        }
    }

    fn options() -> FileOptions {
        FileOptions::default().compression_method(zip::CompressionMethod::Deflated)
    }

    /// Begin a new worksheet; an open one is closed first
    ///
    /// `headers` may be empty for free-form sheets. `widths` is only honored
    /// for [`HeaderStyle::Styled`].
    pub fn start_sheet(
        &mut self,
        name: &str,
        headers: &[&str],
        widths: &[f64],
    ) -> Result<(), ExportError> {
        self.end_sheet()?;

        self.sheet_names.push(name.to_string());
        let index = self.sheet_names.len();
        self.zip
            .start_file(format!("xl/worksheets/sheet{index}.xml"), Self::options())?;

        let styled = self.style == HeaderStyle::Styled;
        let mut prelude = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
        );

        if styled && !headers.is_empty() {
            prelude.push_str(
                r#"<sheetViews><sheetView workbookViewId="0"><pane ySplit="1" topLeftCell="A2" activePane="bottomLeft" state="frozen"/></sheetView></sheetViews>"#,
            );
        }

        if styled && !widths.is_empty() {
            prelude.push_str("<cols>");
            for (i, width) in widths.iter().enumerate() {
                let col = i + 1;
                prelude.push_str(&format!(
                    r#"<col min="{col}" max="{col}" width="{width}" customWidth="1"/>"#
                ));
            }
            prelude.push_str("</cols>");
        }

        prelude.push_str("<sheetData>");
        self.zip.write_all(prelude.as_bytes())?;

        self.open = Some(OpenSheet {
            next_row: 1,
            columns: headers.len(),
            filtered: styled && !headers.is_empty(),
        });

        if !headers.is_empty() {
            let cells: Vec<Cell> = headers.iter().map(|h| Cell::text(*h)).collect();
            self.write_styled_row(&cells, Some(self.style.style_index()))?;
        }

        Ok(())
    }

    /// Append a data row to the open sheet
    pub fn write_row(&mut self, cells: &[Cell]) -> Result<(), ExportError> {
        self.write_styled_row(cells, None)
    }

    fn write_styled_row(&mut self, cells: &[Cell], style: Option<u32>) -> Result<(), ExportError> {
        let sheet = self
            .open
            .as_mut()
            .ok_or_else(|| ExportError::InvalidState("no open worksheet".to_string()))?;

        let row_number = sheet.next_row;
        sheet.next_row += 1;

        let mut xml = format!(r#"<row r="{row_number}">"#);
        for (i, cell) in cells.iter().enumerate() {
            let reference = format!("{}{}", column_name(i), row_number);
            let style_attr = style.map(|s| format!(r#" s="{s}""#)).unwrap_or_default();
            match cell {
                Cell::Empty => {
                    if style.is_some() {
                        xml.push_str(&format!(r#"<c r="{reference}"{style_attr}/>"#));
                    }
                }
                Cell::Text(text) => {
                    xml.push_str(&format!(
                        r#"<c r="{reference}" t="inlineStr"{style_attr}><is><t xml:space="preserve">{}</t></is></c>"#,
                        escape_xml(text)
                    ));
                }
                Cell::Number(n) if n.is_finite() => {
                    xml.push_str(&format!(r#"<c r="{reference}"{style_attr}><v>{n}</v></c>"#));
                }
                Cell::Number(_) => {}
            }
        }
        xml.push_str("</row>");

        self.zip.write_all(xml.as_bytes())?;
        Ok(())
    }

    /// Close the open sheet, if any
    pub fn end_sheet(&mut self) -> Result<(), ExportError> {
        let Some(sheet) = self.open.take() else {
            return Ok(());
        };

        let mut tail = String::from("</sheetData>");
        if sheet.filtered && sheet.columns > 0 {
            let last_row = sheet.next_row.saturating_sub(1).max(1);
            tail.push_str(&format!(
                r#"<autoFilter ref="A1:{}{}"/>"#,
                column_name(sheet.columns - 1),
                last_row
            ));
        }
        tail.push_str("</worksheet>");

        self.zip.write_all(tail.as_bytes())?;
        Ok(())
    }

    /// Write the workbook parts and return the underlying writer
    pub fn finish(mut self) -> Result<W, ExportError> {
        self.end_sheet()?;

        if self.sheet_names.is_empty() {
            return Err(ExportError::InvalidState(
                "workbook has no worksheets".to_string(),
            ));
        }

        let options = Self::options();

        self.zip.start_file("[Content_Types].xml", options)?;
        self.zip
            .write_all(content_types_xml(self.sheet_names.len()).as_bytes())?;

        self.zip.start_file("_rels/.rels", options)?;
        self.zip.write_all(ROOT_RELS.as_bytes())?;

        self.zip.start_file("xl/workbook.xml", options)?;
        self.zip
            .write_all(workbook_xml(&self.sheet_names).as_bytes())?;

        self.zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        self.zip
            .write_all(workbook_rels_xml(self.sheet_names.len()).as_bytes())?;

        self.zip.start_file("xl/styles.xml", options)?;
        self.zip.write_all(STYLES.as_bytes())?;

        Ok(self.zip.finish()?)
    }
}

/// Spreadsheet column name for a 0-based index (0 -> A, 26 -> AA)
pub fn column_name(index: usize) -> String {
    let mut n = index + 1;
    let mut name = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        name.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

/// Escape text for XML content, dropping characters XML 1.0 cannot carry
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }
    out
}

fn content_types_xml(sheets: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
    );
    for i in 1..=sheets {
        xml.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn workbook_xml(names: &[String]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
    );
    for (i, name) in names.iter().enumerate() {
        let id = i + 1;
        xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{id}" r:id="rId{id}"/>"#,
            escape_xml(name)
        ));
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels_xml(sheets: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for i in 1..=sheets {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{i}.xml"/>"#
        ));
    }
    let styles_id = sheets + 1;
    xml.push_str(&format!(
        r#"<Relationship Id="rId{styles_id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#
    ));
    xml.push_str("</Relationships>");
    xml
}

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

// cellXfs: 0 default, 1 styled header (white bold on blue, thin borders), 2 bold
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="3"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><color rgb="FFFFFFFF"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="3"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill><fill><patternFill patternType="solid"><fgColor rgb="FF366092"/><bgColor indexed="64"/></patternFill></fill></fills><borders count="2"><border><left/><right/><top/><bottom/><diagonal/></border><border><left style="thin"/><right style="thin"/><top style="thin"/><bottom style="thin"/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="3"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="2" borderId="1" xfId="0" applyFont="1" applyFill="1" applyBorder="1" applyAlignment="1"><alignment horizontal="center" vertical="center" wrapText="1"/></xf><xf numFmtId="0" fontId="2" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;
