//! Wait helpers and export document readers

use provider_batch::export::flat_text::UTF8_BOM;
use provider_batch::{BatchCoordinator, JobId, JobState, JobStatus};
use std::io::{Cursor, Read};
use std::time::Duration;

/// Wait for a job to finish, panicking unless it COMPLETED with an export
pub async fn wait_for_export(
    coordinator: &BatchCoordinator,
    id: JobId,
    timeout: Duration,
) -> JobStatus {
    let status = coordinator
        .wait_for_terminal(id, Duration::from_millis(25), timeout)
        .await
        .expect("job should finish in time");
    assert_eq!(
        status.state,
        JobState::Completed,
        "job should complete, got {:?} ({:?})",
        status.state,
        status.error
    );
    assert!(status.export_format.is_some(), "export should be recorded");
    status
}

/// Raw XML of worksheet `index` (1-based) inside an xlsx document
pub fn worksheet_xml(bytes: &[u8], index: usize) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("xlsx is a zip archive");
    let mut entry = archive
        .by_name(&format!("xl/worksheets/sheet{index}.xml"))
        .expect("worksheet present");
    let mut xml = String::new();
    entry.read_to_string(&mut xml).expect("worksheet is utf-8");
    xml
}

/// Number of `<row` elements in a worksheet
pub fn worksheet_row_count(xml: &str) -> usize {
    xml.matches("<row ").count()
}

/// Lines of a flat-text export, BOM stripped
pub fn flat_text_lines(bytes: &[u8]) -> Vec<String> {
    assert!(bytes.starts_with(UTF8_BOM), "flat text starts with a BOM");
    String::from_utf8(bytes[UTF8_BOM.len()..].to_vec())
        .expect("flat text is utf-8")
        .lines()
        .map(str::to_string)
        .collect()
}

/// Data lines of one flat-text section: after its marker and header,
/// up to the next marker
pub fn flat_text_section<'a>(lines: &'a [String], marker: &str) -> &'a [String] {
    let start = lines
        .iter()
        .position(|l| l == marker)
        .unwrap_or_else(|| panic!("marker {marker} present"));
    let body = &lines[start + 2..];
    let end = body
        .iter()
        .position(|l| l.starts_with("=== "))
        .unwrap_or(body.len());
    &body[..end]
}
