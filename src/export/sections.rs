//! The five logical sections of an export document and their rows.
//!
//! Every physical writer renders the same sections with the same columns;
//! only styling and buffering differ.

use crate::record::{AdminRole, Partner, ProviderRecord, Representative};

/// Placeholder written for a parent whose list was reported empty
pub const NONE_REGISTERED: &str = "none registered";

/// Placeholder written for a parent whose list was not reported at all
pub const NOT_REPORTED: &str = "not reported";

/// A single output cell
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    /// Blank cell
    Empty,
    /// Text cell
    Text(String),
    /// Numeric cell
    Number(f64),
}

impl Cell {
    /// Text cell
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Integer cell
    pub fn int(value: i64) -> Self {
        Cell::Number(value as f64)
    }

    /// Count cell
    pub fn count(value: u64) -> Self {
        Cell::Number(value as f64)
    }

    /// Text cell for an optional value; absent values stay blank
    pub fn opt(value: Option<&str>) -> Self {
        match value {
            Some(v) => Cell::Text(v.to_string()),
            None => Cell::Empty,
        }
    }

    /// Plain-text rendering used by the delimited writer
    pub fn render(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
        }
    }
}

/// Document section
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    /// Totals, breakdowns, failed identifiers
    Summary,
    /// One row per succeeded identifier
    Results,
    /// Partners detail
    Partners,
    /// Legal representatives detail
    Representatives,
    /// Administrative bodies detail
    AdminRoles,
}

impl Section {
    /// Detail sections built from succeeded records
    pub const RECORD_SECTIONS: [Section; 4] = [
        Section::Results,
        Section::Partners,
        Section::Representatives,
        Section::AdminRoles,
    ];

    /// Worksheet name
    pub fn sheet_name(&self) -> &'static str {
        match self {
            Section::Summary => "Summary",
            Section::Results => "Results",
            Section::Partners => "Partners",
            Section::Representatives => "Representatives",
            Section::AdminRoles => "Admin roles",
        }
    }

    /// Marker row text for the delimited format
    pub fn marker(&self) -> String {
        let name = match self {
            Section::Summary => "SUMMARY",
            Section::Results => "RESULTS",
            Section::Partners => "PARTNERS",
            Section::Representatives => "REPRESENTATIVES",
            Section::AdminRoles => "ADMINISTRATIVE ROLES",
        };
        format!("=== {name} ===")
    }

    /// Column headers; the summary section has none
    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            Section::Summary => &[],
            Section::Results => &[
                "Identifier",
                "Legal name",
                "Taxpayer status",
                "Condition",
                "Taxpayer type",
                "Address",
                "Department",
                "Province",
                "District",
                "Phones",
                "Emails",
                "Registered on",
                "Economic activity",
                "Partners",
                "Representatives",
                "Admin roles",
            ],
            Section::Partners => &[
                "Identifier",
                "Legal name",
                "Partner",
                "Document type",
                "Document description",
                "Document number",
                "Ownership %",
                "Shares",
                "Joined on",
            ],
            Section::Representatives => &[
                "Identifier",
                "Legal name",
                "Representative",
                "Document type",
                "Document description",
                "Document number",
                "Position",
                "Since",
            ],
            Section::AdminRoles => &[
                "Identifier",
                "Legal name",
                "Member",
                "Document type",
                "Document description",
                "Document number",
                "Body",
                "Position",
                "Since",
            ],
        }
    }

    /// Column widths for styled output
    pub fn widths(&self) -> &'static [f64] {
        match self {
            Section::Summary => &[35.0, 30.0, 15.0],
            Section::Results => &[
                15.0, 40.0, 15.0, 15.0, 30.0, 40.0, 15.0, 15.0, 15.0, 25.0, 30.0, 15.0, 35.0,
                12.0, 18.0, 18.0,
            ],
            Section::Partners => &[15.0, 35.0, 40.0, 12.0, 25.0, 18.0, 15.0, 18.0, 15.0],
            Section::Representatives => &[15.0, 35.0, 40.0, 12.0, 25.0, 18.0, 30.0, 15.0],
            Section::AdminRoles => &[15.0, 35.0, 40.0, 12.0, 25.0, 18.0, 25.0, 30.0, 15.0],
        }
    }

    /// Rows contributed by one succeeded record
    pub fn rows_for(&self, identifier: &str, record: &ProviderRecord) -> Vec<Vec<Cell>> {
        match self {
            Section::Summary => Vec::new(),
            Section::Results => vec![result_row(identifier, record)],
            Section::Partners => detail_rows(
                identifier,
                record,
                record.partners.as_deref(),
                self.headers().len(),
                partner_cells,
            ),
            Section::Representatives => detail_rows(
                identifier,
                record,
                record.representatives.as_deref(),
                self.headers().len(),
                representative_cells,
            ),
            Section::AdminRoles => detail_rows(
                identifier,
                record,
                record.admin_roles.as_deref(),
                self.headers().len(),
                admin_role_cells,
            ),
        }
    }
}

fn list_count<T>(list: Option<&[T]>) -> Cell {
    match list {
        Some(items) => Cell::count(items.len() as u64),
        None => Cell::text(NOT_REPORTED),
    }
}

fn joined(values: Option<&Vec<String>>) -> Cell {
    match values {
        Some(v) => Cell::text(v.join(", ")),
        None => Cell::Empty,
    }
}

fn result_row(identifier: &str, record: &ProviderRecord) -> Vec<Cell> {
    let general = record.general.as_ref();
    vec![
        Cell::text(identifier),
        Cell::opt(general.and_then(|g| g.legal_name.as_deref())),
        Cell::opt(general.and_then(|g| g.taxpayer_status.as_deref())),
        Cell::opt(general.and_then(|g| g.condition.as_deref())),
        Cell::opt(general.and_then(|g| g.taxpayer_type.as_deref())),
        Cell::opt(general.and_then(|g| g.address.as_deref())),
        Cell::opt(general.and_then(|g| g.department.as_deref())),
        Cell::opt(general.and_then(|g| g.province.as_deref())),
        Cell::opt(general.and_then(|g| g.district.as_deref())),
        joined(general.and_then(|g| g.phones.as_ref())),
        joined(general.and_then(|g| g.emails.as_ref())),
        Cell::opt(general.and_then(|g| g.registered_on.as_deref())),
        Cell::opt(general.and_then(|g| g.economic_activity.as_deref())),
        list_count(record.partners.as_deref()),
        list_count(record.representatives.as_deref()),
        list_count(record.admin_roles.as_deref()),
    ]
}

fn detail_rows<T>(
    identifier: &str,
    record: &ProviderRecord,
    list: Option<&[T]>,
    width: usize,
    cells: fn(&T) -> Vec<Cell>,
) -> Vec<Vec<Cell>> {
    let parent = [Cell::text(identifier), Cell::opt(record.legal_name())];

    let placeholder = |text: &str| {
        let mut row = parent.to_vec();
        row.push(Cell::text(text));
        row.resize(width, Cell::Empty);
        vec![row]
    };

    match list {
        None => placeholder(NOT_REPORTED),
        Some([]) => placeholder(NONE_REGISTERED),
        Some(items) => items
            .iter()
            .map(|item| {
                let mut row = parent.to_vec();
                row.extend(cells(item));
                row
            })
            .collect(),
    }
}

fn partner_cells(p: &Partner) -> Vec<Cell> {
    vec![
        Cell::opt(p.full_name.as_deref()),
        Cell::opt(p.document_type.as_deref()),
        Cell::opt(p.document_description.as_deref()),
        Cell::opt(p.document_number.as_deref()),
        Cell::opt(p.ownership_percentage.as_deref()),
        p.share_count.map(Cell::Number).unwrap_or(Cell::Empty),
        Cell::opt(p.joined_on.as_deref()),
    ]
}

fn representative_cells(r: &Representative) -> Vec<Cell> {
    vec![
        Cell::opt(r.full_name.as_deref()),
        Cell::opt(r.document_type.as_deref()),
        Cell::opt(r.document_description.as_deref()),
        Cell::opt(r.document_number.as_deref()),
        Cell::opt(r.position.as_deref()),
        Cell::opt(r.since.as_deref()),
    ]
}

fn admin_role_cells(a: &AdminRole) -> Vec<Cell> {
    vec![
        Cell::opt(a.full_name.as_deref()),
        Cell::opt(a.document_type.as_deref()),
        Cell::opt(a.document_description.as_deref()),
        Cell::opt(a.document_number.as_deref()),
        Cell::opt(a.body_type.as_deref()),
        Cell::opt(a.position.as_deref()),
        Cell::opt(a.since.as_deref()),
    ]
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::GeneralInfo;

    fn acme() -> ProviderRecord {
        ProviderRecord {
            general: Some(GeneralInfo {
                legal_name: Some("ACME SAC".into()),
                phones: Some(vec!["111".into(), "222".into()]),
                ..Default::default()
            }),
            partners: Some(vec![
                Partner {
                    full_name: Some("ANA".into()),
                    share_count: Some(50.0),
                    ..Default::default()
                },
                Partner {
                    full_name: Some("LUIS".into()),
                    ..Default::default()
                },
            ]),
            representatives: Some(vec![]),
            admin_roles: None,
        }
    }

    #[test]
    fn test_every_row_matches_its_header_width() {
        let record = acme();
        for section in Section::RECORD_SECTIONS {
            let width = section.headers().len();
            for row in section.rows_for("2010", &record) {
                assert_eq!(row.len(), width, "{section:?} row width");
            }
            assert_eq!(section.widths().len(), width, "{section:?} widths");
        }
    }

    #[test]
    fn test_detail_rows_keep_source_order() {
        let rows = Section::Partners.rows_for("2010", &acme());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][2], Cell::text("ANA"));
        assert_eq!(rows[0][7], Cell::Number(50.0));
        assert_eq!(rows[1][2], Cell::text("LUIS"));
        assert_eq!(rows[1][1], Cell::text("ACME SAC"));
    }

    #[test]
    fn test_empty_and_unknown_lists_get_distinct_placeholders() {
        let record = acme();

        let reps = Section::Representatives.rows_for("2010", &record);
        assert_eq!(reps.len(), 1);
        assert_eq!(reps[0][2], Cell::text(NONE_REGISTERED));

        let roles = Section::AdminRoles.rows_for("2010", &record);
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0][2], Cell::text(NOT_REPORTED));
    }

    #[test]
    fn test_result_row_counts_and_joins() {
        let row = &Section::Results.rows_for("2010", &acme())[0];
        assert_eq!(row[0], Cell::text("2010"));
        assert_eq!(row[9], Cell::text("111, 222"));
        assert_eq!(row[10], Cell::Empty);
        assert_eq!(row[13], Cell::count(2));
        assert_eq!(row[14], Cell::count(0));
        assert_eq!(row[15], Cell::text(NOT_REPORTED));
    }

    #[test]
    fn test_record_without_general_section_renders_blanks() {
        let row = &Section::Results.rows_for("X1", &ProviderRecord::default())[0];
        assert_eq!(row[0], Cell::text("X1"));
        assert!(row[1..13].iter().all(|c| *c == Cell::Empty));
    }

    #[test]
    fn test_cell_rendering() {
        assert_eq!(Cell::count(12).render(), "12");
        assert_eq!(Cell::Number(2.5).render(), "2.5");
        assert_eq!(Cell::Empty.render(), "");
        assert_eq!(Section::AdminRoles.marker(), "=== ADMINISTRATIVE ROLES ===");
    }
}
