//! Finding cells by content.
//!
//! Each sheet is searched over its used range, materialised as a [`Table`], in
//! row-major order. "Nothing found" is an empty list, never an error.

use serde::Serialize;
use sheetprobe_core::{CellValue, Result, WorkbookSession};

use crate::table::{range_table, Table};

/// A found cell: sheet name, column letters and 1-based row number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CellMatch {
    pub sheet: String,
    pub column: String,
    pub row: u32,
}

impl CellMatch {
    pub fn address(&self) -> String {
        format!("{}{}", self.column, self.row)
    }
}

impl std::fmt::Display for CellMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}!{}{}", self.sheet, self.column, self.row)
    }
}

/// Which sheets a search covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope<'a> {
    /// The workbook's active sheet
    ActiveSheet,
    Sheet(&'a str),
    /// Every sheet, in workbook order
    Workbook,
}

impl<'a> SearchScope<'a> {
    /// `whole_workbook` wins over `sheet`; neither means the active sheet.
    pub fn new(sheet: Option<&'a str>, whole_workbook: bool) -> Self {
        match (whole_workbook, sheet) {
            (true, _) => SearchScope::Workbook,
            (false, Some(sheet)) => SearchScope::Sheet(sheet),
            (false, None) => SearchScope::ActiveSheet,
        }
    }

    fn sheets(self, session: &mut dyn WorkbookSession) -> Result<Vec<String>> {
        match self {
            SearchScope::ActiveSheet => Ok(vec![session.active_sheet()?]),
            SearchScope::Sheet(sheet) => Ok(vec![sheet.to_string()]),
            SearchScope::Workbook => session.list_sheets(),
        }
    }
}

fn search(
    session: &mut dyn WorkbookSession,
    scope: SearchScope<'_>,
    matches: impl Fn(&CellValue) -> bool,
) -> Result<Vec<CellMatch>> {
    let mut found = Vec::new();
    for sheet in scope.sheets(session)? {
        let table = range_table(session, &sheet, None)?;
        found.extend(scan(&sheet, &table, &matches));
    }
    Ok(found)
}

fn scan<'t>(
    sheet: &'t str,
    table: &'t Table,
    matches: &'t impl Fn(&CellValue) -> bool,
) -> impl Iterator<Item = CellMatch> + 't {
    table
        .cells()
        .filter(move |(_, value)| matches(*value))
        .map(move |(address, _)| CellMatch {
            sheet: sheet.to_string(),
            column: address.column_letters(),
            row: address.row_number(),
        })
}

/// Cells whose content equals `value` exactly.
///
/// Text compares case-sensitively; numeric cells match when `value` parses to
/// the same number; booleans match `TRUE`/`FALSE`.
pub fn find_all_occurrences(
    session: &mut dyn WorkbookSession,
    value: &str,
    sheet: Option<&str>,
    whole_workbook: bool,
) -> Result<Vec<CellMatch>> {
    let scope = SearchScope::new(sheet, whole_workbook);
    let found = search(session, scope, |cell| cell.matches_exactly(value))?;
    tracing::debug!(?scope, needle = value, hits = found.len(), "exact search");
    Ok(found)
}

/// Text cells containing `substring`. Non-text cells never match.
pub fn find_partial_occurrences(
    session: &mut dyn WorkbookSession,
    substring: &str,
    sheet: Option<&str>,
    whole_workbook: bool,
) -> Result<Vec<CellMatch>> {
    let scope = SearchScope::new(sheet, whole_workbook);
    let found = search(session, scope, |cell| cell.contains_text(substring))?;
    tracing::debug!(?scope, needle = substring, hits = found.len(), "partial search");
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetprobe_core::MemorySession;

    fn book() -> MemorySession {
        let mut session = MemorySession::with_sheets("Book", &["Income", "Notes"]);
        session
            .load_csv_sheet(
                "Income",
                "Metric,2022,2023\nNet Income,900,1000\nTotal Net Income,1900,2000\n".as_bytes(),
                &Default::default(),
            )
            .unwrap();
        session
            .load_csv_sheet(
                "Notes",
                "see Net Income\nNet Income\n2023\n".as_bytes(),
                &Default::default(),
            )
            .unwrap();
        session.set_active_sheet("Notes").unwrap();
        session
    }

    fn labels(found: &[CellMatch]) -> Vec<String> {
        found.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_exact_search_named_sheet() {
        let mut session = book();
        let found = find_all_occurrences(&mut session, "Net Income", Some("Income"), false).unwrap();
        assert_eq!(
            found,
            vec![CellMatch {
                sheet: "Income".into(),
                column: "A".into(),
                row: 2
            }]
        );
    }

    #[test]
    fn test_exact_search_defaults_to_active_sheet() {
        let mut session = book();
        let found = find_all_occurrences(&mut session, "Net Income", None, false).unwrap();
        assert_eq!(labels(&found), vec!["Notes!A2"]);
    }

    #[test]
    fn test_numeric_header_matches_text_needle() {
        let mut session = book();
        let found = find_all_occurrences(&mut session, "2023", Some("Income"), false).unwrap();
        assert_eq!(labels(&found), vec!["Income!C1"]);
    }

    #[test]
    fn test_whole_workbook_is_concatenation_in_sheet_order() {
        let mut session = book();
        let everywhere = find_all_occurrences(&mut session, "Net Income", None, true).unwrap();

        let mut per_sheet = Vec::new();
        for sheet in session.list_sheets().unwrap() {
            per_sheet.extend(find_all_occurrences(&mut session, "Net Income", Some(&sheet), false).unwrap());
        }
        assert_eq!(everywhere, per_sheet);
        assert_eq!(labels(&everywhere), vec!["Income!A2", "Notes!A2"]);
    }

    #[test]
    fn test_partial_search_only_in_text() {
        let mut session = book();
        let found = find_partial_occurrences(&mut session, "Net Income", Some("Income"), false).unwrap();
        assert_eq!(labels(&found), vec!["Income!A2", "Income!A3"]);

        // 2023 is stored as a number: never a substring hit
        let found = find_partial_occurrences(&mut session, "202", Some("Income"), false).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_row_major_order() {
        let mut session = book();
        let found = find_partial_occurrences(&mut session, "e", None, true).unwrap();
        assert_eq!(
            labels(&found),
            vec!["Income!A1", "Income!A2", "Income!A3", "Notes!A1", "Notes!A2"]
        );
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let mut session = book();
        assert!(find_all_occurrences(&mut session, "EBITDA", None, true)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_unknown_sheet_is_an_error() {
        let mut session = book();
        assert!(find_all_occurrences(&mut session, "x", Some("Nope"), false)
            .unwrap_err()
            .is_not_found());
    }
}
