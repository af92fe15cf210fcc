//! Cell, sheet and name access over a live session.
//!
//! Every function takes the session explicitly and reads through to it; nothing
//! is cached between calls.

use std::collections::BTreeMap;

use serde::Serialize;
use sheetprobe_core::{same_sheet_name, CellAddress, CellValue, NamedRange, Result, WorkbookSession};

/// A cell's value, its formula (empty for literals) and its displayed text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellQuery {
    pub value: CellValue,
    pub formula: String,
    pub visible_text: String,
}

impl CellQuery {
    pub fn is_formula(&self) -> bool {
        !self.formula.is_empty()
    }
}

/// One sheet's entry in the workbook structure report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetStructure {
    pub name: String,
    pub rows: u32,
    pub columns: u16,
    /// Used-range address, `None` for an empty sheet
    pub address: Option<String>,
    /// Names that point into this sheet
    pub named_ranges: Vec<NamedRange>,
}

pub fn list_sheets(session: &mut dyn WorkbookSession) -> Result<Vec<String>> {
    session.list_sheets()
}

pub fn add_sheet(session: &mut dyn WorkbookSession, name: &str) -> Result<()> {
    session.add_sheet(name)?;
    tracing::info!("added sheet {name}");
    Ok(())
}

pub fn remove_sheet(session: &mut dyn WorkbookSession, name: &str) -> Result<()> {
    session.remove_sheet(name)?;
    tracing::info!("removed sheet {name}");
    Ok(())
}

pub fn read_cell(session: &mut dyn WorkbookSession, sheet: &str, address: &str) -> Result<CellValue> {
    session.cell_value(sheet, CellAddress::parse(address)?)
}

pub fn write_cell(
    session: &mut dyn WorkbookSession,
    sheet: &str,
    address: &str,
    value: CellValue,
) -> Result<()> {
    let cell = CellAddress::parse(address)?;
    tracing::debug!(sheet, cell = %cell, kind = value.type_name(), "write");
    session.set_cell_value(sheet, cell, value)
}

pub fn query_cell(session: &mut dyn WorkbookSession, sheet: &str, address: &str) -> Result<CellQuery> {
    let cell = CellAddress::parse(address)?;
    query_at(session, sheet, cell)
}

pub(crate) fn query_at(
    session: &mut dyn WorkbookSession,
    sheet: &str,
    cell: CellAddress,
) -> Result<CellQuery> {
    Ok(CellQuery {
        value: session.cell_value(sheet, cell)?,
        formula: session.cell_formula(sheet, cell)?,
        visible_text: session.cell_text(sheet, cell)?,
    })
}

/// Defined names mapped to their addresses, sheet-qualified where the name is.
pub fn list_named_ranges(session: &mut dyn WorkbookSession) -> Result<BTreeMap<String, String>> {
    Ok(session
        .named_ranges()?
        .into_iter()
        .map(|n| {
            let address = match &n.sheet {
                Some(sheet) => format!("{}!{}", quote_sheet(sheet), n.address),
                None => n.address.clone(),
            };
            (n.name, address)
        })
        .collect())
}

fn quote_sheet(sheet: &str) -> String {
    if sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        sheet.to_string()
    } else {
        format!("'{}'", sheet.replace('\'', "''"))
    }
}

/// Size and used range of every sheet, with the names pointing into each.
pub fn structure(session: &mut dyn WorkbookSession) -> Result<Vec<SheetStructure>> {
    let names = session.named_ranges()?;
    session
        .list_sheets()?
        .into_iter()
        .map(|name| -> Result<SheetStructure> {
            let used = session.used_range(&name)?;
            let named_ranges = names
                .iter()
                .filter(|n| n.sheet.as_deref().map_or(false, |s| same_sheet_name(s, &name)))
                .cloned()
                .collect();
            Ok(SheetStructure {
                rows: used.map_or(0, |r| r.row_count()),
                columns: used.map_or(0, |r| r.col_count()),
                address: used.map(|r| r.to_a1_string()),
                named_ranges,
                name,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetprobe_core::{Error, MemorySession};

    fn session() -> MemorySession {
        let mut session = MemorySession::with_sheets("Budget", &["Expenses", "Q1 Plan"]);
        session
            .load_csv_sheet(
                "Expenses",
                "Item,Cost\nRent,2500\nPower,120.5\n".as_bytes(),
                &Default::default(),
            )
            .unwrap();
        session.define_name("Costs", "=Expenses!$B$2:$B$3");
        session.define_name("Targets", "='Q1 Plan'!$A$1");
        session.define_name("TaxRate", "=0.0725");
        session
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let mut s = session();
        write_cell(&mut s, "Expenses", "C4", CellValue::from("checked")).unwrap();
        assert_eq!(read_cell(&mut s, "Expenses", "C4").unwrap(), "checked".into());

        let q = query_cell(&mut s, "Expenses", "C4").unwrap();
        assert_eq!(q.formula, "");
        assert!(!q.is_formula());
        assert_eq!(q.visible_text, "checked");
    }

    #[test]
    fn test_query_distinguishes_formula_from_literal() {
        let mut s = session();
        let b4 = CellAddress::parse("B4").unwrap();
        s.set_formula("Expenses", b4, "=SUM(B2:B3)", CellValue::Number(2620.5))
            .unwrap();
        s.set_display_text("Expenses", b4, "$2,620.50").unwrap();

        let q = query_cell(&mut s, "Expenses", "B4").unwrap();
        assert_eq!(
            q,
            CellQuery {
                value: CellValue::Number(2620.5),
                formula: "=SUM(B2:B3)".into(),
                visible_text: "$2,620.50".into(),
            }
        );
    }

    #[test]
    fn test_bad_sheet_or_address_is_not_found() {
        let mut s = session();
        assert!(read_cell(&mut s, "Nope", "A1").unwrap_err().is_not_found());
        assert!(read_cell(&mut s, "Expenses", "A0").unwrap_err().is_not_found());
        assert!(write_cell(&mut s, "Expenses", "1A", CellValue::Empty)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_sheet_add_remove() {
        let mut s = session();
        add_sheet(&mut s, "Forecast").unwrap();
        assert_eq!(list_sheets(&mut s).unwrap(), vec!["Expenses", "Q1 Plan", "Forecast"]);
        assert!(matches!(
            add_sheet(&mut s, "Forecast"),
            Err(Error::DuplicateSheetName(_))
        ));

        remove_sheet(&mut s, "Forecast").unwrap();
        assert!(matches!(
            remove_sheet(&mut s, "Forecast"),
            Err(Error::SheetNotFound(_))
        ));
    }

    #[test]
    fn test_named_ranges_mapping() {
        let mut s = session();
        let names = list_named_ranges(&mut s).unwrap();
        assert_eq!(names["Costs"], "Expenses!B2:B3");
        assert_eq!(names["Targets"], "'Q1 Plan'!A1");
        assert_eq!(names["TaxRate"], "0.0725");
    }

    #[test]
    fn test_structure_report() {
        let mut s = session();
        let report = structure(&mut s).unwrap();

        assert_eq!(report.len(), 2);
        assert_eq!(report[0].name, "Expenses");
        assert_eq!((report[0].rows, report[0].columns), (3, 2));
        assert_eq!(report[0].address.as_deref(), Some("A1:B3"));
        assert_eq!(report[0].named_ranges.len(), 1);
        assert_eq!(report[0].named_ranges[0].name, "Costs");

        assert_eq!(report[1].name, "Q1 Plan");
        assert_eq!((report[1].rows, report[1].columns), (0, 0));
        assert_eq!(report[1].address, None);
        assert_eq!(report[1].named_ranges[0].name, "Targets");
    }
}
