//! In-process workbook session.
//!
//! `MemorySession` keeps sheets in memory and answers the [`WorkbookSession`]
//! contract directly. It backs offline use of the CLI (sheets loaded from CSV
//! files) and the test suites of the crates above it.

mod csv_io;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::cell::{CellAddress, CellValue, RangeRef};
use crate::error::{Error, Result};
use crate::named_range::NamedRange;
use crate::session::WorkbookSession;
use crate::sheet_name::{same_sheet_name, validate_sheet_name};

pub use self::csv_io::CsvLoadOptions;

#[derive(Debug, Clone, Default)]
struct MemoryCell {
    value: CellValue,
    /// Formula text; empty for literals
    formula: String,
    /// Display text when it differs from the General rendering of `value`
    text: Option<String>,
}

#[derive(Debug, Clone)]
struct MemorySheet {
    name: String,
    cells: BTreeMap<(u32, u16), MemoryCell>,
}

impl MemorySheet {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
        }
    }

    fn used_range(&self) -> Option<RangeRef> {
        self.cells
            .iter()
            .filter(|(_, cell)| !cell.value.is_empty() || !cell.formula.is_empty())
            .map(|(&(row, col), _)| RangeRef::single(CellAddress::new(row, col)))
            .reduce(|acc, r| acc.union(&r))
    }

    fn value_at(&self, addr: CellAddress) -> CellValue {
        self.cells
            .get(&(addr.row, addr.col))
            .map(|c| c.value.clone())
            .unwrap_or_default()
    }
}

/// A workbook held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemorySession {
    name: String,
    sheets: Vec<MemorySheet>,
    active: usize,
    names: Vec<NamedRange>,
    /// Directory `save(None)` writes to
    save_dir: Option<PathBuf>,
    closed: bool,
}

impl MemorySession {
    /// Create a workbook with a single empty sheet named "Sheet1"
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_sheets(name, &["Sheet1"])
    }

    /// Create a workbook with the given (empty) sheets; the first is active
    pub fn with_sheets(name: impl Into<String>, sheets: &[&str]) -> Self {
        Self {
            name: name.into(),
            sheets: sheets.iter().map(|s| MemorySheet::new(*s)).collect(),
            active: 0,
            names: Vec::new(),
            save_dir: None,
            closed: false,
        }
    }

    /// Load every `*.csv` file in `dir` as a sheet named after the file stem,
    /// in file-name order. Saving without a path writes back into `dir`.
    pub fn from_csv_dir(dir: impl AsRef<Path>, options: &CsvLoadOptions) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("csv")))
            .collect();
        files.sort();

        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Workbook".to_string());

        let mut session = Self::with_sheets(name, &[]);
        for path in &files {
            let sheet = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            session.load_csv_sheet(&sheet, std::fs::File::open(path)?, options)?;
        }
        if session.sheets.is_empty() {
            session.sheets.push(MemorySheet::new("Sheet1"));
        }
        session.active = 0;
        session.save_dir = Some(dir.to_path_buf());

        tracing::info!(
            "Loaded {} sheet(s) from {}",
            session.sheets.len(),
            dir.display()
        );
        Ok(session)
    }

    /// Replace (or create) `sheet` with the contents of a CSV stream.
    /// Row 1 of the sheet is the first CSV record.
    pub fn load_csv_sheet<R: std::io::Read>(
        &mut self,
        sheet: &str,
        reader: R,
        options: &CsvLoadOptions,
    ) -> Result<()> {
        let cells = csv_io::read_cells(reader, options)?;

        let index = match self.sheet_index(sheet) {
            Some(i) => i,
            None => {
                self.sheets.push(MemorySheet::new(sheet));
                self.sheets.len() - 1
            }
        };
        let target = &mut self.sheets[index];
        target.cells.clear();
        for (addr, value) in cells {
            target.cells.insert(
                (addr.row, addr.col),
                MemoryCell {
                    value,
                    ..Default::default()
                },
            );
        }
        Ok(())
    }

    /// Store a formula together with the value the application computed for it
    pub fn set_formula(
        &mut self,
        sheet: &str,
        cell: CellAddress,
        formula: impl Into<String>,
        computed: CellValue,
    ) -> Result<()> {
        let sheet = self.sheet_mut(sheet)?;
        sheet.cells.insert(
            (cell.row, cell.col),
            MemoryCell {
                value: computed,
                formula: formula.into(),
                text: None,
            },
        );
        Ok(())
    }

    /// Override how a cell is displayed (e.g. "$1,000.00" for 1000)
    pub fn set_display_text(
        &mut self,
        sheet: &str,
        cell: CellAddress,
        text: impl Into<String>,
    ) -> Result<()> {
        let sheet = self.sheet_mut(sheet)?;
        sheet.cells.entry((cell.row, cell.col)).or_default().text = Some(text.into());
        Ok(())
    }

    /// Define a workbook name from an Excel-style reference (`Sheet!$A$1:$B$2`)
    pub fn define_name(&mut self, name: &str, refers_to: &str) {
        self.names.retain(|n| !n.name.eq_ignore_ascii_case(name));
        self.names.push(NamedRange::from_refers_to(name, refers_to));
    }

    /// Make `sheet` the active sheet
    pub fn set_active_sheet(&mut self, sheet: &str) -> Result<()> {
        self.ensure_open()?;
        self.active = self
            .sheet_index(sheet)
            .ok_or_else(|| Error::SheetNotFound(sheet.to_string()))?;
        Ok(())
    }

    /// Directory used by `save(None)`
    pub fn set_save_dir(&mut self, dir: impl Into<PathBuf>) {
        self.save_dir = Some(dir.into());
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::session(format!("workbook '{}' is closed", self.name)))
        } else {
            Ok(())
        }
    }

    fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets.iter().position(|s| same_sheet_name(&s.name, name))
    }

    fn sheet(&self, name: &str) -> Result<&MemorySheet> {
        self.ensure_open()?;
        self.sheets
            .iter()
            .find(|s| same_sheet_name(&s.name, name))
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut MemorySheet> {
        self.ensure_open()?;
        self.sheets
            .iter_mut()
            .find(|s| same_sheet_name(&s.name, name))
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))
    }
}

impl WorkbookSession for MemorySession {
    fn workbook_name(&mut self) -> Result<String> {
        self.ensure_open()?;
        Ok(self.name.clone())
    }

    fn list_open_workbooks(&mut self) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(vec![self.name.clone()])
    }

    fn list_sheets(&mut self) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(self.sheets.iter().map(|s| s.name.clone()).collect())
    }

    fn active_sheet(&mut self) -> Result<String> {
        self.ensure_open()?;
        self.sheets
            .get(self.active)
            .map(|s| s.name.clone())
            .ok_or(Error::NoActiveSheet)
    }

    fn add_sheet(&mut self, name: &str) -> Result<()> {
        self.ensure_open()?;
        validate_sheet_name(name)?;
        if self.sheet_index(name).is_some() {
            return Err(Error::DuplicateSheetName(name.to_string()));
        }
        self.sheets.push(MemorySheet::new(name));
        self.active = self.sheets.len() - 1;
        Ok(())
    }

    fn remove_sheet(&mut self, name: &str) -> Result<()> {
        self.ensure_open()?;
        let index = self
            .sheet_index(name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))?;
        if self.sheets.len() == 1 {
            return Err(Error::session("a workbook must keep at least one sheet"));
        }
        self.sheets.remove(index);
        if self.active >= self.sheets.len() || self.active > index {
            self.active = self.active.saturating_sub(1);
        }
        Ok(())
    }

    fn cell_value(&mut self, sheet: &str, cell: CellAddress) -> Result<CellValue> {
        Ok(self.sheet(sheet)?.value_at(cell))
    }

    fn set_cell_value(&mut self, sheet: &str, cell: CellAddress, value: CellValue) -> Result<()> {
        let sheet = self.sheet_mut(sheet)?;
        if value.is_empty() {
            sheet.cells.remove(&(cell.row, cell.col));
        } else {
            sheet.cells.insert(
                (cell.row, cell.col),
                MemoryCell {
                    value,
                    ..Default::default()
                },
            );
        }
        Ok(())
    }

    fn cell_formula(&mut self, sheet: &str, cell: CellAddress) -> Result<String> {
        Ok(self
            .sheet(sheet)?
            .cells
            .get(&(cell.row, cell.col))
            .map(|c| c.formula.clone())
            .unwrap_or_default())
    }

    fn cell_text(&mut self, sheet: &str, cell: CellAddress) -> Result<String> {
        Ok(match self.sheet(sheet)?.cells.get(&(cell.row, cell.col)) {
            Some(MemoryCell {
                text: Some(text), ..
            }) => text.clone(),
            Some(c) => c.value.to_string(),
            None => String::new(),
        })
    }

    fn used_range(&mut self, sheet: &str) -> Result<Option<RangeRef>> {
        Ok(self.sheet(sheet)?.used_range())
    }

    fn range_values(&mut self, sheet: &str, range: RangeRef) -> Result<Vec<Vec<CellValue>>> {
        let sheet = self.sheet(sheet)?;
        Ok((range.start.row..=range.end.row)
            .map(|row| {
                (range.start.col..=range.end.col)
                    .map(|col| sheet.value_at(CellAddress::new(row, col)))
                    .collect()
            })
            .collect())
    }

    fn named_ranges(&mut self) -> Result<Vec<NamedRange>> {
        self.ensure_open()?;
        Ok(self.names.clone())
    }

    fn export_range_png(&mut self, sheet: &str, _range: RangeRef, _path: &Path) -> Result<()> {
        self.sheet(sheet)?;
        Err(Error::Unsupported(
            "in-memory workbooks cannot render ranges to images".into(),
        ))
    }

    fn save(&mut self, path: Option<&Path>) -> Result<()> {
        self.ensure_open()?;
        let dir = match path {
            Some(p) => p.to_path_buf(),
            None => self
                .save_dir
                .clone()
                .ok_or_else(|| Error::Unsupported("no save location for this workbook".into()))?,
        };
        std::fs::create_dir_all(&dir)?;

        for sheet in &self.sheets {
            let file = std::fs::File::create(dir.join(format!("{}.csv", sheet.name)))?;
            let rows = match sheet.used_range() {
                // Anchor at A1 so rows and columns land where they were
                Some(used) => {
                    let range = RangeRef::new(CellAddress::new(0, 0), used.end);
                    range_rows(sheet, range)
                }
                None => Vec::new(),
            };
            csv_io::write_rows(file, &rows)?;
        }

        tracing::info!("Saved workbook '{}' to {}", self.name, dir.display());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

fn range_rows(sheet: &MemorySheet, range: RangeRef) -> Vec<Vec<String>> {
    (range.start.row..=range.end.row)
        .map(|row| {
            (range.start.col..=range.end.col)
                .map(|col| csv_io::field_text(&sheet.value_at(CellAddress::new(row, col))))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    #[test]
    fn test_write_then_read() {
        let mut wb = MemorySession::new("Book1");
        wb.set_cell_value("Sheet1", addr("C3"), CellValue::from(42.0))
            .unwrap();

        assert_eq!(
            wb.cell_value("Sheet1", addr("C3")).unwrap(),
            CellValue::Number(42.0)
        );
        assert_eq!(wb.cell_formula("Sheet1", addr("C3")).unwrap(), "");
        assert_eq!(wb.cell_value("Sheet1", addr("A1")).unwrap(), CellValue::Empty);
    }

    #[test]
    fn test_literal_write_clears_formula() {
        let mut wb = MemorySession::new("Book1");
        wb.set_formula("Sheet1", addr("A1"), "=1+1", CellValue::from(2.0))
            .unwrap();
        wb.set_cell_value("Sheet1", addr("A1"), CellValue::from(5.0))
            .unwrap();
        assert_eq!(wb.cell_formula("Sheet1", addr("A1")).unwrap(), "");
    }

    #[test]
    fn test_used_range_tracks_content() {
        let mut wb = MemorySession::new("Book1");
        assert_eq!(wb.used_range("Sheet1").unwrap(), None);

        wb.set_cell_value("Sheet1", addr("B2"), CellValue::from("x"))
            .unwrap();
        wb.set_cell_value("Sheet1", addr("D5"), CellValue::from(1))
            .unwrap();
        assert_eq!(
            wb.used_range("Sheet1").unwrap().unwrap().to_string(),
            "B2:D5"
        );

        wb.set_cell_value("Sheet1", addr("D5"), CellValue::Empty)
            .unwrap();
        assert_eq!(wb.used_range("Sheet1").unwrap().unwrap().to_string(), "B2");
    }

    #[test]
    fn test_sheet_management() {
        let mut wb = MemorySession::new("Book1");
        wb.add_sheet("Expenses").unwrap();
        assert_eq!(wb.active_sheet().unwrap(), "Expenses");
        assert!(matches!(
            wb.add_sheet("Expenses"),
            Err(Error::DuplicateSheetName(_))
        ));

        wb.remove_sheet("Sheet1").unwrap();
        assert_eq!(wb.list_sheets().unwrap(), vec!["Expenses"]);
        assert!(matches!(
            wb.remove_sheet("Sheet1"),
            Err(Error::SheetNotFound(_))
        ));
        assert!(wb.remove_sheet("Expenses").is_err());
    }

    #[test]
    fn test_sheet_names_ignore_case() {
        let mut wb = MemorySession::with_sheets("Book1", &["Expenses"]);
        wb.set_cell_value("EXPENSES", addr("A1"), CellValue::from(1.0))
            .unwrap();
        assert_eq!(
            wb.cell_value("expenses", addr("A1")).unwrap(),
            CellValue::Number(1.0)
        );
        assert!(matches!(
            wb.add_sheet("expenses"),
            Err(Error::DuplicateSheetName(_))
        ));
    }

    #[test]
    fn test_rejected_sheet_name_leaves_workbook_unchanged() {
        let mut wb = MemorySession::new("Book1");
        let long = "x".repeat(32);
        for name in ["a/b", "Q1?", long.as_str()] {
            assert!(matches!(
                wb.add_sheet(name),
                Err(Error::InvalidSheetName(_))
            ));
        }
        assert_eq!(wb.list_sheets().unwrap(), vec!["Sheet1"]);
        assert_eq!(wb.active_sheet().unwrap(), "Sheet1");
    }

    #[test]
    fn test_unknown_sheet_is_not_found() {
        let mut wb = MemorySession::new("Book1");
        let err = wb.cell_value("Nope", addr("A1")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_display_text_override() {
        let mut wb = MemorySession::new("Book1");
        wb.set_cell_value("Sheet1", addr("A1"), CellValue::from(1000.0))
            .unwrap();
        assert_eq!(wb.cell_text("Sheet1", addr("A1")).unwrap(), "1000");

        wb.set_display_text("Sheet1", addr("A1"), "$1,000.00")
            .unwrap();
        assert_eq!(wb.cell_text("Sheet1", addr("A1")).unwrap(), "$1,000.00");
    }

    #[test]
    fn test_closed_session_rejects_calls() {
        let mut wb = MemorySession::new("Book1");
        wb.close().unwrap();
        assert!(wb.is_closed());
        assert!(wb.list_sheets().is_err());
    }
}
