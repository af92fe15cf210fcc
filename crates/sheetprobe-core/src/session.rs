//! The contract between sheetprobe and a live spreadsheet application.

use std::path::Path;

use crate::cell::{CellAddress, CellValue, RangeRef};
use crate::error::Result;
use crate::named_range::NamedRange;

/// A handle onto one open workbook inside a spreadsheet application.
///
/// Every call passes straight through to the application: nothing is cached,
/// so a read issued after a write observes that write. Implementations are
/// driven from a single thread (see `sheetprobe::SessionWorker`) and need not
/// be `Send` or `Sync`.
///
/// Structural failures (unknown sheet, bad address, duplicate name) are errors.
/// An empty cell is a value ([`CellValue::Empty`]), not an error.
pub trait WorkbookSession {
    /// Name of the workbook this session is bound to
    fn workbook_name(&mut self) -> Result<String>;

    /// Full names of every workbook open in the application
    fn list_open_workbooks(&mut self) -> Result<Vec<String>>;

    /// Sheet names in workbook order
    fn list_sheets(&mut self) -> Result<Vec<String>>;

    /// Name of the currently active sheet
    fn active_sheet(&mut self) -> Result<String>;

    /// Add an empty sheet; fails with `DuplicateSheetName` if the name is taken
    fn add_sheet(&mut self, name: &str) -> Result<()>;

    /// Delete a sheet; fails with `SheetNotFound` if absent
    fn remove_sheet(&mut self, name: &str) -> Result<()>;

    /// Current value of a cell (the computed result for formula cells)
    fn cell_value(&mut self, sheet: &str, cell: CellAddress) -> Result<CellValue>;

    /// Overwrite a cell with a literal value
    fn set_cell_value(&mut self, sheet: &str, cell: CellAddress, value: CellValue) -> Result<()>;

    /// Formula text of a cell; empty for literal cells
    fn cell_formula(&mut self, sheet: &str, cell: CellAddress) -> Result<String>;

    /// The cell as displayed, honouring number formatting
    fn cell_text(&mut self, sheet: &str, cell: CellAddress) -> Result<String>;

    /// Bounds of the sheet's content, recomputed on every call; `None` when empty
    fn used_range(&mut self, sheet: &str) -> Result<Option<RangeRef>>;

    /// Values of a block of cells, row-major, exactly `row_count` x `col_count`
    fn range_values(&mut self, sheet: &str, range: RangeRef) -> Result<Vec<Vec<CellValue>>>;

    /// All defined names in the workbook
    fn named_ranges(&mut self) -> Result<Vec<NamedRange>>;

    /// Render a block of cells to a PNG file at `path`
    fn export_range_png(&mut self, sheet: &str, range: RangeRef, path: &Path) -> Result<()>;

    /// Save in place, or to `path` when given
    fn save(&mut self, path: Option<&Path>) -> Result<()>;

    /// Close the workbook and release the application
    fn close(&mut self) -> Result<()>;
}

impl<S: WorkbookSession + ?Sized> WorkbookSession for Box<S> {
    fn workbook_name(&mut self) -> Result<String> {
        (**self).workbook_name()
    }

    fn list_open_workbooks(&mut self) -> Result<Vec<String>> {
        (**self).list_open_workbooks()
    }

    fn list_sheets(&mut self) -> Result<Vec<String>> {
        (**self).list_sheets()
    }

    fn active_sheet(&mut self) -> Result<String> {
        (**self).active_sheet()
    }

    fn add_sheet(&mut self, name: &str) -> Result<()> {
        (**self).add_sheet(name)
    }

    fn remove_sheet(&mut self, name: &str) -> Result<()> {
        (**self).remove_sheet(name)
    }

    fn cell_value(&mut self, sheet: &str, cell: CellAddress) -> Result<CellValue> {
        (**self).cell_value(sheet, cell)
    }

    fn set_cell_value(&mut self, sheet: &str, cell: CellAddress, value: CellValue) -> Result<()> {
        (**self).set_cell_value(sheet, cell, value)
    }

    fn cell_formula(&mut self, sheet: &str, cell: CellAddress) -> Result<String> {
        (**self).cell_formula(sheet, cell)
    }

    fn cell_text(&mut self, sheet: &str, cell: CellAddress) -> Result<String> {
        (**self).cell_text(sheet, cell)
    }

    fn used_range(&mut self, sheet: &str) -> Result<Option<RangeRef>> {
        (**self).used_range(sheet)
    }

    fn range_values(&mut self, sheet: &str, range: RangeRef) -> Result<Vec<Vec<CellValue>>> {
        (**self).range_values(sheet, range)
    }

    fn named_ranges(&mut self) -> Result<Vec<NamedRange>> {
        (**self).named_ranges()
    }

    fn export_range_png(&mut self, sheet: &str, range: RangeRef, path: &Path) -> Result<()> {
        (**self).export_range_png(sheet, range, path)
    }

    fn save(&mut self, path: Option<&Path>) -> Result<()> {
        (**self).save(path)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
