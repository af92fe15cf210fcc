//! Excel's object model, as far as sheetprobe needs it.

#![cfg(windows)]

use std::collections::HashMap;

use sheetprobe_protocol::{
    same_sheet_name, validate_sheet_name, CellValue, DefinedName, FailureKind,
};

use crate::dispatch::Dispatch;
use crate::variant;

// XlPictureAppearance / XlCopyPictureFormat
const XL_SCREEN: i32 = 1;
const XL_BITMAP: i32 = 2;

/// A failed command, classified for the client.
#[derive(Debug)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::NotFound,
            message: message.into(),
        }
    }

    fn duplicate(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Duplicate,
            message: message.into(),
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::InvalidArgument,
            message: message.into(),
        }
    }
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Self {
            kind: FailureKind::Failed,
            message,
        }
    }
}

pub type Outcome<T> = Result<T, Failure>;

pub struct ExcelApp {
    app: Dispatch,
    /// Only an instance we started gets quit on shutdown.
    launched: bool,
    workbooks: HashMap<u64, Dispatch>,
    next_handle: u64,
}

impl ExcelApp {
    pub fn connect(attach: bool, visible: bool) -> Outcome<Self> {
        let running = if attach {
            Dispatch::running("Excel.Application")?
        } else {
            None
        };

        let (app, launched) = match running {
            Some(app) => {
                tracing::info!("attached to running Excel");
                (app, false)
            }
            None => {
                let app = Dispatch::launch("Excel.Application")?;
                app.put("Visible", variant::from_bool(visible))?;
                app.put("DisplayAlerts", variant::from_bool(false))?;
                tracing::info!(visible, "launched Excel");
                (app, true)
            }
        };

        Ok(Self {
            app,
            launched,
            workbooks: HashMap::new(),
            next_handle: 1,
        })
    }

    fn register(&mut self, wb: Dispatch) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.workbooks.insert(handle, wb);
        handle
    }

    fn workbook(&self, handle: u64) -> Outcome<&Dispatch> {
        self.workbooks
            .get(&handle)
            .ok_or_else(|| Failure::invalid(format!("unknown workbook handle {handle}")))
    }

    /// Reuses the workbook if Excel already has that file open. The flag is
    /// true when this call opened it.
    pub fn open_workbook(&mut self, path: &str) -> Outcome<(u64, bool)> {
        let books = self.app.child("Workbooks")?;
        for wb in books.items()? {
            if wb.get_string("FullName")?.eq_ignore_ascii_case(path) {
                return Ok((self.register(wb), false));
            }
        }
        if !std::path::Path::new(path).exists() {
            return Err(Failure::not_found(format!("no such file: {path}")));
        }
        let wb = books.call_child("Open", &[variant::from_str(path)])?;
        Ok((self.register(wb), true))
    }

    /// Adds a workbook when none is open.
    pub fn active_workbook(&mut self) -> Outcome<(u64, bool)> {
        let active = self.app.get("ActiveWorkbook")?;
        match variant::get_dispatch(&active) {
            Some(_) => {
                let wb = self.app.child("ActiveWorkbook")?;
                Ok((self.register(wb), false))
            }
            None => {
                let wb = self.app.child("Workbooks")?.call_child("Add", &[])?;
                Ok((self.register(wb), true))
            }
        }
    }

    pub fn list_workbooks(&self) -> Outcome<Vec<String>> {
        let books = self.app.child("Workbooks")?;
        books
            .items()?
            .iter()
            .map(|wb| wb.get_string("FullName").map_err(Failure::from))
            .collect()
    }

    pub fn workbook_name(&self, handle: u64) -> Outcome<String> {
        Ok(self.workbook(handle)?.get_string("Name")?)
    }

    fn sheets(&self, handle: u64) -> Outcome<Vec<(String, Dispatch)>> {
        let sheets = self.workbook(handle)?.child("Worksheets")?;
        sheets
            .items()?
            .into_iter()
            .map(|ws| -> Outcome<(String, Dispatch)> { Ok((ws.get_string("Name")?, ws)) })
            .collect()
    }

    fn sheet(&self, handle: u64, sheet: &str) -> Outcome<Dispatch> {
        self.sheets(handle)?
            .into_iter()
            .find(|(n, _)| same_sheet_name(n, sheet))
            .map(|(_, ws)| ws)
            .ok_or_else(|| Failure::not_found(format!("no worksheet '{sheet}'")))
    }

    /// Delete with confirmation prompts suppressed.
    fn delete_sheet(&self, ws: &Dispatch) -> Outcome<()> {
        let alerts = self.app.get("DisplayAlerts")?;
        self.app.put("DisplayAlerts", variant::from_bool(false))?;
        let deleted = ws.call("Delete", &[]);
        self.app.put("DisplayAlerts", alerts)?;
        deleted?;
        Ok(())
    }

    fn range(&self, handle: u64, sheet: &str, address: &str) -> Outcome<Dispatch> {
        let ws = self.sheet(handle, sheet)?;
        ws.child_with("Range", &[variant::from_str(address)])
            .map_err(|e| Failure::invalid(format!("bad range '{address}': {e}")))
    }

    pub fn list_sheets(&self, handle: u64) -> Outcome<Vec<String>> {
        Ok(self.sheets(handle)?.into_iter().map(|(n, _)| n).collect())
    }

    pub fn active_sheet(&self, handle: u64) -> Outcome<String> {
        let wb = self.workbook(handle)?;
        let active = wb.get("ActiveSheet")?;
        if variant::get_dispatch(&active).is_none() {
            return Err(Failure::not_found("workbook has no active sheet"));
        }
        Ok(wb.child("ActiveSheet")?.get_string("Name")?)
    }

    /// Appends after the last sheet. A failed add leaves the sheet set as it was.
    pub fn add_sheet(&self, handle: u64, name: &str) -> Outcome<()> {
        validate_sheet_name(name).map_err(|e| Failure::invalid(e.to_string()))?;
        let existing = self.sheets(handle)?;
        if existing.iter().any(|(n, _)| same_sheet_name(n, name)) {
            return Err(Failure::duplicate(format!("sheet '{name}' already exists")));
        }
        let after = match existing.last() {
            Some((_, last)) => variant::from_dispatch(last.raw()),
            None => variant::missing(),
        };
        let ws = self
            .workbook(handle)?
            .child("Worksheets")?
            .call_child("Add", &[variant::missing(), after])?;
        if let Err(e) = ws.put("Name", variant::from_str(name)) {
            let _ = self.delete_sheet(&ws);
            return Err(Failure::invalid(format!("cannot name sheet '{name}': {e}")));
        }
        Ok(())
    }

    pub fn remove_sheet(&self, handle: u64, name: &str) -> Outcome<()> {
        let sheets = self.sheets(handle)?;
        if sheets.len() == 1 && same_sheet_name(&sheets[0].0, name) {
            return Err(Failure::from(format!(
                "cannot remove '{name}': a workbook needs at least one sheet"
            )));
        }
        let ws = self.sheet(handle, name)?;
        self.delete_sheet(&ws)
    }

    pub fn set_cell_value(
        &self,
        handle: u64,
        sheet: &str,
        cell: &str,
        value: &CellValue,
    ) -> Outcome<()> {
        let range = self.range(handle, sheet, cell)?;
        range.put("Value", variant::from_cell_value(value))?;
        Ok(())
    }

    pub fn cell_value(&self, handle: u64, sheet: &str, cell: &str) -> Outcome<CellValue> {
        let v = self.range(handle, sheet, cell)?.get("Value")?;
        Ok(variant::to_cell_value(&v))
    }

    /// Literal cells report their value as `Formula`; only `=...` counts.
    pub fn cell_formula(&self, handle: u64, sheet: &str, cell: &str) -> Outcome<String> {
        let formula = self.range(handle, sheet, cell)?.get_string("Formula")?;
        Ok(if formula.starts_with('=') {
            formula
        } else {
            String::new()
        })
    }

    pub fn cell_text(&self, handle: u64, sheet: &str, cell: &str) -> Outcome<String> {
        Ok(self.range(handle, sheet, cell)?.get_string("Text")?)
    }

    /// `None` when Excel's used range is a lone empty `$A$1`.
    pub fn used_range(&self, handle: u64, sheet: &str) -> Outcome<Option<String>> {
        let used = self.sheet(handle, sheet)?.child("UsedRange")?;
        let address = used.get_string("Address")?;
        if !address.contains(':') && variant::is_empty(&used.get("Value")?) {
            return Ok(None);
        }
        Ok(Some(address))
    }

    pub fn range_values(
        &self,
        handle: u64,
        sheet: &str,
        address: &str,
    ) -> Outcome<Vec<Vec<CellValue>>> {
        let range = self.range(handle, sheet, address)?;
        let rows = range.child("Rows")?.get_i32("Count")?;
        let cols = range.child("Columns")?.get_i32("Count")?;
        let cells = range.child("Cells")?;

        let mut out = Vec::with_capacity(rows as usize);
        for r in 1..=rows {
            let mut row = Vec::with_capacity(cols as usize);
            for c in 1..=cols {
                let cell = cells.child_with("Item", &[variant::from_i32(r), variant::from_i32(c)])?;
                row.push(variant::to_cell_value(&cell.get("Value")?));
            }
            out.push(row);
        }
        Ok(out)
    }

    pub fn list_names(&self, handle: u64) -> Outcome<Vec<DefinedName>> {
        let names = self.workbook(handle)?.child("Names")?;
        names
            .items()?
            .iter()
            .map(|n| -> Outcome<DefinedName> {
                Ok(DefinedName {
                    name: n.get_string("Name")?,
                    refers_to: n.get_string("RefersTo")?,
                })
            })
            .collect()
    }

    /// Copy the range as a picture, paste it into a throwaway chart sized to
    /// match, and export the chart.
    pub fn export_range_png(
        &self,
        handle: u64,
        sheet: &str,
        address: &str,
        path: &str,
    ) -> Outcome<()> {
        let ws = self.sheet(handle, sheet)?;
        let range = ws
            .child_with("Range", &[variant::from_str(address)])
            .map_err(|e| Failure::invalid(format!("bad range '{address}': {e}")))?;

        range.call(
            "CopyPicture",
            &[variant::from_i32(XL_SCREEN), variant::from_i32(XL_BITMAP)],
        )?;

        let width = variant::get_f64(&range.get("Width")?).unwrap_or(0.0);
        let height = variant::get_f64(&range.get("Height")?).unwrap_or(0.0);
        let holder = ws.call_child("ChartObjects", &[])?.call_child(
            "Add",
            &[
                variant::from_f64(0.0),
                variant::from_f64(0.0),
                variant::from_f64(width),
                variant::from_f64(height),
            ],
        )?;

        let exported = holder.child("Chart").and_then(|chart| {
            chart.call("Paste", &[])?;
            chart.call("Export", &[variant::from_str(path)])
        });
        holder.call("Delete", &[])?;
        exported?;
        Ok(())
    }

    pub fn save_workbook(&self, handle: u64, path: Option<&str>) -> Outcome<()> {
        let wb = self.workbook(handle)?;
        match path {
            None => {
                wb.call("Save", &[])?;
            }
            Some(path) => {
                wb.call(
                    "SaveAs",
                    &[variant::from_str(path), variant::from_i32(file_format(path))],
                )?;
            }
        }
        Ok(())
    }

    pub fn close_workbook(&mut self, handle: u64) -> Outcome<()> {
        let wb = self
            .workbooks
            .remove(&handle)
            .ok_or_else(|| Failure::invalid(format!("unknown workbook handle {handle}")))?;
        wb.call("Close", &[variant::from_bool(false)])?;
        Ok(())
    }

    /// Quits Excel only if we launched it; an attached instance is left running.
    pub fn shutdown(mut self) -> Outcome<()> {
        if !self.launched {
            self.workbooks.clear();
            return Ok(());
        }
        let handles: Vec<u64> = self.workbooks.keys().copied().collect();
        for h in handles {
            let _ = self.close_workbook(h);
        }
        self.app.call("Quit", &[])?;
        Ok(())
    }
}

/// XlFileFormat from the extension: xlsx 51, xls -4143, csv 6.
fn file_format(path: &str) -> i32 {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".xls") {
        -4143
    } else if lower.ends_with(".csv") {
        6
    } else {
        51
    }
}
