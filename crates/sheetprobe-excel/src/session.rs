//! [`WorkbookSession`] bound to one workbook inside a live Excel instance.

use std::path::{Path, PathBuf};

use sheetprobe_core::{
    validate_sheet_name, CellAddress, CellValue, Error, NamedRange, RangeRef, Result,
    WorkbookSession,
};
use sheetprobe_protocol::{Command, ResponseData};

use crate::bridge::{find_bridge_exe, linux_to_wine_path, BridgeError, ExcelBridge};

/// How to reach Excel and which workbook to bind.
#[derive(Debug, Clone)]
pub struct ExcelSessionConfig {
    /// Path to `sheetprobe-bridge.exe`; searched for when `None`.
    pub bridge_exe_path: Option<PathBuf>,

    /// Path to the WINE executable. Defaults to "wine".
    pub wine_path: PathBuf,

    /// Optional WINEPREFIX to isolate the WINE environment.
    pub wine_prefix: Option<PathBuf>,

    /// Workbook to open. `None` binds the application's active workbook.
    pub workbook: Option<PathBuf>,

    /// Reuse a running Excel instead of launching a new one.
    pub attach: bool,

    /// Show the Excel window when one is launched.
    pub visible: bool,
}

impl Default for ExcelSessionConfig {
    fn default() -> Self {
        Self {
            bridge_exe_path: None,
            wine_path: PathBuf::from("wine"),
            wine_prefix: None,
            workbook: None,
            attach: true,
            visible: false,
        }
    }
}

/// A workbook open in Excel, driven through the bridge process.
///
/// Not `Sync`, and must stay on the thread that opened it.
pub struct ExcelSession {
    bridge: Option<ExcelBridge>,
    handle: u64,
    /// The bridge opened the workbook, so closing the session closes it.
    owns_workbook: bool,
}

impl ExcelSession {
    /// Start the bridge, bind Excel and open (or adopt) the workbook.
    pub fn open(config: ExcelSessionConfig) -> Result<Self> {
        let exe = config.bridge_exe_path.clone().unwrap_or_else(find_bridge_exe);
        let mut bridge = ExcelBridge::spawn(&exe, &config.wine_path, config.wine_prefix.as_deref())?;

        let init = bridge.send(Command::Init {
            attach: config.attach,
            visible: config.visible,
        });
        if let Err(err) = init {
            let _ = bridge.shutdown();
            return Err(err.into());
        }

        let bind = match &config.workbook {
            Some(path) => Command::OpenWorkbook {
                path: linux_to_wine_path(path),
            },
            None => Command::ActiveWorkbook,
        };
        let (handle, owns_workbook) = match bridge.send(bind) {
            Ok(Some(ResponseData::WorkbookHandle { workbook, opened })) => (workbook, opened),
            Ok(_) => return Err(BridgeError::UnexpectedResponse("workbook handle").into()),
            Err(err) => {
                let subject = config
                    .workbook
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "active workbook".to_string());
                let _ = bridge.shutdown();
                return Err(Error::session(format!("cannot open {subject}: {err}")));
            }
        };
        tracing::info!(workbook = ?config.workbook, handle, owns_workbook, "excel session open");

        Ok(Self {
            bridge: Some(bridge),
            handle,
            owns_workbook,
        })
    }

    fn bridge(&mut self) -> Result<&mut ExcelBridge> {
        self.bridge
            .as_mut()
            .ok_or_else(|| Error::session("excel session is closed"))
    }

    fn send(&mut self, command: Command, subject: &str) -> Result<Option<ResponseData>> {
        self.bridge()?
            .send(command)
            .map_err(|e| e.into_session_error(subject))
    }
}

impl WorkbookSession for ExcelSession {
    fn workbook_name(&mut self) -> Result<String> {
        let workbook = self.handle;
        match self.send(Command::WorkbookName { workbook }, "workbook")? {
            Some(ResponseData::Name { name }) => Ok(name),
            _ => Err(BridgeError::UnexpectedResponse("workbook name").into()),
        }
    }

    fn list_open_workbooks(&mut self) -> Result<Vec<String>> {
        match self.send(Command::ListWorkbooks, "workbooks")? {
            Some(ResponseData::Names { names }) => Ok(names),
            _ => Err(BridgeError::UnexpectedResponse("workbook list").into()),
        }
    }

    fn list_sheets(&mut self) -> Result<Vec<String>> {
        let workbook = self.handle;
        match self.send(Command::ListSheets { workbook }, "sheets")? {
            Some(ResponseData::Names { names }) => Ok(names),
            _ => Err(BridgeError::UnexpectedResponse("sheet list").into()),
        }
    }

    fn active_sheet(&mut self) -> Result<String> {
        let workbook = self.handle;
        match self.send(Command::ActiveSheet { workbook }, "active sheet") {
            Ok(Some(ResponseData::Name { name })) => Ok(name),
            Ok(_) => Err(BridgeError::UnexpectedResponse("active sheet").into()),
            Err(Error::SheetNotFound(_)) => Err(Error::NoActiveSheet),
            Err(err) => Err(err),
        }
    }

    fn add_sheet(&mut self, name: &str) -> Result<()> {
        validate_sheet_name(name)?;
        let workbook = self.handle;
        self.send(
            Command::AddSheet {
                workbook,
                name: name.to_string(),
            },
            name,
        )?;
        Ok(())
    }

    fn remove_sheet(&mut self, name: &str) -> Result<()> {
        let workbook = self.handle;
        self.send(
            Command::RemoveSheet {
                workbook,
                name: name.to_string(),
            },
            name,
        )?;
        Ok(())
    }

    fn cell_value(&mut self, sheet: &str, cell: CellAddress) -> Result<CellValue> {
        let command = Command::GetCellValue {
            workbook: self.handle,
            sheet: sheet.to_string(),
            cell: cell.to_a1_string(),
        };
        match self.send(command, sheet)? {
            Some(ResponseData::Value { value }) => Ok(value),
            _ => Err(BridgeError::UnexpectedResponse("cell value").into()),
        }
    }

    fn set_cell_value(&mut self, sheet: &str, cell: CellAddress, value: CellValue) -> Result<()> {
        let command = Command::SetCellValue {
            workbook: self.handle,
            sheet: sheet.to_string(),
            cell: cell.to_a1_string(),
            value,
        };
        self.send(command, sheet)?;
        Ok(())
    }

    fn cell_formula(&mut self, sheet: &str, cell: CellAddress) -> Result<String> {
        let command = Command::GetCellFormula {
            workbook: self.handle,
            sheet: sheet.to_string(),
            cell: cell.to_a1_string(),
        };
        match self.send(command, sheet)? {
            Some(ResponseData::Formula { formula }) => Ok(formula),
            _ => Err(BridgeError::UnexpectedResponse("cell formula").into()),
        }
    }

    fn cell_text(&mut self, sheet: &str, cell: CellAddress) -> Result<String> {
        let command = Command::GetCellText {
            workbook: self.handle,
            sheet: sheet.to_string(),
            cell: cell.to_a1_string(),
        };
        match self.send(command, sheet)? {
            Some(ResponseData::Text { text }) => Ok(text),
            _ => Err(BridgeError::UnexpectedResponse("cell text").into()),
        }
    }

    fn used_range(&mut self, sheet: &str) -> Result<Option<RangeRef>> {
        let command = Command::GetUsedRange {
            workbook: self.handle,
            sheet: sheet.to_string(),
        };
        match self.send(command, sheet)? {
            Some(ResponseData::Range { address: Some(address) }) => {
                RangeRef::parse(&address).map(Some)
            }
            Some(ResponseData::Range { address: None }) => Ok(None),
            _ => Err(BridgeError::UnexpectedResponse("used range").into()),
        }
    }

    fn range_values(&mut self, sheet: &str, range: RangeRef) -> Result<Vec<Vec<CellValue>>> {
        let command = Command::GetRangeValues {
            workbook: self.handle,
            sheet: sheet.to_string(),
            range: range.to_a1_string(),
        };
        let rows = match self.send(command, sheet)? {
            Some(ResponseData::Values { rows }) => rows,
            _ => return Err(BridgeError::UnexpectedResponse("range values").into()),
        };

        let width = range.col_count() as usize;
        if rows.len() != range.row_count() as usize || rows.iter().any(|r| r.len() != width) {
            return Err(Error::session(format!(
                "bridge returned a ragged block for {range}"
            )));
        }
        Ok(rows)
    }

    fn named_ranges(&mut self) -> Result<Vec<NamedRange>> {
        let workbook = self.handle;
        match self.send(Command::ListNames { workbook }, "names")? {
            Some(ResponseData::DefinedNames { defined }) => Ok(defined
                .into_iter()
                .map(|d| NamedRange::from_refers_to(d.name, &d.refers_to))
                .collect()),
            _ => Err(BridgeError::UnexpectedResponse("defined names").into()),
        }
    }

    fn export_range_png(&mut self, sheet: &str, range: RangeRef, path: &Path) -> Result<()> {
        let command = Command::ExportRangePng {
            workbook: self.handle,
            sheet: sheet.to_string(),
            range: range.to_a1_string(),
            path: linux_to_wine_path(path),
        };
        self.send(command, sheet)?;
        Ok(())
    }

    fn save(&mut self, path: Option<&Path>) -> Result<()> {
        let command = Command::SaveWorkbook {
            workbook: self.handle,
            path: path.map(linux_to_wine_path),
        };
        self.send(command, "workbook")?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let Some(mut bridge) = self.bridge.take() else {
            return Ok(());
        };
        // A workbook the user already had open is left open
        let closed = if self.owns_workbook {
            bridge
                .send(Command::CloseWorkbook {
                    workbook: self.handle,
                })
                .map(drop)
        } else {
            Ok(())
        };
        bridge.shutdown()?;
        closed?;
        tracing::info!(handle = self.handle, "excel session closed");
        Ok(())
    }
}

impl Drop for ExcelSession {
    fn drop(&mut self) {
        if let Some(bridge) = self.bridge.take() {
            let _ = bridge.shutdown();
        }
    }
}
