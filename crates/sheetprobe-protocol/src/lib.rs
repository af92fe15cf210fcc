//! Protocol spoken between the native sheetprobe client and the Windows
//! bridge process that drives Excel over COM.
//!
//! The protocol is JSON-over-stdio: one JSON object per line in each direction.
//! Every request carries an id that the matching response echoes back.

use serde::{Deserialize, Serialize};

pub use sheetprobe_core::{same_sheet_name, validate_sheet_name, CellError, CellValue};

/// A command sent from the client to the bridge process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Monotonically increasing request ID for correlating responses.
    pub id: u64,
    /// The command to execute.
    #[serde(flatten)]
    pub command: Command,
}

/// Commands the client can send to the bridge.
///
/// Cells and ranges travel in A1 notation; row/column numbering is Excel's.
/// Sheets are named, matched case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "params")]
pub enum Command {
    /// Initialise COM (single-threaded apartment) and bind to Excel.
    /// With `attach`, a running instance is reused when there is one.
    Init { attach: bool, visible: bool },

    /// Open a workbook from a (Windows) path. Returns a workbook handle.
    OpenWorkbook { path: String },

    /// Bind to the application's active workbook, adding one if none is open.
    ActiveWorkbook,

    /// Full names of all open workbooks.
    ListWorkbooks,

    /// Name of a workbook.
    WorkbookName { workbook: u64 },

    /// Worksheet names in tab order.
    ListSheets { workbook: u64 },

    /// Name of the active worksheet.
    ActiveSheet { workbook: u64 },

    /// Add a worksheet with the given name.
    AddSheet { workbook: u64, name: String },

    /// Delete a worksheet.
    RemoveSheet { workbook: u64, name: String },

    /// Set a cell's literal value.
    SetCellValue {
        workbook: u64,
        sheet: String,
        cell: String,
        value: CellValue,
    },

    /// Get a cell's computed value.
    GetCellValue {
        workbook: u64,
        sheet: String,
        cell: String,
    },

    /// Get a cell's formula string (empty string if no formula).
    GetCellFormula {
        workbook: u64,
        sheet: String,
        cell: String,
    },

    /// Get a cell's displayed text.
    GetCellText {
        workbook: u64,
        sheet: String,
        cell: String,
    },

    /// Address of the sheet's used range.
    GetUsedRange { workbook: u64, sheet: String },

    /// Values of every cell in a range, row-major.
    GetRangeValues {
        workbook: u64,
        sheet: String,
        range: String,
    },

    /// Defined names of a workbook.
    ListNames { workbook: u64 },

    /// Render a range to a PNG file (Windows path).
    ExportRangePng {
        workbook: u64,
        sheet: String,
        range: String,
        path: String,
    },

    /// Save a workbook in place, or to `path` (format inferred from extension).
    SaveWorkbook { workbook: u64, path: Option<String> },

    /// Close a workbook without saving.
    CloseWorkbook { workbook: u64 },

    /// Shut down the bridge. Excel is only quit if the bridge launched it.
    Shutdown,
}

/// A response sent from the bridge back to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// The request ID this response corresponds to.
    pub id: u64,
    /// The result of the command.
    #[serde(flatten)]
    pub result: ResponseResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ResponseResult {
    #[serde(rename = "ok")]
    Ok {
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<ResponseData>,
    },
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        kind: FailureKind,
        message: String,
    },
}

impl ResponseResult {
    pub fn ok(data: ResponseData) -> Self {
        ResponseResult::Ok { data: Some(data) }
    }

    pub fn done() -> Self {
        ResponseResult::Ok { data: None }
    }
}

/// Classification of a failed command, so the client can tell a missing
/// sheet from a broken Excel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    Duplicate,
    InvalidArgument,
    #[default]
    Failed,
}

/// Data returned in successful responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseData {
    /// Handle to a bound workbook. `opened` is false when the workbook was
    /// already open in Excel before this session.
    WorkbookHandle {
        workbook: u64,
        #[serde(default)]
        opened: bool,
    },
    /// A cell value.
    Value { value: CellValue },
    /// A formula string.
    Formula { formula: String },
    /// Displayed cell text.
    Text { text: String },
    /// A single name (workbook or sheet).
    Name { name: String },
    /// A list of names (workbooks or sheets).
    Names { names: Vec<String> },
    /// Row-major cell values.
    Values { rows: Vec<Vec<CellValue>> },
    /// Defined names with their `RefersTo` text.
    DefinedNames { defined: Vec<DefinedName> },
    /// A range address; `None` for sheets with no content.
    /// Kept last: an absent optional field would otherwise match any shape.
    Range { address: Option<String> },
}

/// A defined name as Excel reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinedName {
    pub name: String,
    /// e.g. `=Expenses!$B$2:$D$10`
    pub refers_to: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_wire_format() {
        let req = Request {
            id: 7,
            command: Command::GetCellValue {
                workbook: 1,
                sheet: "Expenses".into(),
                cell: "G5".into(),
            },
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(
            json,
            r#"{"id":7,"cmd":"GetCellValue","params":{"workbook":1,"sheet":"Expenses","cell":"G5"}}"#
        );
    }

    #[test]
    fn test_unit_command_wire_format() {
        let req = Request {
            id: 1,
            command: Command::ActiveWorkbook,
        };
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"id":1,"cmd":"ActiveWorkbook"}"#
        );
    }

    #[test]
    fn test_error_response_defaults_kind() {
        let resp: Response =
            serde_json::from_str(r#"{"id":3,"status":"error","message":"boom"}"#).unwrap();
        match resp.result {
            ResponseResult::Error { kind, message } => {
                assert_eq!(kind, FailureKind::Failed);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_response_data_shapes() {
        let resp: Response = serde_json::from_str(
            r#"{"id":4,"status":"ok","data":{"rows":[[null,"Net Income",1000]]}}"#,
        )
        .unwrap();
        match resp.result {
            ResponseResult::Ok {
                data: Some(ResponseData::Values { rows }),
            } => {
                assert_eq!(
                    rows,
                    vec![vec![
                        CellValue::Empty,
                        CellValue::from("Net Income"),
                        CellValue::Number(1000.0)
                    ]]
                );
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let resp: Response =
            serde_json::from_str(r#"{"id":6,"status":"ok","data":{"workbook":2}}"#).unwrap();
        assert!(matches!(
            resp.result,
            ResponseResult::Ok {
                data: Some(ResponseData::WorkbookHandle {
                    workbook: 2,
                    opened: false
                })
            }
        ));

        let resp: Response =
            serde_json::from_str(r#"{"id":5,"status":"ok","data":{"address":null}}"#).unwrap();
        assert!(matches!(
            resp.result,
            ResponseResult::Ok {
                data: Some(ResponseData::Range { address: None })
            }
        ));
    }
}
