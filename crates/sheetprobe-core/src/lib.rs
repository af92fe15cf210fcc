//! # sheetprobe-core
//!
//! Shared building blocks for sheetprobe:
//! - [`CellValue`] - the variant value held by a cell (number, text, boolean, error, empty)
//! - [`CellAddress`] and [`RangeRef`] - A1-style addressing
//! - [`WorkbookSession`] - the contract a live spreadsheet application must satisfy
//! - [`MemorySession`] - an in-process session, optionally seeded from CSV files
//!
//! ## Example
//!
//! ```rust
//! use sheetprobe_core::{CellAddress, CellValue, MemorySession, WorkbookSession};
//!
//! let mut session = MemorySession::new("Budget");
//! session.add_sheet("Expenses").unwrap();
//!
//! let b2 = CellAddress::parse("B2").unwrap();
//! session.set_cell_value("Expenses", b2, CellValue::from(1200.0)).unwrap();
//! assert_eq!(session.cell_value("Expenses", b2).unwrap(), CellValue::Number(1200.0));
//! ```

pub mod cell;
pub mod error;
pub mod memory;
pub mod named_range;
pub mod session;
pub mod sheet_name;

pub use cell::{CellAddress, CellError, CellValue, RangeRef};
pub use error::{Error, Result};
pub use memory::{CsvLoadOptions, MemorySession};
pub use named_range::NamedRange;
pub use session::WorkbookSession;
pub use sheet_name::{same_sheet_name, validate_sheet_name, MAX_SHEET_NAME_LEN};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;
