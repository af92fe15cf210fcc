//! Excel-backed [`WorkbookSession`](sheetprobe_core::WorkbookSession) for sheetprobe.
//!
//! This crate spawns a Windows `.exe` under WINE that automates Excel through COM,
//! communicating over JSON-over-stdio. [`ExcelSession`] binds one workbook inside
//! that Excel instance and implements the session contract on top of it.
//!
//! # Architecture
//!
//! ```text
//! sheetprobe (native Linux)
//!     └── ExcelSession (this crate)
//!           └── spawns: wine sheetprobe-bridge.exe
//!                 └── COM: Excel.Application (attached or launched)
//! ```
//!
//! Excel's COM objects live in a single-threaded apartment. Create and use an
//! `ExcelSession` on one thread only; `sheetprobe::SessionWorker` does that.
//!
//! # Example
//!
//! ```rust,no_run
//! use sheetprobe_core::{CellAddress, WorkbookSession};
//! use sheetprobe_excel::{ExcelSession, ExcelSessionConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = ExcelSession::open(ExcelSessionConfig {
//!         workbook: Some("report.xlsx".into()),
//!         ..Default::default()
//!     })?;
//!     println!("sheets: {:?}", session.list_sheets()?);
//!     let value = session.cell_value("Expenses", CellAddress::parse("B15")?)?;
//!     println!("B15 = {value}");
//!     session.close()?;
//!     Ok(())
//! }
//! ```

mod bridge;
mod session;

pub use bridge::{linux_to_wine_path, BridgeError, ExcelBridge};
pub use session::{ExcelSession, ExcelSessionConfig};
