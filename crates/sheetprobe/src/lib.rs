//! # sheetprobe
//!
//! Agent-facing access to a workbook that is open in a live spreadsheet
//! application.
//!
//! - [`access`] - sheets, cells (value, formula, displayed text), named ranges, structure
//! - [`table`] - a range as a [`Table`] addressed by column letters and row numbers,
//!   and its markdown rendering
//! - [`search`] - exact and partial content search
//! - [`metric`] - metric x time-period lookup
//! - [`snapshot`] - best-effort PNG capture
//! - [`worker`] - the single thread that owns the session
//! - [`Probe`] - the context object tying these together
//!
//! The free functions in each module take `&mut dyn WorkbookSession` and are
//! synchronous. [`Probe`] runs them on the session thread and awaits them.
//!
//! ## Example
//!
//! ```rust
//! use sheetprobe::{Probe, WorkerConfig};
//! use sheetprobe_core::{CellValue, MemorySession};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> sheetprobe_core::Result<()> {
//! let probe = Probe::start(WorkerConfig::default(), || {
//!     Ok(MemorySession::with_sheets("Budget", &["Expenses"]))
//! })?;
//!
//! probe.write_cell("Expenses", "A5", CellValue::from("Net Income")).await?;
//! probe.write_cell("Expenses", "D1", CellValue::from("2023")).await?;
//! probe.write_cell("Expenses", "D5", CellValue::from(1000.0)).await?;
//!
//! let lookup = probe.find_metric_value("Expenses", "Net Income", "2023").await?;
//! assert_eq!(lookup.matches[0].address, "D5");
//! probe.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod metric;
pub mod probe;
pub mod search;
pub mod snapshot;
pub mod table;
pub mod worker;

pub use access::{CellQuery, SheetStructure};
pub use metric::{MetricLookup, MetricResult};
pub use probe::Probe;
pub use search::{CellMatch, SearchScope};
pub use snapshot::Snapshot;
pub use table::{Table, TableRow};
pub use worker::{SessionWorker, WorkerConfig};

pub use sheetprobe_core::{CellValue, Error, Result, WorkbookSession};
