//! [`Probe`]: the one handle every consumer holds.
//!
//! Built once at startup around a [`SessionWorker`] and passed to whatever
//! needs workbook access. Each method marshals one operation onto the worker
//! and awaits its result.

use std::collections::BTreeMap;
use std::path::PathBuf;

use sheetprobe_core::{CellValue, RangeRef, Result, WorkbookSession};

use crate::access::{self, CellQuery, SheetStructure};
use crate::metric::{self, MetricLookup};
use crate::search::{self, CellMatch};
use crate::snapshot::{self, Snapshot};
use crate::table::{self, Table};
use crate::worker::{SessionWorker, WorkerConfig};

fn parse_range(range: Option<&str>) -> Result<Option<RangeRef>> {
    range.map(RangeRef::parse).transpose()
}

#[derive(Clone)]
pub struct Probe {
    worker: SessionWorker,
}

impl Probe {
    pub fn new(worker: SessionWorker) -> Self {
        Self { worker }
    }

    /// Spawn a worker that opens its session with `open`, and wrap it.
    pub fn start<S, F>(config: WorkerConfig, open: F) -> Result<Self>
    where
        S: WorkbookSession + 'static,
        F: FnOnce() -> Result<S> + Send + 'static,
    {
        SessionWorker::spawn(config, open).map(Self::new)
    }

    pub fn worker(&self) -> &SessionWorker {
        &self.worker
    }

    pub async fn workbook_name(&self) -> Result<String> {
        self.worker.call(|s| s.workbook_name()).await
    }

    pub async fn list_open_workbooks(&self) -> Result<Vec<String>> {
        self.worker.call(|s| s.list_open_workbooks()).await
    }

    pub async fn structure(&self) -> Result<Vec<SheetStructure>> {
        self.worker.call(access::structure).await
    }

    pub async fn list_sheets(&self) -> Result<Vec<String>> {
        self.worker.call(access::list_sheets).await
    }

    pub async fn active_sheet(&self) -> Result<String> {
        self.worker.call(|s| s.active_sheet()).await
    }

    pub async fn add_sheet(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.worker.call(move |s| access::add_sheet(s, &name)).await
    }

    pub async fn remove_sheet(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.worker.call(move |s| access::remove_sheet(s, &name)).await
    }

    pub async fn read_cell(&self, sheet: &str, address: &str) -> Result<CellValue> {
        let (sheet, address) = (sheet.to_string(), address.to_string());
        self.worker
            .call(move |s| access::read_cell(s, &sheet, &address))
            .await
    }

    pub async fn write_cell(&self, sheet: &str, address: &str, value: CellValue) -> Result<()> {
        let (sheet, address) = (sheet.to_string(), address.to_string());
        self.worker
            .call(move |s| access::write_cell(s, &sheet, &address, value))
            .await
    }

    pub async fn query_cell(&self, sheet: &str, address: &str) -> Result<CellQuery> {
        let (sheet, address) = (sheet.to_string(), address.to_string());
        self.worker
            .call(move |s| access::query_cell(s, &sheet, &address))
            .await
    }

    pub async fn list_named_ranges(&self) -> Result<BTreeMap<String, String>> {
        self.worker.call(access::list_named_ranges).await
    }

    /// `range` in A1 form; the used range when `None`.
    pub async fn range_table(&self, sheet: &str, range: Option<&str>) -> Result<Table> {
        let range = parse_range(range)?;
        let sheet = sheet.to_string();
        self.worker
            .call(move |s| table::range_table(s, &sheet, range))
            .await
    }

    pub async fn render_range_text(&self, sheet: &str, range: Option<&str>) -> Result<String> {
        let range = parse_range(range)?;
        let sheet = sheet.to_string();
        self.worker
            .call(move |s| table::render_range_text(s, &sheet, range))
            .await
    }

    /// `Ok(None)` when capture failed (the cause is logged); `Err` only when
    /// the worker is gone or `range` does not parse.
    pub async fn capture_snapshot(&self, sheet: &str, range: Option<&str>) -> Result<Option<Snapshot>> {
        let range = parse_range(range)?;
        let sheet = sheet.to_string();
        self.worker
            .call(move |s| Ok(snapshot::capture_snapshot(s, &sheet, range)))
            .await
    }

    pub async fn capture_snapshot_to(
        &self,
        sheet: &str,
        range: Option<&str>,
        output: impl Into<PathBuf>,
    ) -> Result<bool> {
        let range = parse_range(range)?;
        let (sheet, output) = (sheet.to_string(), output.into());
        self.worker
            .call(move |s| Ok(snapshot::capture_snapshot_to(s, &sheet, range, &output)))
            .await
    }

    pub async fn find_all_occurrences(
        &self,
        value: &str,
        sheet: Option<&str>,
        whole_workbook: bool,
    ) -> Result<Vec<CellMatch>> {
        let value = value.to_string();
        let sheet = sheet.map(str::to_string);
        self.worker
            .call(move |s| search::find_all_occurrences(s, &value, sheet.as_deref(), whole_workbook))
            .await
    }

    pub async fn find_partial_occurrences(
        &self,
        substring: &str,
        sheet: Option<&str>,
        whole_workbook: bool,
    ) -> Result<Vec<CellMatch>> {
        let substring = substring.to_string();
        let sheet = sheet.map(str::to_string);
        self.worker
            .call(move |s| {
                search::find_partial_occurrences(s, &substring, sheet.as_deref(), whole_workbook)
            })
            .await
    }

    /// The whole lookup runs as one job, so no write can land between the
    /// searches and the intersection reads.
    pub async fn find_metric_value(&self, sheet: &str, metric: &str, period: &str) -> Result<MetricLookup> {
        let (sheet, metric, period) = (sheet.to_string(), metric.to_string(), period.to_string());
        self.worker
            .call(move |s| metric::find_metric_value(s, &sheet, &metric, &period))
            .await
    }

    /// Save in place, or to `path`.
    pub async fn save(&self, path: Option<PathBuf>) -> Result<()> {
        self.worker
            .call(move |s| {
                s.save(path.as_deref())?;
                tracing::info!(path = ?path, "workbook saved");
                Ok(())
            })
            .await
    }

    /// Close the workbook and stop the worker.
    pub async fn shutdown(&self) -> Result<()> {
        self.worker.shutdown().await
    }
}
