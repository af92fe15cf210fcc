//! Metric lookup: intersect the rows holding a metric label with the columns
//! holding a time-period label.
//!
//! Labels are free text and may repeat, so every intersection holding a value is
//! returned with its provenance and the caller picks. Not finding anything is
//! reported in [`MetricLookup::error`], never as an `Err`.

use std::collections::HashSet;

use serde::Serialize;
use sheetprobe_core::{CellAddress, CellValue, Result, WorkbookSession};

use crate::access::query_at;
use crate::search::{find_all_occurrences, CellMatch};

/// One populated intersection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricResult {
    pub sheet: String,
    /// A1 address of the intersection
    pub address: String,
    pub value: CellValue,
    /// Empty for literal cells
    pub formula: String,
    /// Row where the metric label was found
    pub metric_row: u32,
    /// Column where the time-period label was found
    pub period_column: String,
}

/// Outcome of a lookup: `error` is empty exactly when `matches` is not.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MetricLookup {
    pub error: String,
    pub matches: Vec<MetricResult>,
}

impl MetricLookup {
    fn failed(error: String) -> Self {
        Self {
            error,
            matches: Vec::new(),
        }
    }

    pub fn is_found(&self) -> bool {
        !self.matches.is_empty()
    }
}

/// Find the value of `metric` for `period` on `sheet`.
///
/// The metric is searched first; when it is absent the period search is
/// skipped. Candidates are the cross product of metric rows and period
/// columns, in that order, keeping only cells that hold a value.
pub fn find_metric_value(
    session: &mut dyn WorkbookSession,
    sheet: &str,
    metric: &str,
    period: &str,
) -> Result<MetricLookup> {
    let metric_hits = find_all_occurrences(session, metric, Some(sheet), false)?;
    if metric_hits.is_empty() {
        return Ok(MetricLookup::failed(format!(
            "metric '{metric}' not found in {sheet}"
        )));
    }

    let period_hits = find_all_occurrences(session, period, Some(sheet), false)?;
    if period_hits.is_empty() {
        return Ok(MetricLookup::failed(format!(
            "time period '{period}' not found in {sheet}"
        )));
    }

    let cells = intersections(&metric_hits, &period_hits)?;
    let matches = populated(session, sheet, cells)?;

    tracing::debug!(
        sheet,
        metric,
        period,
        metric_hits = metric_hits.len(),
        period_hits = period_hits.len(),
        found = matches.len(),
        "metric lookup"
    );

    if matches.is_empty() {
        return Ok(MetricLookup::failed(format!(
            "no values found for {metric} in {period}"
        )));
    }
    Ok(MetricLookup {
        error: String::new(),
        matches,
    })
}

/// (period column, metric row) for every pair, metric-major, first occurrence
/// of each address kept.
pub(crate) fn intersections(metric: &[CellMatch], period: &[CellMatch]) -> Result<Vec<CellAddress>> {
    let mut seen = HashSet::new();
    let mut cells = Vec::new();
    for m in metric {
        for p in period {
            let cell = CellAddress::from_parts(&p.column, m.row)?;
            if seen.insert(cell) {
                cells.push(cell);
            }
        }
    }
    Ok(cells)
}

/// Query each candidate in order, keeping those that hold a value.
fn populated(
    session: &mut dyn WorkbookSession,
    sheet: &str,
    cells: Vec<CellAddress>,
) -> Result<Vec<MetricResult>> {
    let mut matches = Vec::new();
    for cell in cells {
        let query = query_at(session, sheet, cell)?;
        if query.value.is_empty() {
            continue;
        }
        matches.push(MetricResult {
            sheet: sheet.to_string(),
            address: cell.to_a1_string(),
            value: query.value,
            formula: query.formula,
            metric_row: cell.row_number(),
            period_column: cell.column_letters(),
        });
    }
    Ok(matches)
}
