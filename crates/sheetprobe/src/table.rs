//! A rectangular block of a sheet, addressed by spreadsheet coordinates.
//!
//! Columns are labelled with the source column letters and every row carries
//! its spreadsheet row number, so any table cell maps back to exactly one
//! sheet cell.

use serde::Serialize;
use sheetprobe_core::{CellAddress, CellValue, RangeRef, Result, WorkbookSession};

/// Header of the synthetic leading column.
pub const ROW_NUMBER_HEADER: &str = "Row";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    /// 1-based spreadsheet row number
    pub row_number: u32,
    pub cells: Vec<CellValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Table {
    /// Source range, `None` for an empty table
    pub range: Option<RangeRef>,
    /// Column letters of the source range
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl Table {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from a row-major block read at `range`.
    pub fn from_values(range: RangeRef, values: Vec<Vec<CellValue>>) -> Self {
        if values.iter().flatten().all(CellValue::is_empty) {
            return Self::empty();
        }
        let first_row = range.start.row_number();
        let rows = values
            .into_iter()
            .zip(first_row..)
            .map(|(cells, row_number)| TableRow { row_number, cells })
            .collect();
        Self {
            range: Some(range),
            columns: range.column_letters(),
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Column count including the leading row-number column
    pub fn column_count(&self) -> usize {
        if self.rows.is_empty() {
            0
        } else {
            self.columns.len() + 1
        }
    }

    /// Every cell with its sheet address, top-to-bottom then left-to-right.
    pub fn cells(&self) -> impl Iterator<Item = (CellAddress, &CellValue)> + '_ {
        let first_col = self.range.map_or(0, |r| r.start.col);
        self.rows.iter().flat_map(move |row| {
            row.cells.iter().enumerate().map(move |(i, value)| {
                (
                    CellAddress::new(row.row_number - 1, first_col + i as u16),
                    value,
                )
            })
        })
    }

    /// Pipe-delimited markdown with a `Row` column followed by the column letters.
    pub fn to_markdown(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        let mut out = String::new();
        out.push_str("| ");
        out.push_str(ROW_NUMBER_HEADER);
        for column in &self.columns {
            out.push_str(" | ");
            out.push_str(column);
        }
        out.push_str(" |\n|");
        for _ in 0..self.column_count() {
            out.push_str(" --- |");
        }
        out.push('\n');

        for row in &self.rows {
            out.push_str("| ");
            out.push_str(&row.row_number.to_string());
            for value in &row.cells {
                out.push_str(" | ");
                out.push_str(&escape(&value.to_string()));
            }
            out.push_str(" |\n");
        }
        out
    }
}

fn escape(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

/// Materialise `range`, or the sheet's used range when `None`, as a [`Table`].
pub fn range_table(
    session: &mut dyn WorkbookSession,
    sheet: &str,
    range: Option<RangeRef>,
) -> Result<Table> {
    let range = match range {
        Some(range) => range,
        None => match session.used_range(sheet)? {
            Some(used) => used,
            None => return Ok(Table::empty()),
        },
    };
    let values = session.range_values(sheet, range)?;
    Ok(Table::from_values(range, values))
}

/// The same table rendered as markdown text.
pub fn render_range_text(
    session: &mut dyn WorkbookSession,
    sheet: &str,
    range: Option<RangeRef>,
) -> Result<String> {
    Ok(range_table(session, sheet, range)?.to_markdown())
}
