//! CSV import/export for in-memory sheets

use std::io::{Read, Write};

use crate::cell::{CellAddress, CellValue};
use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};

/// Leading mark on a text field that would otherwise load as another type,
/// the same convention Excel uses for text entry.
const TEXT_MARK: char = '\'';

/// Options for loading CSV files into sheets
#[derive(Debug, Clone)]
pub struct CsvLoadOptions {
    /// Field delimiter (default: comma)
    pub delimiter: u8,
    /// Quote character (default: double quote)
    pub quote: u8,
    /// Type numbers and booleans instead of keeping every field as text.
    /// A field starting with `'` is then text without the mark.
    pub auto_detect_types: bool,
}

impl Default for CsvLoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            auto_detect_types: true,
        }
    }
}

/// Read every record as a sheet row. Empty fields produce no cell.
///
/// Fails with [`Error::InvalidRange`] on data past the last row or column.
pub(super) fn read_cells<R: Read>(
    reader: R,
    options: &CsvLoadOptions,
) -> Result<Vec<(CellAddress, CellValue)>> {
    let mut csv_reader = ::csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .quote(options.quote)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut cells = Vec::new();
    for (row, record) in csv_reader.records().enumerate() {
        let record = record?;
        let row = u32::try_from(row)
            .ok()
            .filter(|r| *r < MAX_ROWS)
            .ok_or_else(|| Error::InvalidRange(format!("more than {MAX_ROWS} rows")))?;
        for (col, field) in record.iter().enumerate() {
            let value = if options.auto_detect_types {
                match field.strip_prefix(TEXT_MARK) {
                    Some(text) => CellValue::from(text),
                    None => CellValue::parse_input(field),
                }
            } else if field.is_empty() {
                CellValue::Empty
            } else {
                CellValue::from(field)
            };
            if value.is_empty() {
                continue;
            }
            let col = u16::try_from(col)
                .ok()
                .filter(|c| *c < MAX_COLS)
                .ok_or_else(|| {
                    Error::InvalidRange(format!(
                        "row {} has more than {MAX_COLS} columns",
                        row + 1
                    ))
                })?;
            cells.push((CellAddress::new(row, col), value));
        }
    }

    Ok(cells)
}

/// The field written for `value`, such that [`read_cells`] with type
/// detection reads back the same value.
pub(super) fn field_text(value: &CellValue) -> String {
    match value {
        CellValue::Text(text)
            if !text.is_empty()
                && (text.starts_with(TEXT_MARK)
                    || CellValue::parse_input(text) != CellValue::Text(text.clone())) =>
        {
            format!("{TEXT_MARK}{text}")
        }
        other => other.to_string(),
    }
}

pub(super) fn write_rows<W: Write>(writer: W, rows: &[Vec<String>]) -> Result<()> {
    let mut csv_writer = ::csv::WriterBuilder::new()
        .terminator(::csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    for record in rows {
        csv_writer.write_record(record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_cells_types_and_positions() {
        let data = "Metric,2022,2023\nNet Income,,1000\nActive,TRUE,\n";
        let cells = read_cells(data.as_bytes(), &CsvLoadOptions::default()).unwrap();

        let find = |a: &str| {
            let a = CellAddress::parse(a).unwrap();
            cells.iter().find(|(c, _)| *c == a).map(|(_, v)| v.clone())
        };
        assert_eq!(find("A1"), Some(CellValue::from("Metric")));
        assert_eq!(find("C1"), Some(CellValue::Number(2023.0)));
        assert_eq!(find("B2"), None);
        assert_eq!(find("C2"), Some(CellValue::Number(1000.0)));
        assert_eq!(find("B3"), Some(CellValue::Bool(true)));
    }

    #[test]
    fn test_read_cells_as_text() {
        let options = CsvLoadOptions {
            auto_detect_types: false,
            ..Default::default()
        };
        let cells = read_cells("2023\n".as_bytes(), &options).unwrap();
        assert_eq!(cells[0].1, CellValue::from("2023"));
    }

    #[test]
    fn test_read_cells_rejects_too_many_columns() {
        let mut line = vec![""; MAX_COLS as usize];
        line.push("overflow");
        let data = format!("Metric\n{}\n", line.join(","));

        let err = read_cells(data.as_bytes(), &CsvLoadOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidRange(_)), "{err:?}");
    }

    #[test]
    fn test_read_cells_last_column_fits() {
        let mut line = vec![""; MAX_COLS as usize - 1];
        line.push("edge");
        let cells = read_cells(line.join(",").as_bytes(), &CsvLoadOptions::default()).unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].0.to_a1_string(), "XFD1");
    }

    #[test]
    fn test_text_that_looks_typed_reads_back_as_text() {
        let values = [
            CellValue::from("007"),
            CellValue::from("TRUE"),
            CellValue::from("'quoted"),
            CellValue::from("  "),
            CellValue::from("Net Income"),
            CellValue::Number(7.0),
            CellValue::Bool(true),
        ];
        let row: Vec<String> = values.iter().map(field_text).collect();
        assert_eq!(row[4], "Net Income");

        let mut out = Vec::new();
        write_rows(&mut out, &[row]).unwrap();
        let cells = read_cells(out.as_slice(), &CsvLoadOptions::default()).unwrap();

        let read: Vec<CellValue> = cells.into_iter().map(|(_, v)| v).collect();
        assert_eq!(read, values);
    }
}
