//! Cell address and range types

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A single cell position (e.g. "B7").
///
/// Stored 0-based; displayed and serialised in A1 notation. `$` markers are
/// accepted when parsing (Excel reports addresses as `$B$7`) and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    /// Row index (0-based internally, 1-based in display)
    pub row: u32,
    /// Column index (0-based, A=0, B=1, ..., XFD=16383)
    pub col: u16,
}

impl CellAddress {
    /// Create a cell address from 0-based indices
    pub fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    /// Create a cell address from a 1-based row number and column letters
    pub fn from_parts(letters: &str, row_number: u32) -> Result<Self> {
        if row_number == 0 || row_number > MAX_ROWS {
            return Err(Error::InvalidAddress(format!("{letters}{row_number}")));
        }
        Ok(Self::new(row_number - 1, Self::letters_to_column(letters)?))
    }

    /// Parse a cell address from A1-style notation
    ///
    /// # Examples
    /// ```
    /// use sheetprobe_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("$G$5").unwrap();
    /// assert_eq!(addr.row, 4);
    /// assert_eq!(addr.col, 6);
    /// assert_eq!(addr.to_string(), "G5");
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }

        let bytes = s.as_bytes();
        let mut pos = 0;
        if bytes[pos] == b'$' {
            pos += 1;
        }

        let col_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            pos += 1;
        }
        if pos == col_start {
            return Err(Error::InvalidAddress(format!("no column letters in '{s}'")));
        }
        let col = Self::letters_to_column(&s[col_start..pos])
            .map_err(|_| Error::InvalidAddress(format!("column out of range in '{s}'")))?;

        if bytes.get(pos) == Some(&b'$') {
            pos += 1;
        }

        let row_str = &s[pos..];
        if row_str.is_empty() {
            return Err(Error::InvalidAddress(format!("no row number in '{s}'")));
        }
        let row: u32 = row_str
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{s}'")))?;

        if row == 0 || row > MAX_ROWS {
            return Err(Error::InvalidAddress(format!("row out of range in '{s}'")));
        }

        Ok(Self { row: row - 1, col })
    }

    /// Convert column index to letters (0 = A, 25 = Z, 26 = AA, etc.)
    pub fn column_to_letters(col: u16) -> String {
        let mut result = String::new();
        let mut n = col as u32 + 1;

        while n > 0 {
            n -= 1;
            result.insert(0, ((n % 26) as u8 + b'A') as char);
            n /= 26;
        }

        result
    }

    /// Convert column letters to index (A = 0, Z = 25, AA = 26, etc.)
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        if letters.is_empty() {
            return Err(Error::InvalidAddress("empty column letters".into()));
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!("invalid column letter '{c}'")));
            }
            col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
            if col > MAX_COLS as u32 {
                return Err(Error::InvalidAddress(format!("column '{letters}' out of range")));
            }
        }

        Ok((col - 1) as u16)
    }

    /// Column letters of this address ("G" for G5)
    pub fn column_letters(&self) -> String {
        Self::column_to_letters(self.col)
    }

    /// Spreadsheet row number (1-based)
    pub fn row_number(&self) -> u32 {
        self.row + 1
    }

    /// Format as A1-style string
    pub fn to_a1_string(&self) -> String {
        format!("{}{}", self.column_letters(), self.row_number())
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_letters(), self.row_number())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for CellAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_a1_string())
    }
}

impl<'de> Deserialize<'de> for CellAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A rectangular block of cells (e.g. "A1:D10"), always normalised so that
/// `start` is the top-left corner and `end` the bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeRef {
    /// Top-left cell
    pub start: CellAddress,
    /// Bottom-right cell
    pub end: CellAddress,
}

impl RangeRef {
    /// Create a range spanning two corners in any order
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        Self {
            start: CellAddress::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellAddress::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// Create a single-cell range
    pub fn single(addr: CellAddress) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    /// Parse "A1:B10", "$A$1:$B$10" or a single cell
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let bad = |_| Error::InvalidRange(s.to_string());

        match s.split_once(':') {
            Some((a, b)) => Ok(Self::new(
                CellAddress::parse(a).map_err(bad)?,
                CellAddress::parse(b).map_err(bad)?,
            )),
            None => Ok(Self::single(CellAddress::parse(s).map_err(bad)?)),
        }
    }

    /// Split an optional sheet qualifier off a reference.
    ///
    /// `'Q1 Plan'!$A$1:$B$2` yields `(Some("Q1 Plan"), "$A$1:$B$2")`. A leading
    /// `=` (as in Excel's `RefersTo`) is ignored.
    pub fn split_sheet(reference: &str) -> (Option<String>, &str) {
        let reference = reference.trim().trim_start_matches('=');
        match reference.rsplit_once('!') {
            Some((sheet, addr)) => {
                let sheet = sheet
                    .strip_prefix('\'')
                    .and_then(|s| s.strip_suffix('\''))
                    .map(|s| s.replace("''", "'"))
                    .unwrap_or_else(|| sheet.to_string());
                (Some(sheet), addr)
            }
            None => (None, reference),
        }
    }

    /// Number of rows
    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// Number of columns
    pub fn col_count(&self) -> u16 {
        self.end.col - self.start.col + 1
    }

    /// Smallest range covering both
    pub fn union(&self, other: &RangeRef) -> RangeRef {
        RangeRef {
            start: CellAddress::new(
                self.start.row.min(other.start.row),
                self.start.col.min(other.start.col),
            ),
            end: CellAddress::new(
                self.end.row.max(other.end.row),
                self.end.col.max(other.end.col),
            ),
        }
    }

    /// Column letters of every column in the range, left to right
    pub fn column_letters(&self) -> Vec<String> {
        (self.start.col..=self.end.col)
            .map(CellAddress::column_to_letters)
            .collect()
    }

    /// Iterate over all cell addresses in the range (row by row)
    pub fn cells(&self) -> RangeCells {
        RangeCells {
            range: *self,
            next: Some(self.start),
        }
    }

    /// Format as A1:B10 string
    pub fn to_a1_string(&self) -> String {
        if self.start == self.end {
            self.start.to_a1_string()
        } else {
            format!("{}:{}", self.start, self.end)
        }
    }
}

impl fmt::Display for RangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for RangeRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for RangeRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_a1_string())
    }
}

impl<'de> Deserialize<'de> for RangeRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Row-major iterator over the cells of a [`RangeRef`]
pub struct RangeCells {
    range: RangeRef,
    next: Option<CellAddress>,
}

impl Iterator for RangeCells {
    type Item = CellAddress;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        self.next = if current.col < self.range.end.col {
            Some(CellAddress::new(current.row, current.col + 1))
        } else if current.row < self.range.end.row {
            Some(CellAddress::new(current.row + 1, self.range.start.col))
        } else {
            None
        };

        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters_roundtrip() {
        assert_eq!(CellAddress::column_to_letters(0), "A");
        assert_eq!(CellAddress::column_to_letters(25), "Z");
        assert_eq!(CellAddress::column_to_letters(26), "AA");
        assert_eq!(CellAddress::column_to_letters(701), "ZZ");
        assert_eq!(CellAddress::column_to_letters(16383), "XFD");

        assert_eq!(CellAddress::letters_to_column("ah").unwrap(), 33);
        assert_eq!(CellAddress::letters_to_column("XFD").unwrap(), 16383);
        assert!(CellAddress::letters_to_column("XFE").is_err());
    }

    #[test]
    fn test_parse_with_dollar_markers() {
        let addr = CellAddress::parse("$I$3").unwrap();
        assert_eq!(addr, CellAddress::new(2, 8));
        assert_eq!(addr.column_letters(), "I");
        assert_eq!(addr.row_number(), 3);
    }

    #[test]
    fn test_parse_errors() {
        assert!(CellAddress::parse("").is_err());
        assert!(CellAddress::parse("A").is_err());
        assert!(CellAddress::parse("12").is_err());
        assert!(CellAddress::parse("A0").is_err());
        assert!(CellAddress::parse("A1048577").is_err());
        assert!(CellAddress::parse("B-2").is_err());
    }

    #[test]
    fn test_from_parts() {
        assert_eq!(CellAddress::from_parts("G", 5).unwrap().to_string(), "G5");
        assert!(CellAddress::from_parts("G", 0).is_err());
    }

    #[test]
    fn test_range_parse_normalises_corners() {
        let range = RangeRef::parse("$D$10:$B$2").unwrap();
        assert_eq!(range.to_string(), "B2:D10");
        assert_eq!(range.row_count(), 9);
        assert_eq!(range.col_count(), 3);
        assert_eq!(range.column_letters(), vec!["B", "C", "D"]);
    }

    #[test]
    fn test_range_cells_row_major() {
        let cells: Vec<String> = RangeRef::parse("A1:B2")
            .unwrap()
            .cells()
            .map(|a| a.to_string())
            .collect();
        assert_eq!(cells, vec!["A1", "B1", "A2", "B2"]);
    }

    #[test]
    fn test_split_sheet() {
        assert_eq!(
            RangeRef::split_sheet("='Q1 Plan'!$A$1:$B$2"),
            (Some("Q1 Plan".to_string()), "$A$1:$B$2")
        );
        assert_eq!(
            RangeRef::split_sheet("Expenses!C4"),
            (Some("Expenses".to_string()), "C4")
        );
        assert_eq!(RangeRef::split_sheet("C4"), (None, "C4"));
    }

    #[test]
    fn test_union() {
        let a = RangeRef::parse("B2:C3").unwrap();
        let b = RangeRef::parse("A5").unwrap();
        assert_eq!(a.union(&b).to_string(), "A2:C5");
    }
}
