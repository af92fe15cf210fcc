//! Defined names (named ranges)

use serde::{Deserialize, Serialize};

use crate::cell::RangeRef;

/// A workbook-defined name and the block of cells it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRange {
    /// The name (e.g., "SalesData", "TaxRate")
    pub name: String,
    /// Sheet the reference points into, when qualified
    pub sheet: Option<String>,
    /// A1-style address without `$` markers, e.g. "B2:D10"
    pub address: String,
}

impl NamedRange {
    pub fn new(name: impl Into<String>, sheet: Option<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sheet,
            address: address.into(),
        }
    }

    /// Build from an Excel-style `RefersTo` such as `=Expenses!$B$2:$D$10`.
    ///
    /// References that are not plain cell ranges (constants, formulas) keep
    /// their text verbatim in `address`.
    pub fn from_refers_to(name: impl Into<String>, refers_to: &str) -> Self {
        let (sheet, address) = RangeRef::split_sheet(refers_to);
        let address = match RangeRef::parse(address) {
            Ok(range) => range.to_a1_string(),
            Err(_) => refers_to.trim_start_matches('=').to_string(),
        };
        Self::new(name, sheet, address)
    }
}
