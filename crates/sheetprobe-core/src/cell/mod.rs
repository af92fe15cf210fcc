//! Cell values and addressing

mod address;
mod value;

pub use address::{CellAddress, RangeRef, RangeCells};
pub use value::{CellError, CellValue};
