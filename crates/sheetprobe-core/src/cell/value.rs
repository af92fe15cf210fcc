//! Cell value types

use serde::{Deserialize, Serialize};
use std::fmt;

/// The value held by a cell, as reported by the hosting application.
///
/// Serialised untagged, so JSON carries the natural representation:
/// `null`, `true`, `1250.5`, `"Net Income"`, `{"code": "#DIV/0!"}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Empty cell (no value)
    #[default]
    Empty,
    /// Boolean value (TRUE/FALSE)
    Bool(bool),
    /// Numeric value (dates arrive as serial numbers)
    Number(f64),
    /// Text value
    Text(String),
    /// Error value (#VALUE!, #REF!, etc.)
    Error(CellError),
}

/// An error value shown in a cell, e.g. `#N/A`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellError {
    pub code: String,
}

impl CellError {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

impl CellValue {
    /// True for cells that hold nothing worth reporting: no value, or empty text.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Get the type name for messages
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Bool(_) => "boolean",
            CellValue::Number(_) => "number",
            CellValue::Text(_) => "text",
            CellValue::Error(_) => "error",
        }
    }

    /// Whether this cell's content is exactly `needle`.
    ///
    /// Text compares verbatim. Numbers match a needle that parses to the same
    /// number, so a year header stored as `2023` matches `"2023"`. Booleans match
    /// `TRUE`/`FALSE` in any case. Empty and error cells never match.
    pub fn matches_exactly(&self, needle: &str) -> bool {
        match self {
            CellValue::Text(s) => s == needle,
            CellValue::Number(n) => needle.trim().parse::<f64>().map_or(false, |v| v == *n),
            CellValue::Bool(b) => needle.eq_ignore_ascii_case(if *b { "TRUE" } else { "FALSE" }),
            CellValue::Empty | CellValue::Error(_) => false,
        }
    }

    /// Whether this is a text cell containing `needle`. Non-text cells never match.
    pub fn contains_text(&self, needle: &str) -> bool {
        match self {
            CellValue::Text(s) => s.contains(needle),
            _ => false,
        }
    }

    /// Interpret free-form user input the way a spreadsheet entry box does:
    /// blank clears the cell, numbers and TRUE/FALSE are typed, anything else is text.
    pub fn parse_input(input: &str) -> CellValue {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return CellValue::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return CellValue::Bool(false);
        }
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return CellValue::Number(n);
            }
        }

        CellValue::Text(input.to_string())
    }
}

/// Renders the way a "General" formatted cell would: integral numbers without
/// a decimal point, booleans upper-case, empty as nothing.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            CellValue::Text(s) => f.write_str(s),
            CellValue::Error(e) => f.write_str(&e.code),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<CellError> for CellValue {
    fn from(e: CellError) -> Self {
        CellValue::Error(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_by_type() {
        assert!(CellValue::from("Net Income").matches_exactly("Net Income"));
        assert!(!CellValue::from("Total Net Income").matches_exactly("Net Income"));
        assert!(!CellValue::from("net income").matches_exactly("Net Income"));

        assert!(CellValue::from(2023).matches_exactly("2023"));
        assert!(CellValue::from(2023).matches_exactly("2023.0"));
        assert!(!CellValue::from(2023).matches_exactly("FY2023"));

        assert!(CellValue::from(true).matches_exactly("true"));
        assert!(!CellValue::Empty.matches_exactly(""));
        assert!(!CellValue::Error(CellError::new("#N/A")).matches_exactly("#N/A"));
    }

    #[test]
    fn test_contains_text_only_for_text() {
        assert!(CellValue::from("Total Net Income").contains_text("Net Income"));
        assert!(!CellValue::from(12345).contains_text("234"));
        assert!(!CellValue::Empty.contains_text(""));
    }

    #[test]
    fn test_is_empty() {
        assert!(CellValue::Empty.is_empty());
        assert!(CellValue::from("").is_empty());
        assert!(!CellValue::from(0).is_empty());
        assert!(!CellValue::from(false).is_empty());
    }

    #[test]
    fn test_display_general_format() {
        assert_eq!(CellValue::from(1000.0).to_string(), "1000");
        assert_eq!(CellValue::from(-2.5).to_string(), "-2.5");
        assert_eq!(CellValue::from(false).to_string(), "FALSE");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[test]
    fn test_parse_input() {
        assert_eq!(CellValue::parse_input("42"), CellValue::Number(42.0));
        assert_eq!(CellValue::parse_input(" TRUE "), CellValue::Bool(true));
        assert_eq!(CellValue::parse_input(""), CellValue::Empty);
        assert_eq!(CellValue::parse_input("Q3 2023"), CellValue::from("Q3 2023"));
        assert_eq!(CellValue::parse_input("inf"), CellValue::from("inf"));
    }

    #[test]
    fn test_json_representation() {
        let values = vec![
            CellValue::Empty,
            CellValue::Bool(true),
            CellValue::Number(1.5),
            CellValue::from("x"),
            CellValue::Error(CellError::new("#REF!")),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r##"[null,true,1.5,"x",{"code":"#REF!"}]"##);

        let back: Vec<CellValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }
}
