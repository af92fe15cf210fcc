//! Worksheet naming rules, shared by every session backend.

use crate::error::{Error, Result};

/// Maximum length of a sheet name (Excel limit)
pub const MAX_SHEET_NAME_LEN: usize = 31;

const INVALID_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];

/// Check that `name` can be used for a new sheet.
pub fn validate_sheet_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidSheetName("Sheet name cannot be empty".into()));
    }
    if name.chars().count() > MAX_SHEET_NAME_LEN {
        return Err(Error::InvalidSheetName(format!(
            "Sheet name too long (max {MAX_SHEET_NAME_LEN} characters): {name}"
        )));
    }
    if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
        return Err(Error::InvalidSheetName(format!(
            "Sheet name cannot contain '{c}': {name}"
        )));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return Err(Error::InvalidSheetName(format!(
            "Sheet name cannot start or end with an apostrophe: {name}"
        )));
    }
    Ok(())
}

/// Sheet names compare case-insensitively, as Excel does.
pub fn same_sheet_name(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate_sheet_name("Expenses").is_ok());
        assert!(validate_sheet_name("Q1 Plan (draft)").is_ok());
        assert!(validate_sheet_name(&"A".repeat(MAX_SHEET_NAME_LEN)).is_ok());
        assert!(validate_sheet_name("Bilanz für Ärzte").is_ok());
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", "  ", "a/b", "a\\b", "Q1?", "x*", "[x]", "a:b", "'quoted'"] {
            assert!(
                matches!(validate_sheet_name(name), Err(Error::InvalidSheetName(_))),
                "{name:?} should be rejected"
            );
        }
        let long = "A".repeat(MAX_SHEET_NAME_LEN + 1);
        assert!(matches!(
            validate_sheet_name(&long),
            Err(Error::InvalidSheetName(_))
        ));
    }

    #[test]
    fn test_names_match_ignoring_case() {
        assert!(same_sheet_name("Expenses", "EXPENSES"));
        assert!(same_sheet_name("Ärzte", "ärzte"));
        assert!(!same_sheet_name("Expenses", "Expense"));
    }
}
