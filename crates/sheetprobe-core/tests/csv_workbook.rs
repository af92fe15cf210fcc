//! End-to-end tests for CSV-backed in-memory workbooks (load -> edit -> save -> reload)

use pretty_assertions::assert_eq;
use sheetprobe_core::{CellAddress, CellValue, CsvLoadOptions, MemorySession, WorkbookSession};

fn addr(s: &str) -> CellAddress {
    CellAddress::parse(s).unwrap()
}

#[test]
fn test_load_directory_as_sheets() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("b_revenue.csv"), "Quarter,Amount\nQ1,100\n").unwrap();
    std::fs::write(dir.path().join("a_expenses.csv"), "Item,Cost\nRent,2500\n").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let mut wb = MemorySession::from_csv_dir(dir.path(), &CsvLoadOptions::default()).unwrap();

    assert_eq!(wb.list_sheets().unwrap(), vec!["a_expenses", "b_revenue"]);
    assert_eq!(wb.active_sheet().unwrap(), "a_expenses");
    assert_eq!(
        wb.cell_value("b_revenue", addr("B2")).unwrap(),
        CellValue::Number(100.0)
    );
    assert_eq!(
        wb.used_range("a_expenses").unwrap().unwrap().to_string(),
        "A1:B2"
    );
}

#[test]
fn test_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Expenses.csv"), "Item,Cost\nRent,2500\n").unwrap();

    let mut wb = MemorySession::from_csv_dir(dir.path(), &CsvLoadOptions::default()).unwrap();
    wb.set_cell_value("Expenses", addr("B3"), CellValue::from(120.5))
        .unwrap();
    wb.set_cell_value("Expenses", addr("A3"), CellValue::from("Power, water"))
        .unwrap();
    wb.save(None).unwrap();

    let saved = std::fs::read_to_string(dir.path().join("Expenses.csv")).unwrap();
    assert_eq!(saved, "Item,Cost\nRent,2500\n\"Power, water\",120.5\n");

    let mut reloaded =
        MemorySession::from_csv_dir(dir.path(), &CsvLoadOptions::default()).unwrap();
    assert_eq!(
        reloaded.cell_value("Expenses", addr("A3")).unwrap(),
        CellValue::from("Power, water")
    );
}

#[test]
fn test_text_keeps_its_type_across_save() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Codes.csv"), "Code,Flag\n").unwrap();

    let mut wb = MemorySession::from_csv_dir(dir.path(), &CsvLoadOptions::default()).unwrap();
    wb.set_cell_value("Codes", addr("A2"), CellValue::from("007"))
        .unwrap();
    wb.set_cell_value("Codes", addr("B2"), CellValue::from("TRUE"))
        .unwrap();
    wb.set_cell_value("Codes", addr("B3"), CellValue::Bool(true))
        .unwrap();
    wb.save(None).unwrap();

    let saved = std::fs::read_to_string(dir.path().join("Codes.csv")).unwrap();
    assert_eq!(saved, "Code,Flag\n'007,'TRUE\n,TRUE\n");

    let mut reloaded =
        MemorySession::from_csv_dir(dir.path(), &CsvLoadOptions::default()).unwrap();
    assert_eq!(
        reloaded.cell_value("Codes", addr("A2")).unwrap(),
        CellValue::from("007")
    );
    assert_eq!(
        reloaded.cell_value("Codes", addr("B2")).unwrap(),
        CellValue::from("TRUE")
    );
    assert_eq!(
        reloaded.cell_value("Codes", addr("B3")).unwrap(),
        CellValue::Bool(true)
    );
}

#[test]
fn test_save_without_location_is_unsupported() {
    let mut wb = MemorySession::new("Book1");
    assert!(wb.save(None).is_err());

    let dir = tempfile::tempdir().unwrap();
    wb.save(Some(dir.path())).unwrap();
    assert!(dir.path().join("Sheet1.csv").exists());
}
