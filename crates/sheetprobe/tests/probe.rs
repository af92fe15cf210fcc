//! End-to-end behaviour through the `Probe` context over a CSV-seeded session.

use std::fs;

use pretty_assertions::assert_eq;
use sheetprobe::{CellValue, Error, Probe, WorkerConfig};
use sheetprobe_core::{CsvLoadOptions, MemorySession};

const EXPENSES: &str = "\
Metric,,2022,2023,,,2023
Revenue,,5000,5400,,,5600
Costs,,4200,4400,,,4350
,,,,,,
Net Income,,800,,1000,,1250
,,,,,,
Total Net Income,,,,,,
";

fn start(dir: &tempfile::TempDir) -> Probe {
    fs::write(dir.path().join("Expenses.csv"), EXPENSES).unwrap();
    fs::write(dir.path().join("Notes.csv"), "Net Income is after tax\n").unwrap();
    let path = dir.path().to_path_buf();
    Probe::start(WorkerConfig::default(), move || {
        MemorySession::from_csv_dir(&path, &CsvLoadOptions::default())
    })
    .unwrap()
}

#[tokio::test]
async fn test_structure_and_table() {
    let dir = tempfile::tempdir().unwrap();
    let probe = start(&dir);

    assert_eq!(probe.list_sheets().await.unwrap(), vec!["Expenses", "Notes"]);

    let structure = probe.structure().await.unwrap();
    assert_eq!(structure[0].address.as_deref(), Some("A1:G7"));
    assert_eq!((structure[0].rows, structure[0].columns), (7, 7));

    let table = probe.range_table("Expenses", None).await.unwrap();
    assert_eq!(table.row_count(), 7);
    assert_eq!(table.column_count(), 8);
    let rows: Vec<u32> = table.rows.iter().map(|r| r.row_number).collect();
    assert_eq!(rows, (1..=7).collect::<Vec<_>>());

    let text = probe
        .render_range_text("Expenses", Some("A1:D2"))
        .await
        .unwrap();
    assert_eq!(
        text,
        "| Row | A | B | C | D |\n| --- | --- | --- | --- | --- |\n| 1 | Metric |  | 2022 | 2023 |\n| 2 | Revenue |  | 5000 | 5400 |\n"
    );

    probe.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_metric_lookup_over_repeated_period() {
    let dir = tempfile::tempdir().unwrap();
    let probe = start(&dir);

    // D5 is blank, G5 holds 1250
    let lookup = probe
        .find_metric_value("Expenses", "Net Income", "2023")
        .await
        .unwrap();
    assert_eq!(lookup.error, "");
    let found: Vec<(&str, &CellValue)> = lookup
        .matches
        .iter()
        .map(|m| (m.address.as_str(), &m.value))
        .collect();
    assert_eq!(found, vec![("G5", &CellValue::Number(1250.0))]);

    probe.write_cell("Expenses", "G5", CellValue::Empty).await.unwrap();
    let lookup = probe
        .find_metric_value("Expenses", "Net Income", "2023")
        .await
        .unwrap();
    assert!(lookup.matches.is_empty());
    assert_eq!(lookup.error, "no values found for Net Income in 2023");

    probe.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_exact_versus_partial_search() {
    let dir = tempfile::tempdir().unwrap();
    let probe = start(&dir);

    let exact = probe
        .find_all_occurrences("Net Income", None, true)
        .await
        .unwrap();
    let exact: Vec<String> = exact.iter().map(ToString::to_string).collect();
    assert_eq!(exact, vec!["Expenses!A5"]);

    let partial = probe
        .find_partial_occurrences("Net Income", None, true)
        .await
        .unwrap();
    let partial: Vec<String> = partial.iter().map(ToString::to_string).collect();
    assert_eq!(partial, vec!["Expenses!A5", "Expenses!A7", "Notes!A1"]);

    probe.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_write_query_and_save() {
    let dir = tempfile::tempdir().unwrap();
    let probe = start(&dir);

    probe
        .write_cell("Notes", "B2", CellValue::from(42.0))
        .await
        .unwrap();
    let q = probe.query_cell("Notes", "B2").await.unwrap();
    assert_eq!(q.value, CellValue::Number(42.0));
    assert_eq!(q.formula, "");
    assert_eq!(q.visible_text, "42");

    probe.save(None).await.unwrap();
    let saved = fs::read_to_string(dir.path().join("Notes.csv")).unwrap();
    assert_eq!(saved, "Net Income is after tax,\n,42\n");

    probe.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_errors_and_soft_failures() {
    let dir = tempfile::tempdir().unwrap();
    let probe = start(&dir);

    assert!(probe
        .read_cell("Nope", "A1")
        .await
        .unwrap_err()
        .is_not_found());
    assert!(matches!(
        probe.add_sheet("Notes").await,
        Err(Error::DuplicateSheetName(_))
    ));
    assert!(matches!(
        probe.range_table("Expenses", Some("A1:")).await,
        Err(Error::InvalidRange(_))
    ));

    // Rendering is unsupported in memory: reported, not raised
    assert_eq!(probe.capture_snapshot("Expenses", None).await.unwrap(), None);

    probe.shutdown().await.unwrap();
    assert!(matches!(
        probe.list_sheets().await,
        Err(Error::WorkerStopped)
    ));
}
