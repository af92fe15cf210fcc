//! `ExcelSession` lifecycle against a shell script standing in for
//! `wine sheetprobe-bridge.exe`. The script logs every request line and
//! answers from a fixed table.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use sheetprobe_core::{Error, WorkbookSession};
use sheetprobe_excel::{ExcelSession, ExcelSessionConfig};

/// Writes the fake wine launcher and a placeholder exe into `dir`.
/// `arms` are extra `case` branches matched before the catch-all `ok`.
fn scripted_bridge(dir: &Path, arms: &str) -> ExcelSessionConfig {
    let exe = dir.join("sheetprobe-bridge.exe");
    fs::write(&exe, b"").unwrap();

    let script = format!(
        r#"#!/bin/sh
log="$(dirname "$1")/requests.log"
while IFS= read -r line; do
  printf '%s\n' "$line" >> "$log"
  id=$(printf '%s' "$line" | sed 's/^{{"id":\([0-9]*\).*/\1/')
  case "$line" in
    *'"cmd":"Shutdown"'*) printf '{{"id":%s,"status":"ok"}}\n' "$id"; exit 0 ;;
{arms}
    *) printf '{{"id":%s,"status":"ok"}}\n' "$id" ;;
  esac
done
"#
    );
    let wine = dir.join("fake-wine");
    fs::write(&wine, script).unwrap();
    fs::set_permissions(&wine, fs::Permissions::from_mode(0o755)).unwrap();

    ExcelSessionConfig {
        bridge_exe_path: Some(exe),
        wine_path: wine,
        ..Default::default()
    }
}

fn commands(dir: &Path) -> Vec<String> {
    let log: PathBuf = dir.join("requests.log");
    fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .map(|line| {
            let v: serde_json::Value = serde_json::from_str(line).unwrap();
            v["cmd"].as_str().unwrap_or_default().to_string()
        })
        .collect()
}

#[test]
fn test_failed_init_still_shuts_bridge_down() {
    let dir = tempfile::tempdir().unwrap();
    let config = scripted_bridge(
        dir.path(),
        r#"    *'"cmd":"Init"'*) printf '{"id":%s,"status":"error","kind":"failed","message":"Excel is not installed"}\n' "$id" ;;"#,
    );

    let err = ExcelSession::open(config).err();
    assert!(
        matches!(&err, Some(Error::Session(m)) if m.contains("Excel is not installed")),
        "unexpected result: {err:?}"
    );
    // Shutdown was sent and answered, so the process was waited on.
    assert_eq!(commands(dir.path()), vec!["Init", "Shutdown"]);
}

#[test]
fn test_bad_sheet_name_never_reaches_excel() {
    let dir = tempfile::tempdir().unwrap();
    let config = scripted_bridge(
        dir.path(),
        r#"    *'"cmd":"ActiveWorkbook"'*) printf '{"id":%s,"status":"ok","data":{"workbook":1,"opened":false}}\n' "$id" ;;"#,
    );

    let mut session = ExcelSession::open(config).unwrap();
    assert!(matches!(
        session.add_sheet("Q1/Q2"),
        Err(Error::InvalidSheetName(_))
    ));
    session.close().unwrap();

    // The user's own workbook is not closed on the way out.
    assert_eq!(
        commands(dir.path()),
        vec!["Init", "ActiveWorkbook", "Shutdown"]
    );
}
