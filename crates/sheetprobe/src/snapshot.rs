//! Best-effort raster capture of a range.
//!
//! Capture depends on the hosting application being able to render, which it
//! often cannot (headless, no printer driver, in-memory session). Failures are
//! logged and reported as `None`/`false`, never as errors.

use std::path::Path;

use base64::Engine;
use serde::Serialize;
use sheetprobe_core::{Error, RangeRef, Result, WorkbookSession};

/// A rendered PNG of a sheet region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub sheet: String,
    pub range: RangeRef,
    #[serde(skip)]
    pub png: Vec<u8>,
}

impl Snapshot {
    /// `data:image/png;base64,...`, ready to embed or hand to an image model.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.png)
        )
    }
}

fn resolve_range(
    session: &mut dyn WorkbookSession,
    sheet: &str,
    range: Option<RangeRef>,
) -> Result<RangeRef> {
    match range {
        Some(range) => Ok(range),
        None => session
            .used_range(sheet)?
            .ok_or_else(|| Error::session(format!("sheet '{sheet}' has nothing to capture"))),
    }
}

fn render(
    session: &mut dyn WorkbookSession,
    sheet: &str,
    range: Option<RangeRef>,
) -> Result<Snapshot> {
    let range = resolve_range(session, sheet, range)?;
    let file = tempfile::Builder::new()
        .prefix("sheetprobe-")
        .suffix(".png")
        .tempfile()?;
    session.export_range_png(sheet, range, file.path())?;

    let png = std::fs::read(file.path())?;
    if png.is_empty() {
        return Err(Error::session("application produced an empty image"));
    }
    Ok(Snapshot {
        sheet: sheet.to_string(),
        range,
        png,
    })
}

/// Render `range` (or the used range) of `sheet` to PNG bytes.
pub fn capture_snapshot(
    session: &mut dyn WorkbookSession,
    sheet: &str,
    range: Option<RangeRef>,
) -> Option<Snapshot> {
    match render(session, sheet, range) {
        Ok(snapshot) => {
            tracing::debug!(sheet, range = %snapshot.range, bytes = snapshot.png.len(), "captured snapshot");
            Some(snapshot)
        }
        Err(err) => {
            tracing::warn!("Failed to capture snapshot of {sheet}: {err}");
            None
        }
    }
}

/// Render straight to `output`. Returns whether a file was written.
pub fn capture_snapshot_to(
    session: &mut dyn WorkbookSession,
    sheet: &str,
    range: Option<RangeRef>,
    output: &Path,
) -> bool {
    let written = resolve_range(session, sheet, range)
        .and_then(|range| session.export_range_png(sheet, range, output));
    match written {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!("Failed to capture snapshot of {sheet} to {}: {err}", output.display());
            false
        }
    }
}
