//! Error types for sheetprobe-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by workbook sessions and the layers built on them.
///
/// "Nothing matched" is never one of these: searches and metric lookups
/// report empty results as data.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid cell address format
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Invalid cell range format
    #[error("Invalid cell range: {0}")]
    InvalidRange(String),

    /// Sheet not found by name
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// Sheet name Excel would refuse
    #[error("Invalid sheet name: {0}")]
    InvalidSheetName(String),

    /// Duplicate sheet name
    #[error("Sheet name already exists: {0}")]
    DuplicateSheetName(String),

    /// Defined name not found
    #[error("Named range not found: {0}")]
    NameNotFound(String),

    /// The workbook has no sheet to fall back on
    #[error("Workbook has no active sheet")]
    NoActiveSheet,

    /// The session cannot perform this operation
    #[error("Operation not supported by this session: {0}")]
    Unsupported(String),

    /// The hosting application failed unexpectedly
    #[error("Session call failed: {0}")]
    Session(String),

    /// The session worker thread is gone
    #[error("Session worker has stopped")]
    WorkerStopped,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV library error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Create a new session failure with a message
    pub fn session<S: Into<String>>(msg: S) -> Self {
        Error::Session(msg.into())
    }

    /// True for the "does not exist" family (sheet, name, address)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::SheetNotFound(_) | Error::NameNotFound(_) | Error::InvalidAddress(_)
        )
    }
}
