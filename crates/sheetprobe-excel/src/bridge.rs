//! Bridge subprocess lifecycle and the line-oriented JSON exchange with it.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Stdio};

use sheetprobe_core::Error;
use sheetprobe_protocol::{Command, FailureKind, Request, Response, ResponseData, ResponseResult};

/// Name of the Windows executable that hosts the COM side.
pub(crate) const BRIDGE_EXE: &str = "sheetprobe-bridge.exe";

/// Errors from talking to the bridge process.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Failed to spawn WINE bridge process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("WINE not found. Install WINE and ensure 'wine' is in PATH.")]
    WineNotFound,

    #[error("Bridge executable not found at: {0}")]
    BridgeExeNotFound(String),

    #[error("Bridge process not running")]
    NotRunning,

    #[error("Failed to send command to bridge: {0}")]
    SendFailed(String),

    #[error("Failed to read response from bridge: {0}")]
    ReadFailed(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Response id {got} does not match request id {expected}")]
    OutOfSequence { expected: u64, got: u64 },

    #[error("Excel reported: {message}")]
    Command { kind: FailureKind, message: String },

    #[error("Unexpected response data for {0}")]
    UnexpectedResponse(&'static str),
}

impl BridgeError {
    /// Translate into a session error, naming `subject` (a sheet, cell or name)
    /// when Excel says it does not exist or already exists.
    pub fn into_session_error(self, subject: &str) -> Error {
        match self {
            BridgeError::Command {
                kind: FailureKind::NotFound,
                ..
            } => Error::SheetNotFound(subject.to_string()),
            BridgeError::Command {
                kind: FailureKind::Duplicate,
                ..
            } => Error::DuplicateSheetName(subject.to_string()),
            BridgeError::Command {
                kind: FailureKind::InvalidArgument,
                message,
            } => Error::InvalidAddress(format!("{subject}: {message}")),
            other => Error::session(other.to_string()),
        }
    }
}

impl From<BridgeError> for Error {
    fn from(err: BridgeError) -> Self {
        Error::session(err.to_string())
    }
}

/// Running bridge process plus its stdio pipes.
///
/// Requests are strictly sequential: one line out, one line back.
pub struct ExcelBridge {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    next_id: u64,
}

impl ExcelBridge {
    /// Spawn `wine <exe>` with piped stdin/stdout. Bridge diagnostics go to our stderr.
    pub fn spawn(
        exe_path: &Path,
        wine_path: &Path,
        wine_prefix: Option<&Path>,
    ) -> Result<Self, BridgeError> {
        if !exe_path.exists() {
            return Err(BridgeError::BridgeExeNotFound(
                exe_path.display().to_string(),
            ));
        }

        let mut cmd = std::process::Command::new(wine_path);
        if let Some(prefix) = wine_prefix {
            cmd.env("WINEPREFIX", prefix);
        }
        cmd.arg(exe_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BridgeError::WineNotFound
            } else {
                BridgeError::SpawnFailed(e)
            }
        })?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                return Err(BridgeError::NotRunning);
            }
        };
        tracing::debug!(exe = %exe_path.display(), pid = child.id(), "bridge started");

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            next_id: 1,
        })
    }

    /// Send a command and wait for its response.
    pub fn send(&mut self, command: Command) -> Result<Option<ResponseData>, BridgeError> {
        let id = self.next_id;
        self.next_id += 1;

        let json = serde_json::to_string(&Request { id, command })?;
        tracing::trace!(%json, "-> bridge");
        writeln!(self.stdin, "{json}").map_err(|e| BridgeError::SendFailed(e.to_string()))?;
        self.stdin
            .flush()
            .map_err(|e| BridgeError::SendFailed(e.to_string()))?;

        let mut line = String::new();
        self.stdout
            .read_line(&mut line)
            .map_err(|e| BridgeError::ReadFailed(e.to_string()))?;
        if line.is_empty() {
            return Err(BridgeError::NotRunning);
        }
        tracing::trace!(json = line.trim_end(), "<- bridge");

        let response: Response = serde_json::from_str(&line)?;
        if response.id != id {
            return Err(BridgeError::OutOfSequence {
                expected: id,
                got: response.id,
            });
        }

        match response.result {
            ResponseResult::Ok { data } => Ok(data),
            ResponseResult::Error { kind, message } => {
                Err(BridgeError::Command { kind, message })
            }
        }
    }

    /// Ask the bridge to exit and reap the process.
    pub fn shutdown(mut self) -> Result<(), BridgeError> {
        let sent = self.send(Command::Shutdown);
        if sent.is_err() {
            let _ = self.child.kill();
        }
        let status = self.child.wait()?;
        tracing::debug!(%status, "bridge exited");
        sent.map(|_| ())
    }
}

/// Convert a Linux filesystem path to a WINE (Windows) path.
///
/// WINE maps `/` to `Z:\`, so `/home/user/file.xlsx` becomes `Z:\home\user\file.xlsx`.
pub fn linux_to_wine_path(linux_path: &Path) -> String {
    let abs = if linux_path.is_absolute() {
        linux_path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(linux_path)
    };

    format!("Z:{}", abs.display()).replace('/', "\\")
}

/// Look for the bridge exe next to the current binary, then in the cross-build
/// target directories, falling back to the bare file name.
pub(crate) fn find_bridge_exe() -> PathBuf {
    if let Ok(mut exe) = std::env::current_exe() {
        exe.pop();
        let candidate = exe.join(BRIDGE_EXE);
        if candidate.exists() {
            return candidate;
        }
    }

    ["release", "debug"]
        .iter()
        .map(|profile| {
            PathBuf::from(format!("target/x86_64-pc-windows-gnu/{profile}/{BRIDGE_EXE}"))
        })
        .find(|candidate| candidate.exists())
        .unwrap_or_else(|| PathBuf::from(BRIDGE_EXE))
}
