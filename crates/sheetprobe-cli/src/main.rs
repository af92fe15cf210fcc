//! sheetprobe CLI - inspect and edit a workbook open in Excel (or a CSV directory)

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use sheetprobe::{CellValue, Probe, WorkbookSession, WorkerConfig};
use sheetprobe_core::{CsvLoadOptions, MemorySession};
use sheetprobe_excel::{ExcelSession, ExcelSessionConfig};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sheetprobe")]
#[command(
    author,
    version,
    about = "Query a workbook open in a live spreadsheet application"
)]
struct Cli {
    #[command(flatten)]
    backend: Backend,

    /// Save the workbook after a command that changes it
    #[arg(long, global = true)]
    save: bool,

    /// More logging on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Where the workbook lives.
#[derive(Args, Debug, Clone)]
struct Backend {
    /// Serve a directory of CSV files, one sheet per file, instead of Excel
    #[arg(long, global = true)]
    csv_dir: Option<PathBuf>,

    /// Workbook to open in Excel (default: the active workbook)
    #[arg(short, long, env = "SHEETPROBE_WORKBOOK", global = true)]
    workbook: Option<PathBuf>,

    /// Path to sheetprobe-bridge.exe
    #[arg(long, env = "SHEETPROBE_BRIDGE_EXE", global = true)]
    bridge_exe: Option<PathBuf>,

    /// WINE executable
    #[arg(long, default_value = "wine", global = true)]
    wine: PathBuf,

    /// WINEPREFIX for the bridge
    #[arg(long, env = "WINEPREFIX", global = true)]
    wine_prefix: Option<PathBuf>,

    /// Launch a new Excel instead of attaching to a running one
    #[arg(long, global = true)]
    no_attach: bool,

    /// Show the Excel window
    #[arg(long, global = true)]
    visible: bool,
}

impl Backend {
    fn open(self) -> sheetprobe_core::Result<Box<dyn WorkbookSession>> {
        if let Some(dir) = self.csv_dir {
            let session = MemorySession::from_csv_dir(&dir, &CsvLoadOptions::default())?;
            return Ok(Box::new(session));
        }
        let session = ExcelSession::open(ExcelSessionConfig {
            bridge_exe_path: self.bridge_exe,
            wine_path: self.wine,
            wine_prefix: self.wine_prefix,
            workbook: self.workbook,
            attach: !self.no_attach,
            visible: self.visible,
        })?;
        Ok(Box::new(session))
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the workbooks open in the application
    Workbooks,

    /// Show every sheet with its used range and named ranges
    Structure,

    /// List sheet names in workbook order
    Sheets,

    /// Append a new, empty sheet
    AddSheet {
        /// Name of the new sheet
        name: String,
    },

    /// Delete a sheet
    RemoveSheet {
        /// Sheet to delete
        name: String,
    },

    /// Read a cell's value
    Read {
        /// Sheet name
        sheet: String,
        /// Cell in A1 form
        cell: String,
    },

    /// Show a cell's value, formula and displayed text
    Query {
        /// Sheet name
        sheet: String,
        /// Cell in A1 form
        cell: String,
    },

    /// Write a value to a cell (numbers and TRUE/FALSE are typed, the rest is text)
    Write {
        /// Sheet name
        sheet: String,
        /// Cell in A1 form
        cell: String,
        /// Value to store; an empty string clears the cell
        value: String,
    },

    /// List defined names with the range each refers to
    Names,

    /// Print a range as a markdown table
    #[command(alias = "show")]
    Table {
        /// Sheet name
        sheet: String,
        /// Range in A1 form (default: the used range)
        range: Option<String>,
    },

    /// Find cells whose content equals a value
    Find {
        /// Value to look for
        value: String,
        #[command(flatten)]
        scope: Scope,
    },

    /// Find text cells containing a substring
    FindPartial {
        /// Substring to look for
        substring: String,
        #[command(flatten)]
        scope: Scope,
    },

    /// Look up the value of a metric for a time period
    Metric {
        /// Sheet name
        sheet: String,
        /// Row label, e.g. "Net Income"
        metric: String,
        /// Column label, e.g. "2023"
        period: String,
    },

    /// Render a range to PNG
    Snapshot {
        /// Sheet name
        sheet: String,
        /// Range in A1 form (default: the used range)
        range: Option<String>,
        /// Write the PNG here instead of printing a data URL
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Save the workbook, in place or to a new path
    Save {
        /// Destination (default: where it was loaded from)
        path: Option<PathBuf>,
    },
}

/// Which sheets a search covers.
#[derive(Args, Debug)]
struct Scope {
    /// Search this sheet (default: the active sheet)
    #[arg(short, long, conflicts_with = "all")]
    sheet: Option<String>,

    /// Search every sheet in the workbook
    #[arg(short, long)]
    all: bool,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{json}");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let backend = cli.backend.clone();
    let probe = Probe::start(WorkerConfig::default(), move || backend.open())
        .context("Failed to open workbook session")?;

    let outcome = run(&probe, cli.command, cli.save).await;
    let closed = probe.shutdown().await.context("Failed to close workbook session");
    outcome?;
    closed
}

async fn run(probe: &Probe, command: Commands, save: bool) -> Result<()> {
    let changed = match command {
        Commands::Workbooks => {
            print_json(&probe.list_open_workbooks().await?)?;
            false
        }
        Commands::Structure => {
            print_json(&probe.structure().await?)?;
            false
        }
        Commands::Sheets => {
            print_json(&probe.list_sheets().await?)?;
            false
        }
        Commands::AddSheet { name } => {
            probe
                .add_sheet(&name)
                .await
                .with_context(|| format!("Failed to add sheet '{name}'"))?;
            true
        }
        Commands::RemoveSheet { name } => {
            probe
                .remove_sheet(&name)
                .await
                .with_context(|| format!("Failed to remove sheet '{name}'"))?;
            true
        }
        Commands::Read { sheet, cell } => {
            let value = probe
                .read_cell(&sheet, &cell)
                .await
                .with_context(|| format!("Failed to read {sheet}!{cell}"))?;
            print_json(&value)?;
            false
        }
        Commands::Query { sheet, cell } => {
            let query = probe
                .query_cell(&sheet, &cell)
                .await
                .with_context(|| format!("Failed to query {sheet}!{cell}"))?;
            print_json(&query)?;
            false
        }
        Commands::Write { sheet, cell, value } => {
            probe
                .write_cell(&sheet, &cell, CellValue::parse_input(&value))
                .await
                .with_context(|| format!("Failed to write {sheet}!{cell}"))?;
            true
        }
        Commands::Names => {
            print_json(&probe.list_named_ranges().await?)?;
            false
        }
        Commands::Table { sheet, range } => {
            let text = probe
                .render_range_text(&sheet, range.as_deref())
                .await
                .with_context(|| format!("Failed to read sheet '{sheet}'"))?;
            print!("{text}");
            false
        }
        Commands::Find { value, scope } => {
            let found = probe
                .find_all_occurrences(&value, scope.sheet.as_deref(), scope.all)
                .await?;
            print_json(&found)?;
            false
        }
        Commands::FindPartial { substring, scope } => {
            let found = probe
                .find_partial_occurrences(&substring, scope.sheet.as_deref(), scope.all)
                .await?;
            print_json(&found)?;
            false
        }
        Commands::Metric {
            sheet,
            metric,
            period,
        } => {
            print_json(&probe.find_metric_value(&sheet, &metric, &period).await?)?;
            false
        }
        Commands::Snapshot {
            sheet,
            range,
            output,
        } => {
            snapshot(probe, &sheet, range.as_deref(), output).await?;
            false
        }
        Commands::Save { path } => {
            probe.save(path).await.context("Failed to save workbook")?;
            false
        }
    };

    if changed && save {
        tracing::info!("saving changes");
        probe.save(None).await.context("Failed to save workbook")?;
    }
    Ok(())
}

async fn snapshot(
    probe: &Probe,
    sheet: &str,
    range: Option<&str>,
    output: Option<PathBuf>,
) -> Result<()> {
    match output {
        Some(path) => {
            if !probe.capture_snapshot_to(sheet, range, path.clone()).await? {
                bail!("Could not render {sheet} to {}", path.display());
            }
            eprintln!("Wrote {}", path.display());
        }
        None => match probe.capture_snapshot(sheet, range).await? {
            Some(snapshot) => println!("{}", snapshot.to_data_url()),
            None => bail!("Could not render {sheet}"),
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_backend_and_scope_flags() {
        let cli = Cli::try_parse_from([
            "sheetprobe",
            "find-partial",
            "Income",
            "--all",
            "--csv-dir",
            "/tmp/book",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.backend.csv_dir, Some(PathBuf::from("/tmp/book")));
        match cli.command {
            Commands::FindPartial { substring, scope } => {
                assert_eq!(substring, "Income");
                assert!(scope.all);
                assert_eq!(scope.sheet, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_sheet_and_all_conflict() {
        let err = Cli::try_parse_from(["sheetprobe", "find", "2023", "--sheet", "A", "--all"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
