//! sheetprobe bridge: a Windows process that drives Excel over COM, controlled
//! by newline-delimited JSON on stdin/stdout.
//!
//! Cross-compile for `x86_64-pc-windows-gnu` and run under WINE. Stdout carries
//! protocol traffic only; logs go to stderr (filter with `RUST_LOG`).

#[cfg(windows)]
mod dispatch;
#[cfg(windows)]
mod excel;
#[cfg(windows)]
mod variant;

#[cfg(not(windows))]
fn main() {
    eprintln!("sheetprobe-bridge must be compiled for Windows (--target x86_64-pc-windows-gnu)");
    eprintln!("and run under WINE on Linux.");
    std::process::exit(1);
}

#[cfg(windows)]
fn main() {
    use std::io::{self, BufRead, Write};

    use sheetprobe_protocol::{Command, Request, Response, ResponseResult};

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let stdin = io::stdin();
    let mut out = io::stdout().lock();
    let mut excel: Option<excel::ExcelApp> = None;

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::error!("stdin read error: {e}");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (response, shutdown) = match serde_json::from_str::<Request>(line) {
            Ok(request) => {
                let shutdown = matches!(request.command, Command::Shutdown);
                let result = handle_command(&mut excel, request.command);
                (Response { id: request.id, result }, shutdown)
            }
            Err(e) => {
                tracing::warn!(%line, "unparseable request: {e}");
                let result = ResponseResult::Error {
                    kind: Default::default(),
                    message: format!("JSON parse error: {e}"),
                };
                (Response { id: 0, result }, false)
            }
        };

        match serde_json::to_string(&response) {
            Ok(json) => {
                let _ = writeln!(out, "{json}");
                let _ = out.flush();
            }
            Err(e) => tracing::error!("cannot encode response {}: {e}", response.id),
        }

        if shutdown {
            break;
        }
    }

    if let Some(app) = excel.take() {
        tracing::info!("stdin closed, releasing Excel");
        let _ = app.shutdown();
        uninit_com();
    }
}

#[cfg(windows)]
fn handle_command(
    excel: &mut Option<excel::ExcelApp>,
    command: sheetprobe_protocol::Command,
) -> sheetprobe_protocol::ResponseResult {
    use sheetprobe_protocol::{Command, ResponseData, ResponseResult};

    let outcome = match command {
        Command::Init { attach, visible } => init_com_and_excel(excel, attach, visible),
        Command::Shutdown => match excel.take() {
            Some(app) => {
                let done = app.shutdown();
                uninit_com();
                done.map(|()| ResponseResult::done())
            }
            None => Ok(ResponseResult::done()),
        },
        command => with_excel(excel, |app| {
            let data = match command {
                Command::OpenWorkbook { path } => {
                    let (workbook, opened) = app.open_workbook(&path)?;
                    ResponseData::WorkbookHandle { workbook, opened }
                }
                Command::ActiveWorkbook => {
                    let (workbook, opened) = app.active_workbook()?;
                    ResponseData::WorkbookHandle { workbook, opened }
                }
                Command::ListWorkbooks => ResponseData::Names {
                    names: app.list_workbooks()?,
                },
                Command::WorkbookName { workbook } => ResponseData::Name {
                    name: app.workbook_name(workbook)?,
                },
                Command::ListSheets { workbook } => ResponseData::Names {
                    names: app.list_sheets(workbook)?,
                },
                Command::ActiveSheet { workbook } => ResponseData::Name {
                    name: app.active_sheet(workbook)?,
                },
                Command::AddSheet { workbook, name } => {
                    app.add_sheet(workbook, &name)?;
                    return Ok(ResponseResult::done());
                }
                Command::RemoveSheet { workbook, name } => {
                    app.remove_sheet(workbook, &name)?;
                    return Ok(ResponseResult::done());
                }
                Command::SetCellValue {
                    workbook,
                    sheet,
                    cell,
                    value,
                } => {
                    app.set_cell_value(workbook, &sheet, &cell, &value)?;
                    return Ok(ResponseResult::done());
                }
                Command::GetCellValue {
                    workbook,
                    sheet,
                    cell,
                } => ResponseData::Value {
                    value: app.cell_value(workbook, &sheet, &cell)?,
                },
                Command::GetCellFormula {
                    workbook,
                    sheet,
                    cell,
                } => ResponseData::Formula {
                    formula: app.cell_formula(workbook, &sheet, &cell)?,
                },
                Command::GetCellText {
                    workbook,
                    sheet,
                    cell,
                } => ResponseData::Text {
                    text: app.cell_text(workbook, &sheet, &cell)?,
                },
                Command::GetUsedRange { workbook, sheet } => ResponseData::Range {
                    address: app.used_range(workbook, &sheet)?,
                },
                Command::GetRangeValues {
                    workbook,
                    sheet,
                    range,
                } => ResponseData::Values {
                    rows: app.range_values(workbook, &sheet, &range)?,
                },
                Command::ListNames { workbook } => ResponseData::DefinedNames {
                    defined: app.list_names(workbook)?,
                },
                Command::ExportRangePng {
                    workbook,
                    sheet,
                    range,
                    path,
                } => {
                    app.export_range_png(workbook, &sheet, &range, &path)?;
                    return Ok(ResponseResult::done());
                }
                Command::SaveWorkbook { workbook, path } => {
                    app.save_workbook(workbook, path.as_deref())?;
                    return Ok(ResponseResult::done());
                }
                Command::CloseWorkbook { workbook } => {
                    app.close_workbook(workbook)?;
                    return Ok(ResponseResult::done());
                }
                Command::Init { .. } | Command::Shutdown => {
                    return Err(excel::Failure::from("lifecycle command misrouted".to_string()));
                }
            };
            Ok(ResponseResult::ok(data))
        }),
    };

    outcome.unwrap_or_else(|failure| {
        tracing::warn!(kind = ?failure.kind, "{}", failure.message);
        ResponseResult::Error {
            kind: failure.kind,
            message: failure.message,
        }
    })
}

#[cfg(windows)]
fn init_com_and_excel(
    excel: &mut Option<excel::ExcelApp>,
    attach: bool,
    visible: bool,
) -> excel::Outcome<sheetprobe_protocol::ResponseResult> {
    use windows::Win32::System::Com::{CoInitializeEx, COINIT_APARTMENTTHREADED};

    if excel.is_some() {
        return Ok(sheetprobe_protocol::ResponseResult::done());
    }

    // Excel's objects live in a single-threaded apartment.
    unsafe {
        CoInitializeEx(None, COINIT_APARTMENTTHREADED)
            .ok()
            .map_err(|e| format!("CoInitializeEx failed: {e}"))?;
    }
    tracing::debug!("COM initialized (STA)");

    *excel = Some(excel::ExcelApp::connect(attach, visible)?);
    Ok(sheetprobe_protocol::ResponseResult::done())
}

#[cfg(windows)]
fn uninit_com() {
    unsafe {
        windows::Win32::System::Com::CoUninitialize();
    }
    tracing::debug!("COM uninitialized");
}

#[cfg(windows)]
fn with_excel(
    excel: &mut Option<excel::ExcelApp>,
    f: impl FnOnce(&mut excel::ExcelApp) -> excel::Outcome<sheetprobe_protocol::ResponseResult>,
) -> excel::Outcome<sheetprobe_protocol::ResponseResult> {
    match excel.as_mut() {
        Some(app) => f(app),
        None => Err(excel::Failure::from(
            "Excel not initialized. Send 'Init' first.".to_string(),
        )),
    }
}
