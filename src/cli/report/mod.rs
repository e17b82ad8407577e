pub mod text;

use std::path::PathBuf;

use chrono::Datelike;

use crate::cli::{today, ReportCommands};
use crate::error::Result;
use crate::reports::Period;
use crate::settings::Settings;

/// Print a report, or write it as plain text when `--output` is given.
pub fn dispatch(settings: &Settings, cmd: ReportCommands) -> Result<()> {
    match &cmd.output_args().output {
        Some(path) => {
            // Files get no ANSI colour codes.
            colored::control::set_override(false);
            let s = dispatch_text(settings, &cmd)?;
            write_text(&s, path)
        }
        None => {
            let s = dispatch_text(settings, &cmd)?;
            println!("{s}");
            Ok(())
        }
    }
}

pub(crate) fn dispatch_text(settings: &Settings, cmd: &ReportCommands) -> Result<String> {
    match cmd {
        ReportCommands::Dates { window, date, .. } => {
            text::dates(settings, *window, date.unwrap_or_else(today))
        }
        ReportCommands::Finance { month, year, .. } => {
            let period = match month {
                Some((y, m)) => Period::new(*y, Some(*m))?,
                None => Period::new(year.unwrap_or_else(|| today().year()), None)?,
            };
            text::finance(settings, period)
        }
        ReportCommands::Cashflow { year, .. } => {
            text::cashflow(settings, year.unwrap_or_else(|| today().year()))
        }
        ReportCommands::Overdue { date, .. } => text::overdue(settings, date.unwrap_or_else(today)),
    }
}

fn write_text(s: &str, path: &str) -> Result<()> {
    let p = PathBuf::from(path);
    if let Some(parent) = p.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&p, s)?;
    println!("Wrote {}", p.display());
    Ok(())
}
