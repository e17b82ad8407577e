use std::path::Path;

use colored::Colorize;

use crate::cli::open_db;
use crate::error::{LojaError, Result};
use crate::importer::{import_file, ImportKind};
use crate::settings::Settings;

pub fn run(settings: &Settings, kind: &str, file: &str) -> Result<()> {
    let kind: ImportKind = kind.parse()?;
    let path = Path::new(file);
    if !path.exists() {
        return Err(LojaError::Other(format!("File not found: {file}")));
    }

    let mut conn = open_db(settings)?;
    let result = import_file(&mut conn, kind, path)?;

    println!("Imported {} row(s) from {}", result.imported, path.display());
    if !result.skipped.is_empty() {
        eprintln!("{}", format!("Skipped {} row(s):", result.skipped.len()).yellow());
        for (line, reason) in &result.skipped {
            eprintln!("  line {line}: {reason}");
        }
    }
    Ok(())
}
