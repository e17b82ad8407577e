use std::collections::HashMap;

use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::ledger;
use crate::models::CategoryType;
use crate::settings::Settings;

pub fn add(settings: &Settings, name: &str, category_type: CategoryType, parent: Option<&str>) -> Result<()> {
    let conn = open_db(settings)?;
    ledger::add_category(&conn, name, category_type, parent)?;
    match parent {
        Some(p) => println!("Added category: {} (under {p})", name.trim()),
        None => println!("Added category: {}", name.trim()),
    }
    Ok(())
}

pub fn list(settings: &Settings) -> Result<()> {
    let conn = open_db(settings)?;
    let categories = ledger::list_categories(&conn)?;
    let names: HashMap<i64, String> = categories.iter().map(|c| (c.id, c.name.clone())).collect();

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Type", "Parent"]);
    for cat in &categories {
        let name = if cat.parent_id.is_some() {
            format!("  {}", cat.name)
        } else {
            cat.name.clone()
        };
        table.add_row(vec![
            Cell::new(cat.id),
            Cell::new(name),
            Cell::new(cat.category_type),
            Cell::new(cat.parent_id.and_then(|p| names.get(&p).cloned()).unwrap_or_default()),
        ]);
    }
    println!("Categories\n{table}");
    Ok(())
}
