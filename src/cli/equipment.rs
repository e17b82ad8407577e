use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::loans;
use crate::models::EquipmentStatus;
use crate::settings::Settings;

pub fn add(settings: &Settings, name: &str, description: Option<&str>) -> Result<()> {
    let conn = open_db(settings)?;
    let id = loans::add_equipment(&conn, name, description)?;
    println!("Added equipment {id}: {}", name.trim());
    Ok(())
}

pub fn list(settings: &Settings, status: Option<EquipmentStatus>) -> Result<()> {
    let conn = open_db(settings)?;
    let items = loans::list_equipment(&conn, status)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Description", "Status"]);
    for e in items {
        table.add_row(vec![
            Cell::new(e.id),
            Cell::new(e.name),
            Cell::new(e.description.unwrap_or_default()),
            Cell::new(e.status),
        ]);
    }
    println!("Equipment\n{table}");
    Ok(())
}

pub fn dispose(settings: &Settings, id: i64) -> Result<()> {
    let conn = open_db(settings)?;
    loans::dispose_equipment(&conn, id)?;
    println!("Equipment {id} disposed");
    Ok(())
}
