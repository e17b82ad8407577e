use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::occurrence::MonthDay;
use crate::registry;
use crate::settings::Settings;

pub fn add(
    settings: &Settings,
    name: &str,
    (month, day): (u32, u32),
    event_type: &str,
    description: Option<&str>,
) -> Result<()> {
    let md = MonthDay::new(month, day)?;
    let conn = open_db(settings)?;
    let id = registry::add_event(&conn, name, event_type, md, description)?;
    println!("Added event {id}: {} on {md}", name.trim());
    Ok(())
}

pub fn list(settings: &Settings) -> Result<()> {
    let conn = open_db(settings)?;
    let events = registry::list_events(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Day", "Name", "Type", "Description"]);
    for e in events {
        table.add_row(vec![
            Cell::new(e.id),
            Cell::new(e.day),
            Cell::new(e.name),
            Cell::new(e.event_type),
            Cell::new(e.description.unwrap_or_default()),
        ]);
    }
    println!("Events\n{table}");
    Ok(())
}

pub fn delete(settings: &Settings, id: i64) -> Result<()> {
    let conn = open_db(settings)?;
    registry::delete_event(&conn, id)?;
    println!("Deleted event {id}");
    Ok(())
}
