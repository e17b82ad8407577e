use std::collections::HashMap;

use chrono::NaiveDate;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::opt_date;
use crate::models::Relationship;
use crate::registry;
use crate::settings::Settings;

pub fn add(
    settings: &Settings,
    member: &str,
    name: &str,
    relationship: Relationship,
    birth: Option<NaiveDate>,
) -> Result<()> {
    let conn = open_db(settings)?;
    let owner = registry::resolve_member(&conn, member)?;
    let id = registry::add_family(&conn, owner.id, name, relationship, birth)?;
    println!("Added {} ({}) to {} as #{id}", name.trim(), relationship, owner.name);
    Ok(())
}

pub fn list(settings: &Settings, member: Option<&str>) -> Result<()> {
    let conn = open_db(settings)?;
    let member_id = match member {
        Some(key) => Some(registry::resolve_member(&conn, key)?.id),
        None => None,
    };
    let owners: HashMap<i64, String> = registry::list_members(&conn, true)?
        .into_iter()
        .map(|m| (m.id, m.name))
        .collect();
    let family = registry::list_family(&conn, member_id)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Relationship", "Member", "Birth", ""]);
    for f in family {
        table.add_row(vec![
            Cell::new(f.id),
            Cell::new(&f.name),
            Cell::new(f.relationship),
            Cell::new(owners.get(&f.member_id).cloned().unwrap_or_default()),
            Cell::new(opt_date(f.birth_date)),
            Cell::new(if f.deceased { "deceased" } else { "" }),
        ]);
    }
    println!("Family\n{table}");
    Ok(())
}

pub fn deceased(settings: &Settings, id: i64) -> Result<()> {
    let conn = open_db(settings)?;
    registry::mark_family_deceased(&conn, id)?;
    println!("Recorded family member {id} as deceased");
    Ok(())
}
