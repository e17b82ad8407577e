use chrono::NaiveDate;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::opt_date;
use crate::models::{MemberStatus, NewMember};
use crate::registry;
use crate::settings::Settings;

pub fn add(settings: &Settings, member: &NewMember) -> Result<()> {
    let conn = open_db(settings)?;
    let id = registry::add_member(&conn, member)?;
    println!("Added member {id}: {}", member.name.trim());
    Ok(())
}

pub fn list(settings: &Settings, include_deceased: bool) -> Result<()> {
    let conn = open_db(settings)?;
    let members = registry::list_members(&conn, include_deceased)?;

    let mut table = Table::new();
    let mut header = vec!["ID", "Name", "CIM", "Birth", "Role", "Initiated"];
    if include_deceased {
        header.push("Status");
    }
    table.set_header(header);
    for m in members {
        let mut row = vec![
            Cell::new(m.id),
            Cell::new(&m.name),
            Cell::new(m.cim.clone().unwrap_or_default()),
            Cell::new(opt_date(m.birth_date)),
            Cell::new(m.role.clone().unwrap_or_default()),
            Cell::new(opt_date(m.initiated_on)),
        ];
        if include_deceased {
            row.push(Cell::new(m.status));
        }
        table.add_row(row);
    }
    println!("Members\n{table}");
    Ok(())
}

pub fn show(settings: &Settings, key: &str) -> Result<()> {
    let conn = open_db(settings)?;
    let m = registry::resolve_member(&conn, key)?;

    println!("{} (#{})", m.name, m.id);
    if m.status == MemberStatus::Deceased {
        println!("Status:      deceased");
    }
    println!("CIM:         {}", m.cim.as_deref().unwrap_or("-"));
    println!("Role:        {}", m.role.as_deref().unwrap_or("-"));
    println!("Birth:       {}", opt_date(m.birth_date));
    println!("Initiated:   {}", opt_date(m.initiated_on));
    println!("Elevated:    {}", opt_date(m.elevated_on));
    println!("Exalted:     {}", opt_date(m.exalted_on));
    println!("Married:     {}", opt_date(m.married_on));

    let family = registry::list_family(&conn, Some(m.id))?;
    if !family.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["ID", "Name", "Relationship", "Birth", ""]);
        for f in family {
            table.add_row(vec![
                Cell::new(f.id),
                Cell::new(f.name),
                Cell::new(f.relationship),
                Cell::new(opt_date(f.birth_date)),
                Cell::new(if f.deceased { "deceased" } else { "" }),
            ]);
        }
        println!("\nFamily\n{table}");
    }

    let degrees = registry::list_degrees(&conn, m.id)?;
    if !degrees.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Degree", "Conferred"]);
        for d in degrees {
            table.add_row(vec![Cell::new(d.degree), Cell::new(crate::fmt::date(d.conferred_on))]);
        }
        println!("\nDegrees\n{table}");
    }
    Ok(())
}

pub fn deceased(settings: &Settings, key: &str) -> Result<()> {
    let conn = open_db(settings)?;
    let m = registry::resolve_member(&conn, key)?;
    registry::mark_deceased(&conn, m.id)?;
    println!("Recorded {} as deceased", m.name);
    Ok(())
}

pub fn degree(settings: &Settings, key: &str, degree: &str, date: NaiveDate) -> Result<()> {
    let mut conn = open_db(settings)?;
    let m = registry::resolve_member(&conn, key)?;
    registry::record_degree(&mut conn, m.id, degree, date)?;
    println!("Recorded degree '{}' for {} on {}", degree.trim(), m.name, crate::fmt::date(date));
    Ok(())
}
