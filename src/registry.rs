use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::{LojaError, Result};
use crate::models::{same_name, CustomEvent, Degree, FamilyMember, Member, MemberStatus, NewMember, Relationship};
use crate::occurrence::MonthDay;

const MEMBER_COLUMNS: &str =
    "id, name, cim, birth_date, status, role, initiated_on, elevated_on, exalted_on, married_on";

fn member_from_row(row: &Row) -> rusqlite::Result<Member> {
    Ok(Member {
        id: row.get(0)?,
        name: row.get(1)?,
        cim: row.get(2)?,
        birth_date: row.get(3)?,
        status: row.get(4)?,
        role: row.get(5)?,
        initiated_on: row.get(6)?,
        elevated_on: row.get(7)?,
        exalted_on: row.get(8)?,
        married_on: row.get(9)?,
    })
}

fn family_from_row(row: &Row) -> rusqlite::Result<FamilyMember> {
    Ok(FamilyMember {
        id: row.get(0)?,
        member_id: row.get(1)?,
        name: row.get(2)?,
        relationship: row.get(3)?,
        birth_date: row.get(4)?,
        // NULL means the flag was never set.
        deceased: row.get::<_, Option<bool>>(5)?.unwrap_or(false),
    })
}

fn required_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LojaError::Validation("name must not be empty".to_string()));
    }
    Ok(trimmed)
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

pub fn add_member(conn: &Connection, member: &NewMember) -> Result<i64> {
    let name = required_name(&member.name)?;
    conn.execute(
        "INSERT INTO members (name, cim, birth_date, role, initiated_on, married_on) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            name,
            member.cim.as_deref().map(str::trim),
            member.birth_date,
            member.role,
            member.initiated_on,
            member.married_on,
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(id, name, "member added");
    Ok(id)
}

pub fn get_member(conn: &Connection, id: i64) -> Result<Member> {
    let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE id = ?1");
    conn.query_row(&sql, [id], member_from_row)
        .optional()?
        .ok_or_else(|| LojaError::UnknownMember(id.to_string()))
}

/// Look a member up by id, CIM or (case-insensitive) name, in that order.
pub fn resolve_member(conn: &Connection, key: &str) -> Result<Member> {
    let key = key.trim();
    if let Ok(id) = key.parse::<i64>() {
        if let Ok(member) = get_member(conn, id) {
            return Ok(member);
        }
    }
    let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE cim = ?1 ORDER BY id LIMIT 1");
    if let Some(member) = conn.query_row(&sql, [key], member_from_row).optional()? {
        return Ok(member);
    }
    list_members(conn, true)?
        .into_iter()
        .filter(|m| same_name(&m.name, key))
        .min_by_key(|m| m.id)
        .ok_or_else(|| LojaError::UnknownMember(key.to_string()))
}

pub fn list_members(conn: &Connection, include_deceased: bool) -> Result<Vec<Member>> {
    let filter = if include_deceased { "" } else { "WHERE status = 'active'" };
    let sql = format!("SELECT {MEMBER_COLUMNS} FROM members {filter} ORDER BY name");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], member_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn mark_deceased(conn: &Connection, id: i64) -> Result<()> {
    let member = get_member(conn, id)?;
    if member.status == MemberStatus::Deceased {
        return Err(LojaError::InvalidTransition(format!(
            "{} is already recorded as deceased",
            member.name
        )));
    }
    conn.execute(
        "UPDATE members SET status = ?1 WHERE id = ?2",
        rusqlite::params![MemberStatus::Deceased, id],
    )?;
    tracing::info!(id, "member marked deceased");
    Ok(())
}

// ---------------------------------------------------------------------------
// Degrees
// ---------------------------------------------------------------------------

/// Member column mirroring one of the three symbolic degrees.
fn symbolic_degree_column(degree: &str) -> Option<&'static str> {
    match degree.trim().to_lowercase().as_str() {
        "1" | "apprentice" | "aprendiz" => Some("initiated_on"),
        "2" | "fellow" | "companheiro" => Some("elevated_on"),
        "3" | "master" | "mestre" => Some("exalted_on"),
        _ => None,
    }
}

/// Record a conferred degree. Symbolic degrees also update the member's
/// matching date in the same transaction.
pub fn record_degree(conn: &mut Connection, member_id: i64, degree: &str, conferred_on: NaiveDate) -> Result<i64> {
    let degree = degree.trim();
    if degree.is_empty() {
        return Err(LojaError::Validation("degree must not be empty".to_string()));
    }
    get_member(conn, member_id)?;

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO degrees (member_id, degree, conferred_on) VALUES (?1, ?2, ?3)",
        rusqlite::params![member_id, degree, conferred_on],
    )?;
    let id = tx.last_insert_rowid();
    if let Some(column) = symbolic_degree_column(degree) {
        tx.execute(
            &format!("UPDATE members SET {column} = ?1 WHERE id = ?2"),
            rusqlite::params![conferred_on, member_id],
        )?;
    }
    tx.commit()?;
    tracing::info!(member_id, degree, %conferred_on, "degree recorded");
    Ok(id)
}

pub fn list_degrees(conn: &Connection, member_id: i64) -> Result<Vec<Degree>> {
    let mut stmt = conn.prepare(
        "SELECT id, member_id, degree, conferred_on FROM degrees \
         WHERE member_id = ?1 ORDER BY conferred_on, id",
    )?;
    let rows = stmt
        .query_map([member_id], |row| {
            Ok(Degree {
                id: row.get(0)?,
                member_id: row.get(1)?,
                degree: row.get(2)?,
                conferred_on: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Family
// ---------------------------------------------------------------------------

pub fn add_family(
    conn: &Connection,
    member_id: i64,
    name: &str,
    relationship: Relationship,
    birth_date: Option<NaiveDate>,
) -> Result<i64> {
    let name = required_name(name)?;
    get_member(conn, member_id)?;
    conn.execute(
        "INSERT INTO family (member_id, name, relationship, birth_date) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![member_id, name, relationship, birth_date],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(id, member_id, %relationship, "family member added");
    Ok(id)
}

pub fn list_family(conn: &Connection, member_id: Option<i64>) -> Result<Vec<FamilyMember>> {
    let mut stmt = conn.prepare(
        "SELECT id, member_id, name, relationship, birth_date, deceased FROM family \
         WHERE ?1 IS NULL OR member_id = ?1 ORDER BY member_id, id",
    )?;
    let rows = stmt
        .query_map([member_id], family_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn mark_family_deceased(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("UPDATE family SET deceased = 1 WHERE id = ?1", [id])?;
    if changed == 0 {
        return Err(LojaError::Other(format!("No family member with ID {id}")));
    }
    tracing::info!(id, "family member marked deceased");
    Ok(())
}

// ---------------------------------------------------------------------------
// Custom events
// ---------------------------------------------------------------------------

pub fn add_event(
    conn: &Connection,
    name: &str,
    event_type: &str,
    day: MonthDay,
    description: Option<&str>,
) -> Result<i64> {
    let name = required_name(name)?;
    conn.execute(
        "INSERT INTO events (name, event_type, day, month, description) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![name, event_type.trim(), day.day(), day.month(), description],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_events(conn: &Connection) -> Result<Vec<CustomEvent>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, event_type, day, month, description FROM events ORDER BY month, day, name",
    )?;
    let raw: Vec<(i64, String, String, u32, u32, Option<String>)> = stmt
        .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    raw.into_iter()
        .map(|(id, name, event_type, day, month, description)| {
            Ok(CustomEvent {
                id,
                name,
                event_type,
                day: MonthDay::new(month, day)?,
                description,
            })
        })
        .collect()
}

pub fn delete_event(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("DELETE FROM events WHERE id = ?1", [id])?;
    if changed == 0 {
        return Err(LojaError::Other(format!("No event with ID {id}")));
    }
    Ok(())
}
