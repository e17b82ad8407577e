use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Deserialize;

use crate::error::{LojaError, Result};
use crate::models::{same_name, Category, CategoryType, EntryStatus, LedgerEntry, PaymentMethod};
use crate::registry::resolve_member;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

fn category_from_row(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        category_type: row.get(2)?,
        parent_id: row.get(3)?,
    })
}

pub fn find_category(conn: &Connection, name: &str) -> Result<Category> {
    let mut stmt = conn.prepare("SELECT id, name, category_type, parent_id FROM categories ORDER BY id")?;
    let categories = stmt
        .query_map([], category_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    categories
        .into_iter()
        .find(|c| same_name(&c.name, name))
        .ok_or_else(|| LojaError::UnknownCategory(name.to_string()))
}

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.name, c.category_type, c.parent_id FROM categories c \
         LEFT JOIN categories p ON c.parent_id = p.id \
         ORDER BY c.category_type DESC, COALESCE(p.name, c.name), c.parent_id IS NOT NULL, c.name",
    )?;
    let rows = stmt
        .query_map([], category_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Add a category, optionally under a parent. The tree is at most two levels
/// deep and a child shares its parent's type.
pub fn add_category(
    conn: &Connection,
    name: &str,
    category_type: CategoryType,
    parent: Option<&str>,
) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LojaError::Validation("category name must not be empty".to_string()));
    }
    if find_category(conn, name).is_ok() {
        return Err(LojaError::Validation(format!("category '{name}' already exists")));
    }

    let parent_id = match parent {
        Some(p) => {
            let parent = find_category(conn, p)?;
            if parent.parent_id.is_some() {
                return Err(LojaError::Validation(format!(
                    "'{}' is already a subcategory; categories nest two levels deep",
                    parent.name
                )));
            }
            if parent.category_type != category_type {
                return Err(LojaError::Validation(format!(
                    "'{}' is an {} category",
                    parent.name, parent.category_type
                )));
            }
            Some(parent.id)
        }
        None => None,
    };

    conn.execute(
        "INSERT INTO categories (name, category_type, parent_id) VALUES (?1, ?2, ?3)",
        rusqlite::params![name, category_type, parent_id],
    )?;
    Ok(conn.last_insert_rowid())
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// A ledger entry as typed in or read from an import file.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEntry {
    pub description: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub paid_date: Option<NaiveDate>,
    pub category: String,
    pub payment_method: PaymentMethod,
    /// Id, CIM or name of the member the entry belongs to.
    #[serde(default)]
    pub member: Option<String>,
}

/// Ledger row joined with its category for listings.
#[derive(Debug, Clone)]
pub struct EntryRow {
    pub entry: LedgerEntry,
    pub category: String,
    pub category_type: CategoryType,
    pub member_name: Option<String>,
}

const ENTRY_SELECT: &str = "SELECT l.id, l.description, l.amount, l.due_date, l.paid_date, l.category_id, \
     l.payment_method, l.status, l.member_id, c.name, c.category_type, m.name \
     FROM ledger l JOIN categories c ON l.category_id = c.id \
     LEFT JOIN members m ON l.member_id = m.id";

fn entry_from_row(row: &Row) -> rusqlite::Result<EntryRow> {
    Ok(EntryRow {
        entry: LedgerEntry {
            id: row.get(0)?,
            description: row.get(1)?,
            amount: row.get(2)?,
            due_date: row.get(3)?,
            paid_date: row.get(4)?,
            category_id: row.get(5)?,
            payment_method: row.get(6)?,
            status: row.get(7)?,
            member_id: row.get(8)?,
        },
        category: row.get(9)?,
        category_type: row.get(10)?,
        member_name: row.get(11)?,
    })
}

/// Record an entry. Entries with a paid date start out paid.
pub fn add_entry(conn: &Connection, entry: &NewEntry) -> Result<i64> {
    if !entry.amount.is_finite() || entry.amount <= 0.0 {
        return Err(LojaError::Validation(format!(
            "amount must be positive, got {}",
            entry.amount
        )));
    }
    let description = entry.description.trim();
    if description.is_empty() {
        return Err(LojaError::Validation("description must not be empty".to_string()));
    }
    let category = find_category(conn, &entry.category)?;
    let member_id = match entry.member.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => Some(resolve_member(conn, key)?.id),
        _ => None,
    };
    let status = if entry.paid_date.is_some() {
        EntryStatus::Paid
    } else {
        EntryStatus::Pending
    };

    conn.execute(
        "INSERT INTO ledger (description, amount, due_date, paid_date, category_id, payment_method, status, member_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            description,
            entry.amount,
            entry.due_date,
            entry.paid_date,
            category.id,
            entry.payment_method,
            status,
            member_id,
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(id, amount = entry.amount, category = %category.name, %status, "ledger entry added");
    Ok(id)
}

pub fn get_entry(conn: &Connection, id: i64) -> Result<EntryRow> {
    let sql = format!("{ENTRY_SELECT} WHERE l.id = ?1");
    conn.query_row(&sql, [id], entry_from_row)
        .optional()?
        .ok_or_else(|| LojaError::Other(format!("No ledger entry with ID {id}")))
}

pub fn list_entries(
    conn: &Connection,
    status: Option<EntryStatus>,
    year: Option<i32>,
    month: Option<u32>,
) -> Result<Vec<EntryRow>> {
    let prefix = match (year, month) {
        (Some(y), Some(m)) => Some(format!("{y:04}-{m:02}")),
        (Some(y), None) => Some(format!("{y:04}")),
        _ => None,
    };
    let sql = format!(
        "{ENTRY_SELECT} \
         WHERE (?1 IS NULL OR l.status = ?1) \
         AND (?2 IS NULL OR COALESCE(l.paid_date, l.due_date) LIKE ?2 || '%') \
         ORDER BY COALESCE(l.paid_date, l.due_date), l.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params![status, prefix], entry_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn transition(conn: &Connection, id: i64, next: EntryStatus) -> Result<EntryRow> {
    let current = get_entry(conn, id)?;
    if !current.entry.status.can_become(next) {
        return Err(LojaError::InvalidTransition(format!(
            "entry {id} is {} and cannot become {next}",
            current.entry.status
        )));
    }
    Ok(current)
}

/// Mark a pending entry as paid on `paid_on`, optionally correcting the
/// payment method.
pub fn pay_entry(
    conn: &Connection,
    id: i64,
    paid_on: NaiveDate,
    method: Option<PaymentMethod>,
) -> Result<()> {
    let current = transition(conn, id, EntryStatus::Paid)?;
    let method = method.unwrap_or(current.entry.payment_method);
    conn.execute(
        "UPDATE ledger SET status = ?1, paid_date = ?2, payment_method = ?3 WHERE id = ?4",
        rusqlite::params![EntryStatus::Paid, paid_on, method, id],
    )?;
    tracing::info!(id, %paid_on, %method, "ledger entry paid");
    Ok(())
}

pub fn cancel_entry(conn: &Connection, id: i64) -> Result<()> {
    transition(conn, id, EntryStatus::Cancelled)?;
    conn.execute(
        "UPDATE ledger SET status = ?1 WHERE id = ?2",
        rusqlite::params![EntryStatus::Cancelled, id],
    )?;
    tracing::info!(id, "ledger entry cancelled");
    Ok(())
}
