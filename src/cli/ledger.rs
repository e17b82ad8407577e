use chrono::NaiveDate;
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::{date, money, opt_date};
use crate::ledger::{self, NewEntry};
use crate::models::{CategoryType, EntryStatus, PaymentMethod};
use crate::settings::Settings;

pub fn add(settings: &Settings, entry: &NewEntry) -> Result<()> {
    let conn = open_db(settings)?;
    let id = ledger::add_entry(&conn, entry)?;
    let row = ledger::get_entry(&conn, id)?;
    println!(
        "Added {} entry {id}: {} {} ({} on {})",
        row.category_type,
        row.entry.description,
        money(row.entry.amount),
        row.entry.status,
        date(row.entry.effective_date())
    );
    Ok(())
}

pub fn list(
    settings: &Settings,
    status: Option<EntryStatus>,
    month: Option<(i32, u32)>,
    year: Option<i32>,
) -> Result<()> {
    let conn = open_db(settings)?;
    let (year, month) = match month {
        Some((y, m)) => (Some(y), Some(m)),
        None => (year, None),
    };
    let rows = ledger::list_entries(&conn, status, year, month)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Due", "Paid", "Description", "Category", "Member", "Method", "Status", "Amount"]);
    for r in rows {
        let amount = match r.category_type {
            CategoryType::Income => money(r.entry.amount).green().to_string(),
            CategoryType::Expense => money(-r.entry.amount).red().to_string(),
        };
        table.add_row(vec![
            Cell::new(r.entry.id),
            Cell::new(date(r.entry.due_date)),
            Cell::new(opt_date(r.entry.paid_date)),
            Cell::new(r.entry.description),
            Cell::new(r.category),
            Cell::new(r.member_name.unwrap_or_default()),
            Cell::new(r.entry.payment_method),
            Cell::new(r.entry.status),
            Cell::new(amount),
        ]);
    }
    println!("Ledger\n{table}");
    Ok(())
}

pub fn pay(settings: &Settings, id: i64, paid_on: NaiveDate, method: Option<PaymentMethod>) -> Result<()> {
    let conn = open_db(settings)?;
    ledger::pay_entry(&conn, id, paid_on, method)?;
    println!("Entry {id} paid on {}", date(paid_on));
    Ok(())
}

pub fn cancel(settings: &Settings, id: i64) -> Result<()> {
    let conn = open_db(settings)?;
    ledger::cancel_entry(&conn, id)?;
    println!("Entry {id} cancelled");
    Ok(())
}
