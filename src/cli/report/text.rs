use chrono::NaiveDate;
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::commemorative::{self, Occurrence};
use crate::error::Result;
use crate::fmt::{date, money, percent};
use crate::occurrence::{is_today, Window};
use crate::reports::{self, Period, RollupItem};
use crate::settings::Settings;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Prepend the lodge name as a header line if non-empty.
fn with_header(lodge_name: &str, body: String) -> String {
    if lodge_name.is_empty() {
        body
    } else {
        format!("{lodge_name}\n{body}")
    }
}

// ---------------------------------------------------------------------------
// Data-fetching + formatting wrappers (used by dispatch)
// ---------------------------------------------------------------------------

pub fn dates(settings: &Settings, window: Window, today: NaiveDate) -> Result<String> {
    let conn = open_db(settings)?;
    let data = commemorative::upcoming(&conn, today, window, settings.leap_day)?;
    Ok(with_header(&settings.lodge_name, format_dates(&data, window, today)))
}

pub fn finance(settings: &Settings, period: Period) -> Result<String> {
    let conn = open_db(settings)?;
    let data = reports::get_finance(&conn, period, &settings.finance)?;
    Ok(with_header(&settings.lodge_name, format_finance(&data)))
}

pub fn cashflow(settings: &Settings, year: i32) -> Result<String> {
    let conn = open_db(settings)?;
    let data = reports::get_cashflow(&conn, year, &settings.finance)?;
    Ok(with_header(&settings.lodge_name, format_cashflow(&data)))
}

pub fn overdue(settings: &Settings, as_of: NaiveDate) -> Result<String> {
    let conn = open_db(settings)?;
    let data = reports::get_overdue(&conn, as_of)?;
    Ok(with_header(&settings.lodge_name, format_overdue(&data, as_of)))
}

// ---------------------------------------------------------------------------
// Formatters
// ---------------------------------------------------------------------------

fn details(o: &Occurrence) -> String {
    let statement = o.statement();
    match (&o.note, statement.is_empty()) {
        (Some(note), true) => note.clone(),
        (Some(note), false) => format!("{statement}; {note}"),
        (None, _) => statement,
    }
}

pub fn format_dates(rows: &[Occurrence], window: Window, today: NaiveDate) -> String {
    let title = format!("Commemorative Dates ({})", window.label());
    if rows.is_empty() {
        return format!("{title}\nNothing to celebrate.");
    }

    let mut table = Table::new();
    table.set_header(vec!["Date", "Name", "Type", "Years", "Details"]);
    for o in rows {
        let day = if is_today(o.date, today) {
            date(o.date).green().bold().to_string()
        } else {
            date(o.date)
        };
        table.add_row(vec![
            Cell::new(day),
            Cell::new(&o.name),
            Cell::new(o.type_label()),
            Cell::new(o.years().map(|y| y.to_string()).unwrap_or_default()),
            Cell::new(details(o)),
        ]);
    }
    format!("{title}\n{table}")
}

fn add_items(table: &mut Table, items: &[RollupItem]) {
    for item in items {
        table.add_row(vec![
            Cell::new(format!("  {}", item.name)),
            Cell::new(item.count),
            Cell::new(money(item.total)),
            Cell::new(percent(item.pct)),
        ]);
    }
}

pub fn format_finance(data: &reports::FinanceReport) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Category", "Entries", "Amount", "%"]);

    table.add_row(vec![Cell::new("INCOME".green().bold()), Cell::new(""), Cell::new(""), Cell::new("")]);
    add_items(&mut table, &data.income.categories);
    table.add_row(vec![
        Cell::new("Total Income".bold()),
        Cell::new(""),
        Cell::new(money(data.income.total)),
        Cell::new(""),
    ]);
    table.add_row(vec![Cell::new(""), Cell::new(""), Cell::new(""), Cell::new("")]);

    table.add_row(vec![Cell::new("EXPENSES".red().bold()), Cell::new(""), Cell::new(""), Cell::new("")]);
    add_items(&mut table, &data.expenses.categories);
    table.add_row(vec![
        Cell::new("Total Expenses".bold()),
        Cell::new(""),
        Cell::new(money(data.expenses.total)),
        Cell::new(""),
    ]);
    table.add_row(vec![Cell::new(""), Cell::new(""), Cell::new(""), Cell::new("")]);

    let balance_label = if data.balance >= 0.0 {
        "BALANCE".green().bold()
    } else {
        "BALANCE".red().bold()
    };
    table.add_row(vec![
        Cell::new(balance_label),
        Cell::new(""),
        Cell::new(money(data.balance)),
        Cell::new(""),
    ]);

    let mut out = format!("Financial Report {}\n{table}", data.period);

    if data.expenses.parents.len() < data.expenses.categories.len() {
        let mut groups = Table::new();
        groups.set_header(vec!["Expense group", "Entries", "Amount", "%"]);
        add_items(&mut groups, &data.expenses.parents);
        out.push_str(&format!("\n\n{groups}"));
    }
    if data.excluded > 0 {
        out.push_str(&format!(
            "\n\n{} paid entr{} left out of the totals (collection box, compensation, member-paid expenses)",
            data.excluded,
            if data.excluded == 1 { "y" } else { "ies" }
        ));
    }
    out
}

pub fn format_cashflow(data: &reports::CashflowReport) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Month", "Inflows", "Outflows", "Net", "Running"]);
    for m in &data.months {
        let net_str = if m.net >= 0.0 {
            money(m.net).green().to_string()
        } else {
            money(m.net).red().to_string()
        };
        let label = MONTHS
            .get(m.month as usize - 1)
            .copied()
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(label),
            Cell::new(money(m.inflows)),
            Cell::new(money(m.outflows)),
            Cell::new(net_str),
            Cell::new(money(m.running_balance)),
        ]);
    }
    format!("Cash Flow {}\n{table}", data.year)
}

pub fn format_overdue(data: &reports::OverdueReport, as_of: NaiveDate) -> String {
    let title = format!("Overdue Dues as of {}", date(as_of));
    if data.entries.is_empty() {
        return format!("{title}\nNo overdue entries.");
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Due", "Days", "Member", "Description", "Category", "Amount"]);
    for e in &data.entries {
        table.add_row(vec![
            Cell::new(e.id),
            Cell::new(date(e.due_date)),
            Cell::new(e.days_late),
            Cell::new(e.member_name.clone().unwrap_or_default()),
            Cell::new(&e.description),
            Cell::new(&e.category),
            Cell::new(money(e.amount)),
        ]);
    }

    let mut members = Table::new();
    members.set_header(vec!["Member", "Owed"]);
    for (name, owed) in &data.by_member {
        let name = if name.is_empty() { "(no member)" } else { name.as_str() };
        members.add_row(vec![Cell::new(name), Cell::new(money(*owed))]);
    }

    format!(
        "{title}\n{table}\n\n{members}\n{} {}",
        "Total overdue:".bold(),
        money(data.total)
    )
}
