use std::collections::HashMap;

use chrono::NaiveDate;
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::{date, opt_date};
use crate::loans::{self, NewLoan};
use crate::models::LoanStatus;
use crate::settings::Settings;

pub fn create(settings: &Settings, loan: &NewLoan) -> Result<()> {
    let mut conn = open_db(settings)?;
    let id = loans::create_loan(&mut conn, loan)?;
    let created = loans::get_loan(&conn, id)?;
    println!(
        "Created loan {id} to {} with {} item(s)",
        created.beneficiary,
        created.equipment_ids.len()
    );
    Ok(())
}

pub fn return_loan(settings: &Settings, id: i64, returned_on: NaiveDate) -> Result<()> {
    let mut conn = open_db(settings)?;
    loans::return_loan(&mut conn, id, returned_on)?;
    println!("Loan {id} returned on {}", date(returned_on));
    Ok(())
}

pub fn list(settings: &Settings, status: Option<LoanStatus>, today: NaiveDate) -> Result<()> {
    let conn = open_db(settings)?;
    let names: HashMap<i64, String> = loans::list_equipment(&conn, None)?
        .into_iter()
        .map(|e| (e.id, e.name))
        .collect();
    let loans = loans::list_loans(&conn, status)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Beneficiary", "Contact", "Start", "Expected", "Returned", "Items", "Status"]);
    for l in loans {
        let items = l
            .equipment_ids
            .iter()
            .map(|id| names.get(id).cloned().unwrap_or_else(|| format!("#{id}")))
            .collect::<Vec<_>>()
            .join(", ");
        let late = l.status == LoanStatus::Active && l.expected_return.is_some_and(|d| d < today);
        let status = if late {
            "late".red().to_string()
        } else {
            l.status.to_string()
        };
        table.add_row(vec![
            Cell::new(l.id),
            Cell::new(l.beneficiary),
            Cell::new(l.contact.unwrap_or_default()),
            Cell::new(date(l.start_date)),
            Cell::new(opt_date(l.expected_return)),
            Cell::new(opt_date(l.returned_on)),
            Cell::new(items),
            Cell::new(status),
        ]);
    }
    println!("Loans\n{table}");
    Ok(())
}
