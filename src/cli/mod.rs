pub mod backup;
pub mod categories;
pub mod equipment;
pub mod events;
pub mod family;
pub mod import;
pub mod init;
pub mod ledger;
pub mod loans;
pub mod members;
pub mod report;
pub mod status;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;

use crate::db::get_connection;
use crate::error::{LojaError, Result};
use crate::models::{CategoryType, EntryStatus, EquipmentStatus, LoanStatus, PaymentMethod, Relationship};
use crate::occurrence::Window;
use crate::settings::Settings;

/// Open the configured database, refusing to create one implicitly.
pub(crate) fn open_db(settings: &Settings) -> Result<Connection> {
    let path = settings.db_path();
    if !path.exists() {
        return Err(LojaError::Settings(format!(
            "No database found at {}\nRun `loja init` first.",
            path.display()
        )));
    }
    get_connection(&path)
}

pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Accepts `YYYY-MM-DD` or `DD/MM/YYYY`.
pub(crate) fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .map_err(|_| format!("invalid date '{s}' (use YYYY-MM-DD or DD/MM/YYYY)"))
}

/// `YYYY-MM` → (year, month).
pub(crate) fn parse_month(s: &str) -> std::result::Result<(i32, u32), String> {
    let err = || format!("invalid month '{s}' (use YYYY-MM)");
    let (y, m) = s.trim().split_once('-').ok_or_else(err)?;
    let year = y.parse().map_err(|_| err())?;
    let month: u32 = m.parse().map_err(|_| err())?;
    if !(1..=12).contains(&month) {
        return Err(err());
    }
    Ok((year, month))
}

/// `DD/MM` or `MM-DD` → (month, day).
pub(crate) fn parse_day_month(s: &str) -> std::result::Result<(u32, u32), String> {
    let err = || format!("invalid day '{s}' (use DD/MM)");
    let s = s.trim();
    let (month, day) = if let Some((d, m)) = s.split_once('/') {
        (m, d)
    } else {
        s.split_once('-').ok_or_else(err)?
    };
    Ok((month.parse().map_err(|_| err())?, day.parse().map_err(|_| err())?))
}

#[derive(Parser)]
#[command(name = "loja", about = "Lodge administration: members, families, ledger, loans and commemorative dates.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for lodge data (default: ~/Documents/loja)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Lodge name printed on report headers
        #[arg(long = "lodge-name")]
        lodge_name: Option<String>,
    },
    /// Show the current database and record counts.
    Status,
    /// Back up the database.
    Backup {
        /// Output path (default: <data_dir>/backups/loja-YYYYMMDD-HHMMSS.db)
        #[arg(long)]
        output: Option<String>,
    },
    /// Member registry.
    Members {
        #[command(subcommand)]
        command: MembersCommands,
    },
    /// Wives, children and parents of members.
    Family {
        #[command(subcommand)]
        command: FamilyCommands,
    },
    /// Lodge dates that recur every year.
    Events {
        #[command(subcommand)]
        command: EventsCommands,
    },
    /// Income and expense categories.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Credits and debits.
    Ledger {
        #[command(subcommand)]
        command: LedgerCommands,
    },
    /// Equipment available for comodato.
    Equipment {
        #[command(subcommand)]
        command: EquipmentCommands,
    },
    /// Comodato (equipment loan) agreements.
    Loans {
        #[command(subcommand)]
        command: LoansCommands,
    },
    /// Import members, family or ledger rows from a CSV file.
    Import {
        /// members, family or ledger
        kind: String,
        /// Path to the CSV file
        file: String,
    },
    /// Generate reports.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
}

#[derive(Subcommand)]
pub enum MembersCommands {
    /// Register a member.
    Add {
        name: String,
        /// Member identification number
        #[arg(long)]
        cim: Option<String>,
        #[arg(long, value_parser = parse_date)]
        birth: Option<NaiveDate>,
        /// Role title, e.g. 'Secretário'
        #[arg(long)]
        role: Option<String>,
        /// Initiation date
        #[arg(long, value_parser = parse_date)]
        initiated: Option<NaiveDate>,
        /// Wedding date
        #[arg(long, value_parser = parse_date)]
        married: Option<NaiveDate>,
    },
    /// List members.
    List {
        /// Include deceased members
        #[arg(long)]
        all: bool,
    },
    /// Show a member with family and degree history.
    Show {
        /// Member id, CIM or name
        member: String,
    },
    /// Record a member's death.
    Deceased {
        /// Member id, CIM or name
        member: String,
    },
    /// Record a conferred degree.
    Degree {
        /// Member id, CIM or name
        member: String,
        /// apprentice, fellow, master, or any higher degree name
        degree: String,
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
    },
}

#[derive(Subcommand)]
pub enum FamilyCommands {
    /// Add a relative to a member.
    Add {
        /// Member id, CIM or name
        member: String,
        name: String,
        /// wife, son, daughter, father, mother
        #[arg(long)]
        relationship: Relationship,
        #[arg(long, value_parser = parse_date)]
        birth: Option<NaiveDate>,
    },
    /// List relatives.
    List {
        /// Only relatives of this member
        #[arg(long)]
        member: Option<String>,
    },
    /// Record a relative's death.
    Deceased { id: i64 },
}

#[derive(Subcommand)]
pub enum EventsCommands {
    /// Add a yearly event.
    Add {
        name: String,
        /// Day of the year: DD/MM
        #[arg(long, value_parser = parse_day_month)]
        day: (u32, u32),
        /// Event type, e.g. 'fundação'
        #[arg(long = "type", default_value = "evento")]
        event_type: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List events.
    List,
    /// Delete an event.
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// Add a category.
    Add {
        name: String,
        /// income or expense
        #[arg(long = "type")]
        category_type: CategoryType,
        /// Parent category name
        #[arg(long)]
        parent: Option<String>,
    },
    /// List categories.
    List,
}

#[derive(Subcommand)]
pub enum LedgerCommands {
    /// Record a credit or debit.
    Add {
        description: String,
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        category: String,
        /// cash, pix, transfer, card, check, compensation
        #[arg(long, default_value = "pix")]
        method: PaymentMethod,
        /// Due date (default: today)
        #[arg(long, value_parser = parse_date)]
        due: Option<NaiveDate>,
        /// Paid date; the entry is recorded as paid
        #[arg(long, value_parser = parse_date)]
        paid: Option<NaiveDate>,
        /// Member id, CIM or name
        #[arg(long)]
        member: Option<String>,
    },
    /// List entries.
    List {
        /// pending, paid or cancelled
        #[arg(long)]
        status: Option<EntryStatus>,
        /// Month filter: YYYY-MM
        #[arg(long, value_parser = parse_month)]
        month: Option<(i32, u32)>,
        #[arg(long)]
        year: Option<i32>,
    },
    /// Mark a pending entry as paid.
    Pay {
        id: i64,
        /// Paid date (default: today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(long)]
        method: Option<PaymentMethod>,
    },
    /// Cancel a pending entry.
    Cancel { id: i64 },
}

#[derive(Subcommand)]
pub enum EquipmentCommands {
    /// Add equipment to the inventory.
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List equipment.
    List {
        /// available, loaned or disposed
        #[arg(long)]
        status: Option<EquipmentStatus>,
    },
    /// Write off equipment.
    Dispose { id: i64 },
}

#[derive(Subcommand)]
pub enum LoansCommands {
    /// Lend equipment to a beneficiary.
    Create {
        beneficiary: String,
        /// Equipment ids
        #[arg(long = "item", required = true)]
        items: Vec<i64>,
        #[arg(long)]
        contact: Option<String>,
        /// Start date (default: today)
        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,
        #[arg(long = "expected-return", value_parser = parse_date)]
        expected_return: Option<NaiveDate>,
    },
    /// Close a loan and return its equipment to storage.
    Return {
        id: i64,
        /// Return date (default: today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// List loans.
    List {
        /// active or returned
        #[arg(long)]
        status: Option<LoanStatus>,
    },
}

/// Shared by every report: where the output goes.
#[derive(Args, Clone, Default)]
pub struct ReportOutputArgs {
    /// Write plain text to this file instead of printing
    #[arg(long)]
    pub output: Option<String>,
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Birthdays, anniversaries and events.
    Dates {
        /// today, week, month or all
        #[arg(long, default_value = "month")]
        window: Window,
        /// Reference day (default: today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[command(flatten)]
        out: ReportOutputArgs,
    },
    /// Income and expenses by category for a period.
    Finance {
        /// Month filter: YYYY-MM
        #[arg(long, value_parser = parse_month)]
        month: Option<(i32, u32)>,
        /// Year filter (default: current year)
        #[arg(long)]
        year: Option<i32>,
        #[command(flatten)]
        out: ReportOutputArgs,
    },
    /// Monthly inflows and outflows for a year.
    Cashflow {
        #[arg(long)]
        year: Option<i32>,
        #[command(flatten)]
        out: ReportOutputArgs,
    },
    /// Pending income past its due date.
    Overdue {
        /// Reference day (default: today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[command(flatten)]
        out: ReportOutputArgs,
    },
}

impl ReportCommands {
    pub fn output_args(&self) -> &ReportOutputArgs {
        match self {
            ReportCommands::Dates { out, .. }
            | ReportCommands::Finance { out, .. }
            | ReportCommands::Cashflow { out, .. }
            | ReportCommands::Overdue { out, .. } => out,
        }
    }

    pub fn report_name(&self) -> &'static str {
        match self {
            ReportCommands::Dates { .. } => "dates",
            ReportCommands::Finance { .. } => "finance",
            ReportCommands::Cashflow { .. } => "cashflow",
            ReportCommands::Overdue { .. } => "overdue",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_date("2024-03-15").unwrap(), expected);
        assert_eq!(parse_date("15/03/2024").unwrap(), expected);
        assert!(parse_date("2024-02-30").is_err());
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2024-03").unwrap(), (2024, 3));
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("march").is_err());
    }

    #[test]
    fn test_parse_day_month() {
        assert_eq!(parse_day_month("21/04").unwrap(), (4, 21));
        assert_eq!(parse_day_month("04-21").unwrap(), (4, 21));
        assert!(parse_day_month("21").is_err());
    }
}
