mod cli;
mod commemorative;
mod db;
mod error;
mod fmt;
mod importer;
mod ledger;
mod loans;
mod models;
mod occurrence;
mod registry;
mod reports;
mod settings;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{
    today, CategoriesCommands, Cli, Commands, EquipmentCommands, EventsCommands, FamilyCommands,
    LedgerCommands, LoansCommands, MembersCommands,
};
use error::Result;
use settings::{load_settings, Settings};

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOJA_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(settings: &Settings, command: Commands) -> Result<()> {
    match command {
        Commands::Init { data_dir, lodge_name } => cli::init::run(settings, data_dir, lodge_name),
        Commands::Status => cli::status::run(settings),
        Commands::Backup { output } => cli::backup::run(settings, output),
        Commands::Members { command } => match command {
            MembersCommands::Add {
                name,
                cim,
                birth,
                role,
                initiated,
                married,
            } => cli::members::add(
                settings,
                &models::NewMember {
                    name,
                    cim,
                    birth_date: birth,
                    role,
                    initiated_on: initiated,
                    married_on: married,
                },
            ),
            MembersCommands::List { all } => cli::members::list(settings, all),
            MembersCommands::Show { member } => cli::members::show(settings, &member),
            MembersCommands::Deceased { member } => cli::members::deceased(settings, &member),
            MembersCommands::Degree { member, degree, date } => {
                cli::members::degree(settings, &member, &degree, date)
            }
        },
        Commands::Family { command } => match command {
            FamilyCommands::Add {
                member,
                name,
                relationship,
                birth,
            } => cli::family::add(settings, &member, &name, relationship, birth),
            FamilyCommands::List { member } => cli::family::list(settings, member.as_deref()),
            FamilyCommands::Deceased { id } => cli::family::deceased(settings, id),
        },
        Commands::Events { command } => match command {
            EventsCommands::Add {
                name,
                day,
                event_type,
                description,
            } => cli::events::add(settings, &name, day, &event_type, description.as_deref()),
            EventsCommands::List => cli::events::list(settings),
            EventsCommands::Delete { id } => cli::events::delete(settings, id),
        },
        Commands::Categories { command } => match command {
            CategoriesCommands::Add {
                name,
                category_type,
                parent,
            } => cli::categories::add(settings, &name, category_type, parent.as_deref()),
            CategoriesCommands::List => cli::categories::list(settings),
        },
        Commands::Ledger { command } => match command {
            LedgerCommands::Add {
                description,
                amount,
                category,
                method,
                due,
                paid,
                member,
            } => cli::ledger::add(
                settings,
                &ledger::NewEntry {
                    description,
                    amount,
                    due_date: due.or(paid).unwrap_or_else(today),
                    paid_date: paid,
                    category,
                    payment_method: method,
                    member,
                },
            ),
            LedgerCommands::List { status, month, year } => cli::ledger::list(settings, status, month, year),
            LedgerCommands::Pay { id, date, method } => {
                cli::ledger::pay(settings, id, date.unwrap_or_else(today), method)
            }
            LedgerCommands::Cancel { id } => cli::ledger::cancel(settings, id),
        },
        Commands::Equipment { command } => match command {
            EquipmentCommands::Add { name, description } => {
                cli::equipment::add(settings, &name, description.as_deref())
            }
            EquipmentCommands::List { status } => cli::equipment::list(settings, status),
            EquipmentCommands::Dispose { id } => cli::equipment::dispose(settings, id),
        },
        Commands::Loans { command } => match command {
            LoansCommands::Create {
                beneficiary,
                items,
                contact,
                start,
                expected_return,
            } => cli::loans::create(
                settings,
                &loans::NewLoan {
                    beneficiary,
                    contact,
                    start_date: start.unwrap_or_else(today),
                    expected_return,
                    equipment_ids: items,
                },
            ),
            LoansCommands::Return { id, date } => cli::loans::return_loan(settings, id, date.unwrap_or_else(today)),
            LoansCommands::List { status } => cli::loans::list(settings, status, today()),
        },
        Commands::Import { kind, file } => cli::import::run(settings, &kind, &file),
        Commands::Report { command } => cli::report::dispatch(settings, command),
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let settings = load_settings();

    if let Err(e) = run(&settings, cli.command) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
