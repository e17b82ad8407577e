use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::settings::Settings;

fn count(conn: &rusqlite::Connection, sql: &str) -> Result<i64> {
    Ok(conn.query_row(sql, [], |r| r.get(0))?)
}

pub fn run(settings: &Settings) -> Result<()> {
    let db_path = settings.db_path();

    println!("Lodge:      {}", if settings.lodge_name.is_empty() { "(not set)" } else { &settings.lodge_name });
    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());
    println!("Leap day:   {}", settings.leap_day);

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `loja init` to set up.");
        return Ok(());
    }

    let size = std::fs::metadata(&db_path)?.len();
    println!("DB size:    {}", format_bytes(size));

    let conn = get_connection(&db_path)?;
    let members = count(&conn, "SELECT count(*) FROM members WHERE status = 'active'")?;
    let family = count(&conn, "SELECT count(*) FROM family WHERE COALESCE(deceased, 0) = 0")?;
    let events = count(&conn, "SELECT count(*) FROM events")?;
    let pending = count(&conn, "SELECT count(*) FROM ledger WHERE status = 'pending'")?;
    let loans = count(&conn, "SELECT count(*) FROM loans WHERE status = 'active'")?;

    println!();
    println!("Members:        {members}");
    println!("Family:         {family}");
    println!("Events:         {events}");
    println!("Pending dues:   {pending}");
    println!("Active loans:   {loans}");
    Ok(())
}
