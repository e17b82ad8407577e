use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS members (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    cim TEXT,
    birth_date TEXT,
    status TEXT NOT NULL DEFAULT 'active',
    role TEXT,
    initiated_on TEXT,
    elevated_on TEXT,
    exalted_on TEXT,
    married_on TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS degrees (
    id INTEGER PRIMARY KEY,
    member_id INTEGER NOT NULL,
    degree TEXT NOT NULL,
    conferred_on TEXT NOT NULL,
    FOREIGN KEY (member_id) REFERENCES members(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS family (
    id INTEGER PRIMARY KEY,
    member_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    relationship TEXT NOT NULL,
    birth_date TEXT,
    deceased INTEGER,
    FOREIGN KEY (member_id) REFERENCES members(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    event_type TEXT NOT NULL,
    day INTEGER NOT NULL,
    month INTEGER NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    category_type TEXT NOT NULL,
    parent_id INTEGER,
    FOREIGN KEY (parent_id) REFERENCES categories(id)
);

CREATE TABLE IF NOT EXISTS ledger (
    id INTEGER PRIMARY KEY,
    description TEXT NOT NULL,
    amount REAL NOT NULL,
    due_date TEXT NOT NULL,
    paid_date TEXT,
    category_id INTEGER NOT NULL,
    payment_method TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    member_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (category_id) REFERENCES categories(id),
    FOREIGN KEY (member_id) REFERENCES members(id)
);

CREATE TABLE IF NOT EXISTS equipment (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'available'
);

CREATE TABLE IF NOT EXISTS loans (
    id INTEGER PRIMARY KEY,
    beneficiary TEXT NOT NULL,
    contact TEXT,
    start_date TEXT NOT NULL,
    expected_return TEXT,
    returned_on TEXT,
    status TEXT NOT NULL DEFAULT 'active'
);

CREATE TABLE IF NOT EXISTS loan_items (
    loan_id INTEGER NOT NULL,
    equipment_id INTEGER NOT NULL,
    PRIMARY KEY (loan_id, equipment_id),
    FOREIGN KEY (loan_id) REFERENCES loans(id),
    FOREIGN KEY (equipment_id) REFERENCES equipment(id)
);
";

// (name, parent name, category_type)
const DEFAULT_CATEGORIES: &[(&str, Option<&str>, &str)] = &[
    // Income
    ("Mensalidades", None, "income"),
    ("Joias", None, "income"),
    ("Tronco de Beneficência", None, "income"),
    ("Doações", None, "income"),
    ("Eventos", None, "income"),
    // Expenses
    ("Administrativas", None, "expense"),
    ("Aluguel", Some("Administrativas"), "expense"),
    ("Água e Luz", Some("Administrativas"), "expense"),
    ("Material de Expediente", Some("Administrativas"), "expense"),
    ("Ágapes", None, "expense"),
    ("Per Capita", None, "expense"),
    ("Beneficência", None, "expense"),
    ("Despesas Pagas pelo Irmão", None, "expense"),
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM categories", [], |row| row.get(0))?;
    if count == 0 {
        for (name, parent, category_type) in DEFAULT_CATEGORIES {
            conn.execute(
                "INSERT INTO categories (name, category_type, parent_id) \
                 VALUES (?1, ?2, (SELECT id FROM categories WHERE name = ?3))",
                rusqlite::params![name, category_type, parent],
            )?;
        }
        tracing::debug!(count = DEFAULT_CATEGORIES.len(), "seeded default categories");
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let conn = get_connection(&dir.path().join("test.db")).unwrap();
    init_db(&conn).unwrap();
    (dir, conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &[
            "members", "degrees", "family", "events", "categories", "ledger", "equipment", "loans",
            "loan_items",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
        let count: i64 = conn.query_row("SELECT count(*) FROM categories", [], |r| r.get(0)).unwrap();
        assert_eq!(count as usize, DEFAULT_CATEGORIES.len());
    }

    #[test]
    fn test_seeded_children_point_at_parent() {
        let (_dir, conn) = test_db();
        let parent: Option<String> = conn
            .query_row(
                "SELECT p.name FROM categories c JOIN categories p ON c.parent_id = p.id WHERE c.name = 'Aluguel'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(parent.as_deref(), Some("Administrativas"));
    }
}
