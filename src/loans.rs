//! Equipment inventory and comodato (equipment loan) agreements.
//!
//! Creating or closing a loan touches the loan row, its items and every
//! loaned equipment row. Each of those runs as one SQLite transaction: a
//! failure at any step rolls back the steps before it.

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, Transaction};

use crate::error::{LojaError, Result};
use crate::models::{Equipment, EquipmentStatus, Loan, LoanStatus};

fn equipment_from_row(row: &Row) -> rusqlite::Result<Equipment> {
    Ok(Equipment {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
    })
}

// ---------------------------------------------------------------------------
// Equipment
// ---------------------------------------------------------------------------

pub fn add_equipment(conn: &Connection, name: &str, description: Option<&str>) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LojaError::Validation("equipment name must not be empty".to_string()));
    }
    conn.execute(
        "INSERT INTO equipment (name, description, status) VALUES (?1, ?2, ?3)",
        rusqlite::params![name, description, EquipmentStatus::Available],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_equipment(conn: &Connection, id: i64) -> Result<Equipment> {
    conn.query_row(
        "SELECT id, name, description, status FROM equipment WHERE id = ?1",
        [id],
        equipment_from_row,
    )
    .optional()?
    .ok_or_else(|| LojaError::UnknownEquipment(id.to_string()))
}

pub fn list_equipment(conn: &Connection, status: Option<EquipmentStatus>) -> Result<Vec<Equipment>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, status FROM equipment \
         WHERE ?1 IS NULL OR status = ?1 ORDER BY name, id",
    )?;
    let rows = stmt
        .query_map([status], equipment_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Write off equipment that is in storage. Loaned items must come back first.
pub fn dispose_equipment(conn: &Connection, id: i64) -> Result<()> {
    let item = get_equipment(conn, id)?;
    if item.status != EquipmentStatus::Available {
        return Err(LojaError::InvalidTransition(format!(
            "{} is {} and cannot be disposed",
            item.name, item.status
        )));
    }
    conn.execute(
        "UPDATE equipment SET status = ?1 WHERE id = ?2",
        rusqlite::params![EquipmentStatus::Disposed, id],
    )?;
    tracing::info!(id, "equipment disposed");
    Ok(())
}

/// Move one equipment row from `from` to `to`, failing if it is elsewhere.
fn move_equipment(tx: &Transaction, id: i64, from: EquipmentStatus, to: EquipmentStatus) -> Result<()> {
    let changed = tx.execute(
        "UPDATE equipment SET status = ?1 WHERE id = ?2 AND status = ?3",
        rusqlite::params![to, id, from],
    )?;
    if changed == 1 {
        return Ok(());
    }
    let current: Option<EquipmentStatus> = tx
        .query_row("SELECT status FROM equipment WHERE id = ?1", [id], |r| r.get(0))
        .optional()?;
    match current {
        None => Err(LojaError::UnknownEquipment(id.to_string())),
        Some(status) => Err(LojaError::InvalidTransition(format!(
            "equipment {id} is {status}, expected {from}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Loans
// ---------------------------------------------------------------------------

/// What a new comodato covers and who receives it.
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub beneficiary: String,
    pub contact: Option<String>,
    pub start_date: NaiveDate,
    pub expected_return: Option<NaiveDate>,
    pub equipment_ids: Vec<i64>,
}

pub fn create_loan(conn: &mut Connection, loan: &NewLoan) -> Result<i64> {
    let beneficiary = loan.beneficiary.trim();
    if beneficiary.is_empty() {
        return Err(LojaError::Validation("beneficiary must not be empty".to_string()));
    }
    if loan.equipment_ids.is_empty() {
        return Err(LojaError::Validation("a loan needs at least one item".to_string()));
    }
    if let Some(expected) = loan.expected_return {
        if expected < loan.start_date {
            return Err(LojaError::Validation(format!(
                "expected return {expected} is before the start date {}",
                loan.start_date
            )));
        }
    }
    let mut ids = loan.equipment_ids.clone();
    ids.sort_unstable();
    ids.dedup();

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO loans (beneficiary, contact, start_date, expected_return, status) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![beneficiary, loan.contact, loan.start_date, loan.expected_return, LoanStatus::Active],
    )?;
    let loan_id = tx.last_insert_rowid();
    for id in &ids {
        if let Err(e) = move_equipment(&tx, *id, EquipmentStatus::Available, EquipmentStatus::Loaned) {
            tracing::warn!(loan_id, equipment_id = id, error = %e, "loan rolled back");
            return Err(e);
        }
        tx.execute(
            "INSERT INTO loan_items (loan_id, equipment_id) VALUES (?1, ?2)",
            [loan_id, *id],
        )?;
    }
    tx.commit()?;
    tracing::info!(loan_id, beneficiary, items = ids.len(), "loan created");
    Ok(loan_id)
}

pub fn return_loan(conn: &mut Connection, loan_id: i64, returned_on: NaiveDate) -> Result<()> {
    let loan = get_loan(conn, loan_id)?;
    if loan.status != LoanStatus::Active {
        return Err(LojaError::InvalidTransition(format!("loan {loan_id} was already returned")));
    }
    if returned_on < loan.start_date {
        return Err(LojaError::Validation(format!(
            "return date {returned_on} is before the start date {}",
            loan.start_date
        )));
    }

    let tx = conn.transaction()?;
    tx.execute(
        "UPDATE loans SET status = ?1, returned_on = ?2 WHERE id = ?3",
        rusqlite::params![LoanStatus::Returned, returned_on, loan_id],
    )?;
    for id in &loan.equipment_ids {
        move_equipment(&tx, *id, EquipmentStatus::Loaned, EquipmentStatus::Available)?;
    }
    tx.commit()?;
    tracing::info!(loan_id, %returned_on, "loan returned");
    Ok(())
}

fn loan_items(conn: &Connection, loan_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT equipment_id FROM loan_items WHERE loan_id = ?1 ORDER BY equipment_id")?;
    let ids = stmt
        .query_map([loan_id], |r| r.get(0))?
        .collect::<std::result::Result<Vec<i64>, _>>()?;
    Ok(ids)
}

fn loan_from_row(row: &Row) -> rusqlite::Result<Loan> {
    Ok(Loan {
        id: row.get(0)?,
        beneficiary: row.get(1)?,
        contact: row.get(2)?,
        start_date: row.get(3)?,
        expected_return: row.get(4)?,
        returned_on: row.get(5)?,
        status: row.get(6)?,
        equipment_ids: Vec::new(),
    })
}

const LOAN_SELECT: &str =
    "SELECT id, beneficiary, contact, start_date, expected_return, returned_on, status FROM loans";

pub fn get_loan(conn: &Connection, loan_id: i64) -> Result<Loan> {
    let mut loan = conn
        .query_row(&format!("{LOAN_SELECT} WHERE id = ?1"), [loan_id], loan_from_row)
        .optional()?
        .ok_or_else(|| LojaError::Other(format!("No loan with ID {loan_id}")))?;
    loan.equipment_ids = loan_items(conn, loan_id)?;
    Ok(loan)
}

pub fn list_loans(conn: &Connection, status: Option<LoanStatus>) -> Result<Vec<Loan>> {
    let mut stmt = conn.prepare(&format!(
        "{LOAN_SELECT} WHERE ?1 IS NULL OR status = ?1 ORDER BY start_date DESC, id DESC"
    ))?;
    let mut loans = stmt
        .query_map([status], loan_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    for loan in &mut loans {
        loan.equipment_ids = loan_items(conn, loan.id)?;
    }
    Ok(loans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn new_loan(ids: Vec<i64>) -> NewLoan {
        NewLoan {
            beneficiary: "Dona Lúcia".to_string(),
            contact: Some("(11) 99999-0000".to_string()),
            start_date: d(2024, 5, 1),
            expected_return: Some(d(2024, 8, 1)),
            equipment_ids: ids,
        }
    }

    #[test]
    fn test_create_loan_marks_equipment_loaned() {
        let (_dir, mut conn) = test_db();
        let chair = add_equipment(&conn, "Cadeira de rodas", None).unwrap();
        let bed = add_equipment(&conn, "Cama hospitalar", Some("articulada")).unwrap();
        let loan_id = create_loan(&mut conn, &new_loan(vec![bed, chair, chair])).unwrap();

        let loan = get_loan(&conn, loan_id).unwrap();
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.equipment_ids, vec![chair, bed]);
        assert_eq!(get_equipment(&conn, chair).unwrap().status, EquipmentStatus::Loaned);
        assert_eq!(get_equipment(&conn, bed).unwrap().status, EquipmentStatus::Loaned);
        assert!(list_equipment(&conn, Some(EquipmentStatus::Available)).unwrap().is_empty());
    }

    #[test]
    fn test_failed_loan_leaves_nothing_behind() {
        let (_dir, mut conn) = test_db();
        let chair = add_equipment(&conn, "Cadeira de rodas", None).unwrap();
        let crutches = add_equipment(&conn, "Muletas", None).unwrap();
        create_loan(&mut conn, &new_loan(vec![crutches])).unwrap();

        let err = create_loan(&mut conn, &new_loan(vec![chair, crutches])).unwrap_err();
        assert!(matches!(err, LojaError::InvalidTransition(_)), "got: {err}");
        assert_eq!(get_equipment(&conn, chair).unwrap().status, EquipmentStatus::Available);
        assert_eq!(list_loans(&conn, None).unwrap().len(), 1);
        let items: i64 = conn.query_row("SELECT count(*) FROM loan_items", [], |r| r.get(0)).unwrap();
        assert_eq!(items, 1);
    }

    #[test]
    fn test_unknown_equipment_rolls_back() {
        let (_dir, mut conn) = test_db();
        let chair = add_equipment(&conn, "Cadeira de rodas", None).unwrap();
        let err = create_loan(&mut conn, &new_loan(vec![chair, 404])).unwrap_err();
        assert!(matches!(err, LojaError::UnknownEquipment(_)));
        assert_eq!(get_equipment(&conn, chair).unwrap().status, EquipmentStatus::Available);
        assert!(list_loans(&conn, None).unwrap().is_empty());
    }

    #[test]
    fn test_return_loan_frees_equipment() {
        let (_dir, mut conn) = test_db();
        let chair = add_equipment(&conn, "Cadeira de rodas", None).unwrap();
        let loan_id = create_loan(&mut conn, &new_loan(vec![chair])).unwrap();
        return_loan(&mut conn, loan_id, d(2024, 7, 20)).unwrap();

        let loan = get_loan(&conn, loan_id).unwrap();
        assert_eq!(loan.status, LoanStatus::Returned);
        assert_eq!(loan.returned_on, Some(d(2024, 7, 20)));
        assert_eq!(get_equipment(&conn, chair).unwrap().status, EquipmentStatus::Available);
        assert!(matches!(
            return_loan(&mut conn, loan_id, d(2024, 7, 21)),
            Err(LojaError::InvalidTransition(_))
        ));
        assert_eq!(list_loans(&conn, Some(LoanStatus::Active)).unwrap().len(), 0);
    }

    #[test]
    fn test_loan_validation() {
        let (_dir, mut conn) = test_db();
        let chair = add_equipment(&conn, "Cadeira de rodas", None).unwrap();
        assert!(matches!(create_loan(&mut conn, &new_loan(vec![])), Err(LojaError::Validation(_))));
        let mut backwards = new_loan(vec![chair]);
        backwards.expected_return = Some(d(2024, 4, 1));
        assert!(matches!(create_loan(&mut conn, &backwards), Err(LojaError::Validation(_))));
        let loan_id = create_loan(&mut conn, &new_loan(vec![chair])).unwrap();
        assert!(matches!(
            return_loan(&mut conn, loan_id, d(2024, 4, 30)),
            Err(LojaError::Validation(_))
        ));
    }

    #[test]
    fn test_dispose_only_available() {
        let (_dir, mut conn) = test_db();
        let chair = add_equipment(&conn, "Cadeira de rodas", None).unwrap();
        let walker = add_equipment(&conn, "Andador", None).unwrap();
        create_loan(&mut conn, &new_loan(vec![chair])).unwrap();
        assert!(matches!(dispose_equipment(&conn, chair), Err(LojaError::InvalidTransition(_))));
        dispose_equipment(&conn, walker).unwrap();
        assert_eq!(get_equipment(&conn, walker).unwrap().status, EquipmentStatus::Disposed);
        assert!(matches!(dispose_equipment(&conn, walker), Err(LojaError::InvalidTransition(_))));
        assert!(matches!(dispose_equipment(&conn, 77), Err(LojaError::UnknownEquipment(_))));
    }
}
