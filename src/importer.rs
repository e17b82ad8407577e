use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{LojaError, Result};
use crate::ledger::{self, NewEntry};
use crate::models::{NewMember, Relationship};
use crate::registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Members,
    Family,
    Ledger,
}

impl FromStr for ImportKind {
    type Err = LojaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "members" | "irmaos" | "irmãos" => Ok(ImportKind::Members),
            "family" | "familia" | "família" => Ok(ImportKind::Family),
            "ledger" | "financeiro" => Ok(ImportKind::Ledger),
            other => Err(LojaError::Validation(format!(
                "unknown import kind '{other}' (expected members, family or ledger)"
            ))),
        }
    }
}

/// One row of a family CSV. `member` is the owning brother's id, CIM or name.
#[derive(Debug, Clone, Deserialize)]
pub struct FamilyRow {
    pub member: String,
    pub name: String,
    pub relationship: Relationship,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
}

pub struct ImportResult {
    pub imported: usize,
    /// (line number, reason) for every row left out.
    pub skipped: Vec<(usize, String)>,
}

/// Brazilian spreadsheets usually export with `;`.
fn sniff_delimiter(file_path: &Path) -> Result<u8> {
    let content = std::fs::read_to_string(file_path)?;
    let header = content.lines().next().unwrap_or_default();
    if header.contains(';') && !header.contains(',') {
        Ok(b';')
    } else {
        Ok(b',')
    }
}

fn import_rows<T, F>(conn: &mut Connection, file_path: &Path, mut insert: F) -> Result<ImportResult>
where
    T: DeserializeOwned,
    F: FnMut(&Connection, &T) -> Result<i64>,
{
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(file_path)?)
        .trim(csv::Trim::All)
        .from_path(file_path)?;

    let tx = conn.transaction()?;
    let mut imported = 0;
    let mut skipped = Vec::new();
    for (idx, record) in reader.deserialize::<T>().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let outcome = match record {
            Ok(row) => insert(&*tx, &row).map(|_| ()),
            Err(e) => Err(LojaError::Csv(e)),
        };
        match outcome {
            Ok(()) => imported += 1,
            Err(e) => {
                tracing::warn!(line, error = %e, "skipping import row");
                skipped.push((line, e.to_string()));
            }
        }
    }
    tx.commit()?;
    tracing::info!(file = %file_path.display(), imported, skipped = skipped.len(), "import finished");
    Ok(ImportResult { imported, skipped })
}

/// Load a CSV file into the registry or the ledger. Rows that fail to parse
/// or validate are skipped and reported; the rest commit together.
pub fn import_file(conn: &mut Connection, kind: ImportKind, file_path: &Path) -> Result<ImportResult> {
    match kind {
        ImportKind::Members => {
            import_rows::<NewMember, _>(conn, file_path, |c, row| registry::add_member(c, row))
        }
        ImportKind::Family => import_rows::<FamilyRow, _>(conn, file_path, |c, row| {
            let owner = registry::resolve_member(c, &row.member)?;
            registry::add_family(c, owner.id, &row.name, row.relationship, row.birth_date)
        }),
        ImportKind::Ledger => {
            import_rows::<NewEntry, _>(conn, file_path, |c, row| ledger::add_entry(c, row))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::models::EntryStatus;

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_import_members_and_family() {
        let (dir, mut conn) = test_db();
        let members = write(
            &dir,
            "members.csv",
            "name,cim,birth_date,role,initiated_on,married_on\n\
             João Pereira,100,1960-05-01,Venerável Mestre,1990-08-20,1985-02-14\n\
             Pedro Alves,200,1962-11-30,,,\n",
        );
        let result = import_file(&mut conn, ImportKind::Members, &members).unwrap();
        assert_eq!(result.imported, 2);
        assert!(result.skipped.is_empty());

        let family = write(
            &dir,
            "family.csv",
            "member;name;relationship;birth_date\n\
             100;Maria Silva;esposa;1980-05-01\n\
             Pedro Alves;maria silva;daughter;1980-05-01\n\
             999;Ninguém;wife;\n\
             200;Lucas;cousin;2000-01-01\n",
        );
        let result = import_file(&mut conn, ImportKind::Family, &family).unwrap();
        assert_eq!(result.imported, 2);
        assert_eq!(result.skipped.len(), 2);
        assert_eq!(result.skipped[0].0, 4);
        assert_eq!(result.skipped[1].0, 5);
        assert_eq!(registry::list_family(&conn, None).unwrap().len(), 2);
    }

    #[test]
    fn test_import_ledger() {
        let (dir, mut conn) = test_db();
        let path = write(
            &dir,
            "ledger.csv",
            "description,amount,due_date,paid_date,category,payment_method,member\n\
             Mensalidade março,120.00,2024-03-10,2024-03-09,Mensalidades,pix,\n\
             Aluguel,900.00,2024-03-05,,Aluguel,transferência,\n\
             Sem valor,abc,2024-03-05,,Aluguel,pix,\n",
        );
        let result = import_file(&mut conn, ImportKind::Ledger, &path).unwrap();
        assert_eq!(result.imported, 2);
        assert_eq!(result.skipped.len(), 1);
        let paid = ledger::list_entries(&conn, Some(EntryStatus::Paid), None, None).unwrap();
        assert_eq!(paid.len(), 1);
        assert_eq!(paid[0].entry.amount, 120.0);
    }

    #[test]
    fn test_import_kind_parsing() {
        assert_eq!("Irmãos".parse::<ImportKind>().unwrap(), ImportKind::Members);
        assert_eq!("ledger".parse::<ImportKind>().unwrap(), ImportKind::Ledger);
        assert!("loans".parse::<ImportKind>().is_err());
    }
}
