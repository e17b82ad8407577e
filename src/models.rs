use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer};

use crate::error::{LojaError, Result};
use crate::occurrence::MonthDay;

/// Status-like enums stored as lowercase text columns. Each variant has a
/// canonical spelling plus optional Portuguese aliases accepted on input.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $what:literal {
            $($variant:ident => $text:literal $(| $alias:literal)*),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = LojaError;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim().to_lowercase().as_str() {
                    $($text $(| $alias)* => Ok($name::$variant),)+
                    other => Err(LojaError::Validation(format!(
                        "unknown {}: '{other}'",
                        $what
                    ))),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: LojaError| FromSqlError::Other(Box::new(e)))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(d)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

text_enum!(MemberStatus, "member status" {
    Active => "active" | "ativo",
    Deceased => "deceased" | "falecido",
});

text_enum!(Relationship, "relationship" {
    Wife => "wife" | "esposa",
    Son => "son" | "filho",
    Daughter => "daughter" | "filha",
    Father => "father" | "pai",
    Mother => "mother" | "mae" | "mãe",
});

text_enum!(CategoryType, "category type" {
    Income => "income" | "receita" | "credito" | "crédito",
    Expense => "expense" | "despesa" | "debito" | "débito",
});

text_enum!(PaymentMethod, "payment method" {
    Cash => "cash" | "dinheiro",
    Pix => "pix",
    Transfer => "transfer" | "transferencia" | "transferência",
    Card => "card" | "cartao" | "cartão",
    Check => "check" | "cheque",
    Compensation => "compensation" | "compensacao" | "compensação",
});

text_enum!(EntryStatus, "entry status" {
    Pending => "pending" | "pendente",
    Paid => "paid" | "pago",
    Cancelled => "cancelled" | "cancelado",
});

text_enum!(EquipmentStatus, "equipment status" {
    Available => "available" | "disponivel" | "disponível",
    Loaned => "loaned" | "emprestado",
    Disposed => "disposed" | "baixado",
});

text_enum!(LoanStatus, "loan status" {
    Active => "active" | "ativo",
    Returned => "returned" | "devolvido",
});

impl Relationship {
    /// Capitalized label used in relationship statements.
    pub fn title(&self) -> &'static str {
        match self {
            Relationship::Wife => "Wife",
            Relationship::Son => "Son",
            Relationship::Daughter => "Daughter",
            Relationship::Father => "Father",
            Relationship::Mother => "Mother",
        }
    }
}

impl EntryStatus {
    /// Only pending entries move, and only to paid or cancelled.
    pub fn can_become(&self, next: EntryStatus) -> bool {
        matches!(
            (self, next),
            (EntryStatus::Pending, EntryStatus::Paid) | (EntryStatus::Pending, EntryStatus::Cancelled)
        )
    }
}

#[derive(Debug, Clone)]
pub struct Member {
    pub id: i64,
    pub name: String,
    pub cim: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub status: MemberStatus,
    pub role: Option<String>,
    pub initiated_on: Option<NaiveDate>,
    pub elevated_on: Option<NaiveDate>,
    pub exalted_on: Option<NaiveDate>,
    pub married_on: Option<NaiveDate>,
}

/// Fields accepted when registering a member.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewMember {
    pub name: String,
    #[serde(default)]
    pub cim: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub initiated_on: Option<NaiveDate>,
    #[serde(default)]
    pub married_on: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct FamilyMember {
    pub id: i64,
    pub member_id: i64,
    pub name: String,
    pub relationship: Relationship,
    pub birth_date: Option<NaiveDate>,
    pub deceased: bool,
}

#[derive(Debug, Clone)]
pub struct Degree {
    pub id: i64,
    pub member_id: i64,
    pub degree: String,
    pub conferred_on: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct CustomEvent {
    pub id: i64,
    pub name: String,
    pub event_type: String,
    pub day: MonthDay,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub category_type: CategoryType,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub id: i64,
    pub description: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
    pub category_id: i64,
    pub payment_method: PaymentMethod,
    pub status: EntryStatus,
    pub member_id: Option<i64>,
}

impl LedgerEntry {
    /// Date the entry counts toward in period reports.
    pub fn effective_date(&self) -> NaiveDate {
        self.paid_date.unwrap_or(self.due_date)
    }
}

#[derive(Debug, Clone)]
pub struct Equipment {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub status: EquipmentStatus,
}

#[derive(Debug, Clone)]
pub struct Loan {
    pub id: i64,
    pub beneficiary: String,
    pub contact: Option<String>,
    pub start_date: NaiveDate,
    pub expected_return: Option<NaiveDate>,
    pub returned_on: Option<NaiveDate>,
    pub status: LoanStatus,
    pub equipment_ids: Vec<i64>,
}

/// Case-insensitive name comparison. SQLite's `lower()` only folds ASCII,
/// so names with accented capitals are compared here instead.
pub fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_enum_aliases() {
        assert_eq!("Dinheiro".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert_eq!("compensação".parse::<PaymentMethod>().unwrap(), PaymentMethod::Compensation);
        assert_eq!("esposa".parse::<Relationship>().unwrap(), Relationship::Wife);
        assert_eq!(" PAID ".parse::<EntryStatus>().unwrap(), EntryStatus::Paid);
        let err = "boleto".parse::<PaymentMethod>().unwrap_err().to_string();
        assert!(err.contains("unknown payment method"), "got: {err}");
    }

    #[test]
    fn test_entry_status_transitions() {
        assert!(EntryStatus::Pending.can_become(EntryStatus::Paid));
        assert!(EntryStatus::Pending.can_become(EntryStatus::Cancelled));
        assert!(!EntryStatus::Paid.can_become(EntryStatus::Cancelled));
        assert!(!EntryStatus::Cancelled.can_become(EntryStatus::Paid));
        assert!(!EntryStatus::Paid.can_become(EntryStatus::Pending));
    }

    #[test]
    fn test_effective_date_prefers_paid_date() {
        let due = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let paid = NaiveDate::from_ymd_opt(2024, 2, 3).unwrap();
        let mut entry = LedgerEntry {
            id: 1,
            description: "Mensalidade".into(),
            amount: 100.0,
            due_date: due,
            paid_date: None,
            category_id: 1,
            payment_method: PaymentMethod::Pix,
            status: EntryStatus::Pending,
            member_id: None,
        };
        assert_eq!(entry.effective_date(), due);
        entry.paid_date = Some(paid);
        assert_eq!(entry.effective_date(), paid);
    }
}
