use std::collections::HashMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;

use crate::error::{LojaError, Result};
use crate::models::{same_name, CategoryType, EntryStatus, PaymentMethod};
use crate::settings::FinancePolicy;

// ---------------------------------------------------------------------------
// Period
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub year: i32,
    pub month: Option<u32>,
}

impl Period {
    pub fn new(year: i32, month: Option<u32>) -> Result<Self> {
        if let Some(m) = month {
            if !(1..=12).contains(&m) {
                return Err(LojaError::Validation(format!("month must be 1-12, got {m}")));
            }
        }
        Ok(Self { year, month })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && self.month.map_or(true, |m| date.month() == m)
    }

    fn like_prefix(&self) -> String {
        match self.month {
            Some(m) => format!("{:04}-{m:02}", self.year),
            None => format!("{:04}", self.year),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.month {
            Some(m) => write!(f, "{m:02}/{}", self.year),
            None => write!(f, "{}", self.year),
        }
    }
}

// ---------------------------------------------------------------------------
// Rows feeding the rollups
// ---------------------------------------------------------------------------

/// A ledger entry flattened with its category for reporting.
#[derive(Debug, Clone)]
pub struct RollupRow {
    pub amount: f64,
    pub date: NaiveDate,
    pub status: EntryStatus,
    pub payment_method: PaymentMethod,
    pub category: String,
    pub category_type: CategoryType,
    /// Top-level category: the parent, or the category itself at the root.
    pub root: String,
}

/// Whether a paid row counts toward its side's totals.
///
/// Cash in the collection box belongs to a separate fund on both sides,
/// compensation is not cash received, and member-paid expenses are
/// reimbursements rather than lodge spending.
pub fn counts_toward_totals(row: &RollupRow, policy: &FinancePolicy) -> bool {
    if same_name(&row.category, &policy.collection_box_category)
        && row.payment_method == PaymentMethod::Cash
    {
        return false;
    }
    match row.category_type {
        CategoryType::Income => row.payment_method != PaymentMethod::Compensation,
        CategoryType::Expense => !same_name(&row.category, &policy.member_paid_category),
    }
}

fn paid_rows(conn: &Connection, prefix: &str) -> Result<Vec<RollupRow>> {
    let mut stmt = conn.prepare(
        "SELECT l.amount, COALESCE(l.paid_date, l.due_date), l.status, l.payment_method, \
         c.name, c.category_type, COALESCE(p.name, c.name) \
         FROM ledger l JOIN categories c ON l.category_id = c.id \
         LEFT JOIN categories p ON c.parent_id = p.id \
         WHERE l.status = 'paid' AND COALESCE(l.paid_date, l.due_date) LIKE ?1 || '%'",
    )?;
    let rows = stmt
        .query_map([prefix], |row| {
            Ok(RollupRow {
                amount: row.get(0)?,
                date: row.get(1)?,
                status: row.get(2)?,
                payment_method: row.get(3)?,
                category: row.get(4)?,
                category_type: row.get(5)?,
                root: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Category rollup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RollupItem {
    pub name: String,
    pub total: f64,
    pub count: usize,
    pub pct: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SideRollup {
    pub categories: Vec<RollupItem>,
    pub parents: Vec<RollupItem>,
    pub total: f64,
}

#[derive(Debug, Clone)]
pub struct FinanceReport {
    pub period: Period,
    pub income: SideRollup,
    pub expenses: SideRollup,
    pub balance: f64,
    /// Paid rows in the period left out by the carve-outs.
    pub excluded: usize,
}

fn group<'a>(rows: &[&'a RollupRow], key: impl Fn(&'a RollupRow) -> &'a str, total: f64) -> Vec<RollupItem> {
    let mut order: Vec<&str> = Vec::new();
    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
    for row in rows {
        let k = key(*row);
        let slot = sums.entry(k).or_insert_with(|| {
            order.push(k);
            (0.0, 0)
        });
        slot.0 += row.amount;
        slot.1 += 1;
    }

    let mut items: Vec<RollupItem> = order
        .into_iter()
        .map(|name| {
            let (sum, count) = sums[name];
            RollupItem {
                name: name.to_string(),
                total: sum,
                count,
                pct: if total != 0.0 { sum / total * 100.0 } else { 0.0 },
            }
        })
        .collect();
    items.sort_by(|a, b| b.total.total_cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    items
}

fn side(rows: &[&RollupRow]) -> SideRollup {
    let total: f64 = rows.iter().map(|r| r.amount).sum();
    SideRollup {
        categories: group(rows, |r| r.category.as_str(), total),
        parents: group(rows, |r| r.root.as_str(), total),
        total,
    }
}

/// Group paid entries of `period` by category and by top-level category,
/// with each group's share of its side's total.
pub fn category_rollup(rows: &[RollupRow], period: Period, policy: &FinancePolicy) -> FinanceReport {
    let in_period: Vec<&RollupRow> = rows
        .iter()
        .filter(|r| r.status == EntryStatus::Paid && period.contains(r.date))
        .collect();
    let counted: Vec<&RollupRow> = in_period
        .iter()
        .copied()
        .filter(|r| counts_toward_totals(r, policy))
        .collect();

    let (income, expenses): (Vec<&RollupRow>, Vec<&RollupRow>) = counted
        .iter()
        .copied()
        .partition(|r| r.category_type == CategoryType::Income);

    let income = side(&income);
    let expenses = side(&expenses);
    FinanceReport {
        period,
        balance: income.total - expenses.total,
        income,
        expenses,
        excluded: in_period.len() - counted.len(),
    }
}

pub fn get_finance(conn: &Connection, period: Period, policy: &FinancePolicy) -> Result<FinanceReport> {
    let rows = paid_rows(conn, &period.like_prefix())?;
    let report = category_rollup(&rows, period, policy);
    tracing::debug!(%period, rows = rows.len(), excluded = report.excluded, "finance rollup");
    Ok(report)
}

// ---------------------------------------------------------------------------
// Cash flow
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CashflowMonth {
    pub month: u32,
    pub inflows: f64,
    pub outflows: f64,
    pub net: f64,
    pub running_balance: f64,
}

pub struct CashflowReport {
    pub year: i32,
    pub months: Vec<CashflowMonth>,
}

/// Month-by-month movement for `year`, under the same carve-outs as the
/// category rollup. Months without movement are omitted.
pub fn cashflow(rows: &[RollupRow], year: i32, policy: &FinancePolicy) -> CashflowReport {
    let mut by_month: [(f64, f64); 12] = [(0.0, 0.0); 12];
    let mut seen = [false; 12];
    for row in rows {
        if row.status != EntryStatus::Paid || row.date.year() != year || !counts_toward_totals(row, policy) {
            continue;
        }
        let idx = row.date.month0() as usize;
        seen[idx] = true;
        match row.category_type {
            CategoryType::Income => by_month[idx].0 += row.amount,
            CategoryType::Expense => by_month[idx].1 += row.amount,
        }
    }

    let mut running = 0.0f64;
    let mut months = Vec::new();
    for (idx, (inflows, outflows)) in by_month.into_iter().enumerate() {
        if !seen[idx] {
            continue;
        }
        let net = inflows - outflows;
        running += net;
        months.push(CashflowMonth {
            month: idx as u32 + 1,
            inflows,
            outflows,
            net,
            running_balance: running,
        });
    }
    CashflowReport { year, months }
}

pub fn get_cashflow(conn: &Connection, year: i32, policy: &FinancePolicy) -> Result<CashflowReport> {
    let rows = paid_rows(conn, &format!("{year:04}"))?;
    Ok(cashflow(&rows, year, policy))
}

// ---------------------------------------------------------------------------
// Overdue entries
// ---------------------------------------------------------------------------

pub struct OverdueEntry {
    pub id: i64,
    pub description: String,
    pub due_date: NaiveDate,
    pub amount: f64,
    pub category: String,
    pub member_name: Option<String>,
    pub days_late: i64,
}

pub struct OverdueReport {
    pub entries: Vec<OverdueEntry>,
    /// (member name, total owed), largest first. Entries without a member
    /// are grouped under an empty name.
    pub by_member: Vec<(String, f64)>,
    pub total: f64,
}

/// Pending income entries whose due date is before `as_of`.
pub fn get_overdue(conn: &Connection, as_of: NaiveDate) -> Result<OverdueReport> {
    let mut stmt = conn.prepare(
        "SELECT l.id, l.description, l.due_date, l.amount, c.name, m.name \
         FROM ledger l JOIN categories c ON l.category_id = c.id \
         LEFT JOIN members m ON l.member_id = m.id \
         WHERE l.status = 'pending' AND c.category_type = 'income' AND l.due_date < ?1 \
         ORDER BY l.due_date, l.id",
    )?;
    let entries: Vec<OverdueEntry> = stmt
        .query_map([as_of], |row| {
            let due_date: NaiveDate = row.get(2)?;
            Ok(OverdueEntry {
                id: row.get(0)?,
                description: row.get(1)?,
                due_date,
                amount: row.get(3)?,
                category: row.get(4)?,
                member_name: row.get(5)?,
                days_late: (as_of - due_date).num_days(),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut totals: HashMap<String, f64> = HashMap::new();
    for e in &entries {
        *totals.entry(e.member_name.clone().unwrap_or_default()).or_insert(0.0) += e.amount;
    }
    let mut by_member: Vec<(String, f64)> = totals.into_iter().collect();
    by_member.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let total = entries.iter().map(|e| e.amount).sum();
    Ok(OverdueReport {
        entries,
        by_member,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::ledger::{add_entry, NewEntry};
    use crate::models::NewMember;
    use crate::registry::add_member;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn row(category: &str, kind: CategoryType, amount: f64, status: EntryStatus, method: PaymentMethod) -> RollupRow {
        RollupRow {
            amount,
            date: d(2024, 3, 10),
            status,
            payment_method: method,
            category: category.to_string(),
            category_type: kind,
            root: category.to_string(),
        }
    }

    fn period() -> Period {
        Period::new(2024, None).unwrap()
    }

    #[test]
    fn test_only_paid_entries_count() {
        let rows = vec![
            row("Dues", CategoryType::Income, 100.0, EntryStatus::Paid, PaymentMethod::Pix),
            row("Dues", CategoryType::Income, 50.0, EntryStatus::Paid, PaymentMethod::Pix),
            row("Rent", CategoryType::Income, 150.0, EntryStatus::Pending, PaymentMethod::Pix),
        ];
        let report = category_rollup(&rows, period(), &FinancePolicy::default());
        assert_eq!(report.income.categories.len(), 1);
        let dues = &report.income.categories[0];
        assert_eq!(dues.name, "Dues");
        assert_eq!(dues.total, 150.0);
        assert_eq!(dues.count, 2);
        assert_eq!(dues.pct, 100.0);
        assert_eq!(report.income.total, 150.0);
        assert_eq!(report.excluded, 0);
    }

    #[test]
    fn test_period_filter() {
        let mut april = row("Dues", CategoryType::Income, 70.0, EntryStatus::Paid, PaymentMethod::Pix);
        april.date = d(2024, 4, 1);
        let rows = vec![row("Dues", CategoryType::Income, 30.0, EntryStatus::Paid, PaymentMethod::Pix), april];
        let march = category_rollup(&rows, Period::new(2024, Some(3)).unwrap(), &FinancePolicy::default());
        assert_eq!(march.income.total, 30.0);
        let year = category_rollup(&rows, period(), &FinancePolicy::default());
        assert_eq!(year.income.total, 100.0);
        let other = category_rollup(&rows, Period::new(2023, None).unwrap(), &FinancePolicy::default());
        assert_eq!(other.income.total, 0.0);
        assert!(other.income.categories.is_empty());
    }

    #[test]
    fn test_collection_box_cash_excluded_both_sides() {
        let policy = FinancePolicy::default();
        let rows = vec![
            row("Tronco de Beneficência", CategoryType::Income, 80.0, EntryStatus::Paid, PaymentMethod::Cash),
            row("Tronco de Beneficência", CategoryType::Income, 20.0, EntryStatus::Paid, PaymentMethod::Pix),
            row("Tronco de Beneficência", CategoryType::Expense, 40.0, EntryStatus::Paid, PaymentMethod::Cash),
            row("Mensalidades", CategoryType::Income, 100.0, EntryStatus::Paid, PaymentMethod::Cash),
        ];
        let report = category_rollup(&rows, period(), &policy);
        assert_eq!(report.income.total, 120.0);
        assert_eq!(report.expenses.total, 0.0);
        assert_eq!(report.excluded, 2);
    }

    #[test]
    fn test_compensation_excluded_from_income_only() {
        let policy = FinancePolicy::default();
        let rows = vec![
            row("Mensalidades", CategoryType::Income, 100.0, EntryStatus::Paid, PaymentMethod::Compensation),
            row("Mensalidades", CategoryType::Income, 100.0, EntryStatus::Paid, PaymentMethod::Pix),
            row("Aluguel", CategoryType::Expense, 60.0, EntryStatus::Paid, PaymentMethod::Compensation),
        ];
        let report = category_rollup(&rows, period(), &policy);
        assert_eq!(report.income.total, 100.0);
        assert_eq!(report.expenses.total, 60.0);
        assert_eq!(report.balance, 40.0);
    }

    #[test]
    fn test_member_paid_expenses_excluded() {
        let policy = FinancePolicy::default();
        let rows = vec![
            row("Despesas Pagas pelo Irmão", CategoryType::Expense, 300.0, EntryStatus::Paid, PaymentMethod::Pix),
            row("Ágapes", CategoryType::Expense, 100.0, EntryStatus::Paid, PaymentMethod::Pix),
        ];
        let report = category_rollup(&rows, period(), &policy);
        assert_eq!(report.expenses.total, 100.0);
        assert_eq!(report.expenses.categories.len(), 1);
        assert_eq!(report.expenses.categories[0].pct, 100.0);
    }

    #[test]
    fn test_parent_rollup_and_percentages() {
        let mut rent = row("Aluguel", CategoryType::Expense, 300.0, EntryStatus::Paid, PaymentMethod::Pix);
        rent.root = "Administrativas".to_string();
        let mut power = row("Água e Luz", CategoryType::Expense, 100.0, EntryStatus::Paid, PaymentMethod::Pix);
        power.root = "Administrativas".to_string();
        let food = row("Ágapes", CategoryType::Expense, 100.0, EntryStatus::Paid, PaymentMethod::Pix);
        let report = category_rollup(&[rent, power, food], period(), &FinancePolicy::default());

        let cats: Vec<(&str, f64)> = report
            .expenses
            .categories
            .iter()
            .map(|i| (i.name.as_str(), i.pct))
            .collect();
        assert_eq!(cats, vec![("Aluguel", 60.0), ("Ágapes", 20.0), ("Água e Luz", 20.0)]);

        let parents: Vec<(&str, f64)> = report
            .expenses
            .parents
            .iter()
            .map(|i| (i.name.as_str(), i.pct))
            .collect();
        assert_eq!(parents, vec![("Administrativas", 80.0), ("Ágapes", 20.0)]);
    }

    #[test]
    fn test_cashflow_running_balance() {
        let mut feb = row("Mensalidades", CategoryType::Income, 500.0, EntryStatus::Paid, PaymentMethod::Pix);
        feb.date = d(2024, 2, 5);
        let mut feb_out = row("Aluguel", CategoryType::Expense, 200.0, EntryStatus::Paid, PaymentMethod::Pix);
        feb_out.date = d(2024, 2, 20);
        let mut may_out = row("Aluguel", CategoryType::Expense, 400.0, EntryStatus::Paid, PaymentMethod::Pix);
        may_out.date = d(2024, 5, 20);
        let mut boxed = row("Tronco de Beneficência", CategoryType::Income, 999.0, EntryStatus::Paid, PaymentMethod::Cash);
        boxed.date = d(2024, 5, 1);

        let report = cashflow(&[feb, feb_out, may_out, boxed], 2024, &FinancePolicy::default());
        assert_eq!(report.months.len(), 2);
        assert_eq!(report.months[0].month, 2);
        assert_eq!(report.months[0].net, 300.0);
        assert_eq!(report.months[1].month, 5);
        assert_eq!(report.months[1].inflows, 0.0);
        assert_eq!(report.months[1].running_balance, -100.0);
    }

    #[test]
    fn test_get_finance_from_db() {
        let (_dir, conn) = test_db();
        let entry = |category: &str, amount: f64, paid: Option<NaiveDate>, method: PaymentMethod| NewEntry {
            description: "x".to_string(),
            amount,
            due_date: d(2024, 3, 1),
            paid_date: paid,
            category: category.to_string(),
            payment_method: method,
            member: None,
        };
        add_entry(&conn, &entry("Mensalidades", 100.0, Some(d(2024, 3, 2)), PaymentMethod::Pix)).unwrap();
        add_entry(&conn, &entry("Mensalidades", 50.0, Some(d(2024, 3, 3)), PaymentMethod::Cash)).unwrap();
        add_entry(&conn, &entry("Joias", 150.0, None, PaymentMethod::Pix)).unwrap();
        add_entry(&conn, &entry("Aluguel", 90.0, Some(d(2024, 3, 5)), PaymentMethod::Transfer)).unwrap();

        let report = get_finance(&conn, Period::new(2024, Some(3)).unwrap(), &FinancePolicy::default()).unwrap();
        assert_eq!(report.income.total, 150.0);
        assert_eq!(report.income.categories[0].name, "Mensalidades");
        assert_eq!(report.income.categories[0].pct, 100.0);
        assert_eq!(report.expenses.parents[0].name, "Administrativas");
        assert_eq!(report.balance, 60.0);
    }

    #[test]
    fn test_overdue_groups_by_member() {
        let (_dir, conn) = test_db();
        add_member(&conn, &NewMember { name: "Fábio".to_string(), ..Default::default() }).unwrap();
        let dues = |amount: f64, due: NaiveDate, member: Option<&str>| NewEntry {
            description: "Mensalidade".to_string(),
            amount,
            due_date: due,
            paid_date: None,
            category: "Mensalidades".to_string(),
            payment_method: PaymentMethod::Pix,
            member: member.map(str::to_string),
        };
        add_entry(&conn, &dues(100.0, d(2024, 1, 10), Some("Fábio"))).unwrap();
        add_entry(&conn, &dues(100.0, d(2024, 2, 10), Some("Fábio"))).unwrap();
        add_entry(&conn, &dues(40.0, d(2024, 2, 10), None)).unwrap();
        add_entry(&conn, &dues(100.0, d(2024, 4, 10), Some("Fábio"))).unwrap();
        // Unpaid bills are not dues.
        let rent = NewEntry {
            category: "Aluguel".to_string(),
            ..dues(900.0, d(2024, 2, 5), None)
        };
        add_entry(&conn, &rent).unwrap();

        let report = get_overdue(&conn, d(2024, 3, 1)).unwrap();
        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.entries[0].days_late, 51);
        assert_eq!(report.total, 240.0);
        assert_eq!(report.by_member[0], ("Fábio".to_string(), 200.0));
        assert_eq!(report.by_member[1], (String::new(), 40.0));
    }

    #[test]
    fn test_period_validation_and_display() {
        assert!(Period::new(2024, Some(13)).is_err());
        assert_eq!(Period::new(2024, Some(3)).unwrap().to_string(), "03/2024");
        assert_eq!(period().to_string(), "2024");
    }
}
