// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::templates::list_templates;
use crate::commands::transactions::{NewTransaction, create_transaction};
use crate::config::AppConfig;
use crate::error::{FinanceError, FinanceResult};
use crate::models::{Bill, Recurrence, TxType};
use crate::period::YearMonth;
use crate::utils::{
    decimal_col, ensure_category_owned, ensure_positive, ensure_reminder_days, fmt_money,
    maybe_print_json, parse_date, parse_decimal, pretty_table, required_text,
};
use anyhow::Result;
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, Timelike};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use rust_decimal::Decimal;

pub const DEFAULT_REMINDER_DAYS: u32 = 1;

pub fn handle(conn: &mut Connection, cfg: &AppConfig, m: &clap::ArgMatches) -> Result<()> {
    let owner = cfg.require_owner(conn)?;
    match m.subcommand() {
        Some(("add", sub)) => {
            let new = NewBill {
                description: sub.get_one::<String>("desc").unwrap().to_string(),
                amount: parse_decimal(sub.get_one::<String>("amount").unwrap())?,
                due_date: parse_date(sub.get_one::<String>("due").unwrap())?,
                category_id: sub.get_one::<i64>("category").copied(),
                recurrence: sub
                    .get_one::<String>("recurrence")
                    .map(|s| s.parse::<Recurrence>())
                    .transpose()?,
                reminder_days: sub.get_one::<u32>("remind_days").copied(),
            };
            let b = create_bill(conn, owner, &new)?;
            println!(
                "Added bill '{}' for {} due {} (id {})",
                b.description, b.amount, b.due_date, b.id
            );
        }
        Some(("list", sub)) => {
            let bills = if sub.get_flag("remind") {
                bills_due_for_reminder(conn, owner, Local::now().date_naive())?
            } else {
                let filter = BillFilter {
                    status: sub
                        .get_one::<String>("status")
                        .map(|s| s.parse::<BillStatus>())
                        .transpose()?,
                    from: sub.get_one::<String>("from").map(|s| parse_date(s)).transpose()?,
                    to: sub.get_one::<String>("to").map(|s| parse_date(s)).transpose()?,
                };
                list_bills(conn, owner, &filter)?
            };
            print_bills(sub, &bills)?;
        }
        Some(("show", sub)) => {
            let b = get_bill(conn, owner, *sub.get_one::<i64>("id").unwrap())?;
            print_bills(sub, std::slice::from_ref(&b))?;
        }
        Some(("edit", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let category_id = if sub.get_flag("clear_category") {
                Some(None)
            } else {
                sub.get_one::<i64>("category").map(|c| Some(*c))
            };
            let patch = BillPatch {
                description: sub.get_one::<String>("desc").cloned(),
                amount: sub
                    .get_one::<String>("amount")
                    .map(|s| parse_decimal(s))
                    .transpose()?,
                due_date: sub.get_one::<String>("due").map(|s| parse_date(s)).transpose()?,
                category_id,
                recurrence: sub
                    .get_one::<String>("recurrence")
                    .map(|s| s.parse::<Recurrence>())
                    .transpose()?,
                reminder_days: sub.get_one::<u32>("remind_days").copied(),
            };
            let b = update_bill(conn, owner, id, &patch)?;
            println!("Updated bill {}", b.id);
        }
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            delete_bill(conn, owner, id)?;
            println!("Removed bill {}", id);
        }
        Some(("pay", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let b = pay_bill(conn, owner, id)?;
            if !maybe_print_json(sub.get_flag("json"), false, &b)? {
                println!(
                    "Bill {} paid at {} (transaction {})",
                    b.id,
                    b.paid_at.map(|t| t.to_string()).unwrap_or_default(),
                    b.paid_transaction_id
                        .map(|t| t.to_string())
                        .unwrap_or_default()
                );
            }
        }
        Some(("generate", sub)) => {
            let month = sub.get_one::<String>("month").unwrap();
            let created = generate_bills_for_month(conn, owner, month)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &created)? {
                println!("Generated {} bill(s) for {}", created.len(), month.trim());
                if !created.is_empty() {
                    print_bills(sub, &created)?;
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn print_bills(sub: &clap::ArgMatches, bills: &[Bill]) -> Result<()> {
    let json = sub.try_get_one::<bool>("json").ok().flatten().copied().unwrap_or(false);
    let jsonl = sub.try_get_one::<bool>("jsonl").ok().flatten().copied().unwrap_or(false);
    if maybe_print_json(json, jsonl, &bills)? {
        return Ok(());
    }
    let rows = bills
        .iter()
        .map(|b| {
            vec![
                b.id.to_string(),
                b.due_date.to_string(),
                b.description.clone(),
                fmt_money(&b.amount),
                b.recurrence.to_string(),
                if b.paid { "yes".into() } else { "no".into() },
                b.paid_at.map(|t| t.to_string()).unwrap_or_default(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["ID", "Due", "Description", "Amount", "Recurrence", "Paid", "Paid At"],
            rows
        )
    );
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NewBill {
    pub description: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub category_id: Option<i64>,
    pub recurrence: Option<Recurrence>,
    pub reminder_days: Option<u32>,
}

/// Partial update; `Some(None)` clears the category.
#[derive(Debug, Clone, Default)]
pub struct BillPatch {
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub category_id: Option<Option<i64>>,
    pub recurrence: Option<Recurrence>,
    pub reminder_days: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillStatus {
    Paid,
    Unpaid,
}

impl std::str::FromStr for BillStatus {
    type Err = FinanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paid" => Ok(Self::Paid),
            "unpaid" | "open" => Ok(Self::Unpaid),
            other => Err(FinanceError::validation(format!(
                "Invalid bill status '{}', expected paid or unpaid",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BillFilter {
    pub status: Option<BillStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

const BILL_COLUMNS: &str = "id, owner_id, description, amount, due_date, category_id, recurrence, \
     reminder_days, paid, paid_at, paid_transaction_id, bill_template_id";

fn row_to_bill(r: &Row<'_>) -> rusqlite::Result<Bill> {
    Ok(Bill {
        id: r.get(0)?,
        owner_id: r.get(1)?,
        description: r.get(2)?,
        amount: decimal_col(r, 3)?,
        due_date: r.get(4)?,
        category_id: r.get(5)?,
        recurrence: r.get(6)?,
        reminder_days: r.get(7)?,
        paid: r.get(8)?,
        paid_at: r.get(9)?,
        paid_transaction_id: r.get(10)?,
        bill_template_id: r.get(11)?,
    })
}

pub fn create_bill(conn: &Connection, owner: i64, new: &NewBill) -> FinanceResult<Bill> {
    insert_bill(conn, owner, new, None)
}

fn insert_bill(
    conn: &Connection,
    owner: i64,
    new: &NewBill,
    template_id: Option<i64>,
) -> FinanceResult<Bill> {
    let description = required_text("Description", &new.description)?;
    let amount = ensure_positive(new.amount)?;
    let reminder_days = ensure_reminder_days(new.reminder_days.unwrap_or(DEFAULT_REMINDER_DAYS))?;
    let recurrence = new.recurrence.unwrap_or_default();
    ensure_category_owned(conn, owner, new.category_id)?;
    conn.execute(
        "INSERT INTO bills(owner_id, description, amount, due_date, category_id, recurrence, reminder_days, bill_template_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            owner,
            description,
            amount.to_string(),
            new.due_date,
            new.category_id,
            recurrence,
            reminder_days,
            template_id
        ],
    )?;
    Ok(Bill {
        id: conn.last_insert_rowid(),
        owner_id: owner,
        description,
        amount,
        due_date: new.due_date,
        category_id: new.category_id,
        recurrence,
        reminder_days,
        paid: false,
        paid_at: None,
        paid_transaction_id: None,
        bill_template_id: template_id,
    })
}

/// Ordered by due date ascending.
pub fn list_bills(conn: &Connection, owner: i64, filter: &BillFilter) -> FinanceResult<Vec<Bill>> {
    let mut sql = format!("SELECT {} FROM bills WHERE owner_id = ?1", BILL_COLUMNS);
    let mut args = vec![Value::Integer(owner)];
    match filter.status {
        Some(BillStatus::Paid) => sql.push_str(" AND paid = 1"),
        Some(BillStatus::Unpaid) => sql.push_str(" AND paid = 0"),
        None => {}
    }
    if let Some(f) = filter.from {
        args.push(Value::Text(f.to_string()));
        sql.push_str(&format!(" AND due_date >= ?{}", args.len()));
    }
    if let Some(t) = filter.to {
        args.push(Value::Text(t.to_string()));
        sql.push_str(&format!(" AND due_date <= ?{}", args.len()));
    }
    sql.push_str(" ORDER BY due_date ASC, id ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(args), row_to_bill)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn get_bill(conn: &Connection, owner: i64, id: i64) -> FinanceResult<Bill> {
    conn.query_row(
        &format!(
            "SELECT {} FROM bills WHERE id = ?1 AND owner_id = ?2",
            BILL_COLUMNS
        ),
        params![id, owner],
        row_to_bill,
    )
    .optional()?
    .ok_or_else(|| FinanceError::not_found("Bill", id))
}

/// Amount, description and category are frozen once a bill is paid, since
/// the backing transaction carries them.
pub fn update_bill(
    conn: &Connection,
    owner: i64,
    id: i64,
    patch: &BillPatch,
) -> FinanceResult<Bill> {
    let mut b = get_bill(conn, owner, id)?;
    if b.paid
        && (patch.amount.is_some() || patch.description.is_some() || patch.category_id.is_some())
    {
        return Err(FinanceError::Conflict(format!(
            "Bill {} is already paid; amount, description and category can no longer change",
            id
        )));
    }
    if let Some(desc) = &patch.description {
        b.description = required_text("Description", desc)?;
    }
    if let Some(amount) = patch.amount {
        b.amount = ensure_positive(amount)?;
    }
    if let Some(due) = patch.due_date {
        b.due_date = due;
    }
    if let Some(cat) = patch.category_id {
        ensure_category_owned(conn, owner, cat)?;
        b.category_id = cat;
    }
    if let Some(rec) = patch.recurrence {
        b.recurrence = rec;
    }
    if let Some(days) = patch.reminder_days {
        b.reminder_days = ensure_reminder_days(days)?;
    }
    conn.execute(
        "UPDATE bills SET description=?1, amount=?2, due_date=?3, category_id=?4, recurrence=?5, reminder_days=?6
         WHERE id=?7 AND owner_id=?8",
        params![
            b.description,
            b.amount.to_string(),
            b.due_date,
            b.category_id,
            b.recurrence,
            b.reminder_days,
            id,
            owner
        ],
    )?;
    Ok(b)
}

/// The payment transaction of a paid bill stays in the ledger.
pub fn delete_bill(conn: &Connection, owner: i64, id: i64) -> FinanceResult<()> {
    let n = conn.execute(
        "DELETE FROM bills WHERE id=?1 AND owner_id=?2",
        params![id, owner],
    )?;
    if n == 0 {
        return Err(FinanceError::not_found("Bill", id));
    }
    Ok(())
}

pub fn pay_bill(conn: &mut Connection, owner: i64, id: i64) -> FinanceResult<Bill> {
    pay_bill_at(conn, owner, id, Local::now().naive_local())
}

/// Mark a bill paid and record the matching expense, both or neither.
///
/// The paid flag is re-read under the write lock, so a second concurrent
/// request observes the first payment and returns it unchanged.
pub fn pay_bill_at(
    conn: &mut Connection,
    owner: i64,
    id: i64,
    now: NaiveDateTime,
) -> FinanceResult<Bill> {
    let now = now.with_nanosecond(0).unwrap_or(now);
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut bill = get_bill(&tx, owner, id)?;
    if bill.paid {
        tracing::debug!(bill = id, "bill already paid");
        return Ok(bill);
    }

    let payment = create_transaction(
        &tx,
        owner,
        &NewTransaction {
            amount: bill.amount,
            r#type: TxType::Expense,
            description: Some(bill.description.clone()),
            occurred_on: now.date(),
            category_id: bill.category_id,
        },
    )?;
    tx.execute(
        "UPDATE bills SET paid = 1, paid_at = ?1, paid_transaction_id = ?2
         WHERE id = ?3 AND owner_id = ?4 AND paid = 0",
        params![now, payment.id, id, owner],
    )?;
    tx.commit()?;

    bill.paid = true;
    bill.paid_at = Some(now);
    bill.paid_transaction_id = Some(payment.id);
    tracing::info!(bill = id, transaction = payment.id, amount = %bill.amount, "bill paid");
    Ok(bill)
}

/// Materialise one bill per active template for `month`.
///
/// Due days past the month's end are clamped to its last day. A template
/// that already has a bill dated inside the month is skipped, so repeated
/// calls only return what they created.
pub fn generate_bills_for_month(
    conn: &mut Connection,
    owner: i64,
    month: &str,
) -> FinanceResult<Vec<Bill>> {
    let ym = YearMonth::parse(month)?;
    let (first, last) = (ym.first_day(), ym.last_day());
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut created = Vec::new();
    for template in list_templates(&tx, owner)?.into_iter().filter(|t| t.active) {
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM bills
                 WHERE owner_id = ?1 AND bill_template_id = ?2 AND due_date >= ?3 AND due_date <= ?4
                 LIMIT 1",
                params![owner, template.id, first, last],
                |r| r.get(0),
            )
            .optional()?;
        if existing.is_some() {
            continue;
        }
        let bill = insert_bill(
            &tx,
            owner,
            &NewBill {
                description: template.description.clone(),
                amount: template.amount,
                due_date: ym.day_clamped(template.due_day),
                category_id: template.category_id,
                recurrence: Some(template.recurrence),
                reminder_days: Some(template.reminder_days),
            },
            Some(template.id),
        )?;
        created.push(bill);
    }
    tx.commit()?;
    tracing::info!(owner, month = %ym, created = created.len(), "generated bills");
    Ok(created)
}

/// Unpaid bills due within `[today, today + days]`.
pub fn upcoming_unpaid(
    conn: &Connection,
    owner: i64,
    today: NaiveDate,
    days: i64,
) -> FinanceResult<Vec<Bill>> {
    list_bills(
        conn,
        owner,
        &BillFilter {
            status: Some(BillStatus::Unpaid),
            from: Some(today),
            to: Some(today + Duration::days(days)),
        },
    )
}

/// Unpaid bills whose reminder window has opened but which are not yet overdue.
pub fn bills_due_for_reminder(
    conn: &Connection,
    owner: i64,
    today: NaiveDate,
) -> FinanceResult<Vec<Bill>> {
    let open = list_bills(
        conn,
        owner,
        &BillFilter {
            status: Some(BillStatus::Unpaid),
            from: Some(today),
            to: None,
        },
    )?;
    Ok(open
        .into_iter()
        .filter(|b| b.due_date - Duration::days(i64::from(b.reminder_days)) <= today)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses() {
        assert_eq!("PAID".parse::<BillStatus>().unwrap(), BillStatus::Paid);
        assert_eq!("open".parse::<BillStatus>().unwrap(), BillStatus::Unpaid);
        assert!("late".parse::<BillStatus>().unwrap_err().is_validation());
    }
}
