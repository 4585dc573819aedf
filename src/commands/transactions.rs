// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::AppConfig;
use crate::error::{FinanceError, FinanceResult};
use crate::models::{CategoryKind, Transaction, TxType};
use crate::utils::{
    decimal_col, ensure_category_owned, ensure_positive, fmt_money, maybe_print_json,
    optional_text, parse_date, parse_decimal, pretty_table,
};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

pub fn handle(conn: &Connection, cfg: &AppConfig, m: &clap::ArgMatches) -> Result<()> {
    let owner = cfg.require_owner(conn)?;
    match m.subcommand() {
        Some(("add", sub)) => add(conn, owner, sub)?,
        Some(("list", sub)) => list(conn, owner, sub)?,
        Some(("edit", sub)) => edit(conn, owner, sub)?,
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            delete_transaction(conn, owner, id)?;
            println!("Removed transaction {}", id);
        }
        Some(("purge", sub)) => {
            let from = parse_date(sub.get_one::<String>("from").unwrap())?;
            let to = parse_date(sub.get_one::<String>("to").unwrap())?;
            let n = delete_in_period(conn, owner, from, to)?;
            println!("Removed {} transaction(s) between {} and {}", n, from, to);
        }
        Some(("summary", sub)) => {
            let (from, to) = date_range(sub)?;
            let s = summary(conn, owner, from, to)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &s)? {
                let data = vec![vec![
                    fmt_money(&s.total_income),
                    fmt_money(&s.total_expense),
                    fmt_money(&s.balance),
                ]];
                println!("{}", pretty_table(&["Income", "Expense", "Balance"], data));
            }
        }
        Some(("by-category", sub)) => {
            let (from, to) = date_range(sub)?;
            let s = summary_by_category(conn, owner, from, to)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &s)? {
                let mut data: Vec<Vec<String>> = s
                    .categories
                    .iter()
                    .map(|c| {
                        vec![
                            c.name.clone(),
                            c.kind.to_string(),
                            fmt_money(&c.income),
                            fmt_money(&c.expense),
                        ]
                    })
                    .collect();
                data.push(vec![
                    "(fixed / variable / income)".into(),
                    String::new(),
                    fmt_money(&s.by_kind.income),
                    format!(
                        "{} / {}",
                        fmt_money(&s.by_kind.fixed),
                        fmt_money(&s.by_kind.variable)
                    ),
                ]);
                println!(
                    "{}",
                    pretty_table(&["Category", "Kind", "Income", "Expense"], data)
                );
            }
        }
        _ => {}
    }
    Ok(())
}

fn date_range(sub: &clap::ArgMatches) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
    let from = sub.get_one::<String>("from").map(|s| parse_date(s)).transpose()?;
    let to = sub.get_one::<String>("to").map(|s| parse_date(s)).transpose()?;
    Ok((from, to))
}

fn add(conn: &Connection, owner: i64, sub: &clap::ArgMatches) -> Result<()> {
    let new = NewTransaction {
        amount: parse_decimal(sub.get_one::<String>("amount").unwrap())?,
        r#type: sub.get_one::<String>("type").unwrap().parse()?,
        description: optional_text(sub.get_one::<String>("desc").map(|s| s.as_str())),
        occurred_on: parse_date(sub.get_one::<String>("date").unwrap())?,
        category_id: sub.get_one::<i64>("category").copied(),
    };
    let t = create_transaction(conn, owner, &new)?;
    println!(
        "Recorded {} {} on {} (id {})",
        t.r#type, t.amount, t.occurred_on, t.id
    );
    Ok(())
}

fn list(conn: &Connection, owner: i64, sub: &clap::ArgMatches) -> Result<()> {
    let (from, to) = date_range(sub)?;
    let filter = TransactionFilter {
        from,
        to,
        r#type: sub
            .get_one::<String>("type")
            .map(|s| s.parse::<TxType>())
            .transpose()?,
        limit: sub.get_one::<usize>("limit").copied(),
    };
    let data = list_transactions(conn, owner, &filter)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|t| {
                vec![
                    t.id.to_string(),
                    t.occurred_on.to_string(),
                    t.r#type.to_string(),
                    fmt_money(&t.amount),
                    t.category_id.map(|c| c.to_string()).unwrap_or_default(),
                    t.description.clone().unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Date", "Type", "Amount", "Category", "Description"],
                rows
            )
        );
    }
    Ok(())
}

fn edit(conn: &Connection, owner: i64, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let category_id = if sub.get_flag("clear_category") {
        Some(None)
    } else {
        sub.get_one::<i64>("category").map(|c| Some(*c))
    };
    let patch = TransactionPatch {
        amount: sub
            .get_one::<String>("amount")
            .map(|s| parse_decimal(s))
            .transpose()?,
        r#type: sub
            .get_one::<String>("type")
            .map(|s| s.parse::<TxType>())
            .transpose()?,
        description: sub
            .get_one::<String>("desc")
            .map(|s| optional_text(Some(s.as_str()))),
        occurred_on: sub
            .get_one::<String>("date")
            .map(|s| parse_date(s))
            .transpose()?,
        category_id,
    };
    let t = update_transaction(conn, owner, id, &patch)?;
    println!("Updated transaction {}", t.id);
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub amount: Decimal,
    pub r#type: TxType,
    pub description: Option<String>,
    pub occurred_on: NaiveDate,
    pub category_id: Option<i64>,
}

/// Partial update; `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default)]
pub struct TransactionPatch {
    pub amount: Option<Decimal>,
    pub r#type: Option<TxType>,
    pub description: Option<Option<String>>,
    pub occurred_on: Option<NaiveDate>,
    pub category_id: Option<Option<i64>>,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub r#type: Option<TxType>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotals {
    pub id: i64,
    pub name: String,
    pub kind: CategoryKind,
    pub income: Decimal,
    pub expense: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KindTotals {
    pub fixed: Decimal,
    pub variable: Decimal,
    pub income: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub categories: Vec<CategoryTotals>,
    pub by_kind: KindTotals,
}

const TX_COLUMNS: &str = "id, owner_id, amount, type, description, occurred_on, category_id";

fn row_to_transaction(r: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: r.get(0)?,
        owner_id: r.get(1)?,
        amount: decimal_col(r, 2)?,
        r#type: r.get(3)?,
        description: r.get(4)?,
        occurred_on: r.get(5)?,
        category_id: r.get(6)?,
    })
}

/// Append inclusive date bounds on `column` to a WHERE clause.
fn push_range(
    sql: &mut String,
    args: &mut Vec<Value>,
    column: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) {
    if let Some(f) = from {
        args.push(Value::Text(f.to_string()));
        sql.push_str(&format!(" AND {} >= ?{}", column, args.len()));
    }
    if let Some(t) = to {
        args.push(Value::Text(t.to_string()));
        sql.push_str(&format!(" AND {} <= ?{}", column, args.len()));
    }
}

pub fn create_transaction(
    conn: &Connection,
    owner: i64,
    new: &NewTransaction,
) -> FinanceResult<Transaction> {
    let amount = ensure_positive(new.amount)?;
    ensure_category_owned(conn, owner, new.category_id)?;
    let description = optional_text(new.description.as_deref());
    conn.execute(
        "INSERT INTO transactions(owner_id, amount, type, description, occurred_on, category_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            owner,
            amount.to_string(),
            new.r#type,
            description,
            new.occurred_on,
            new.category_id
        ],
    )?;
    Ok(Transaction {
        id: conn.last_insert_rowid(),
        owner_id: owner,
        amount,
        r#type: new.r#type,
        description,
        occurred_on: new.occurred_on,
        category_id: new.category_id,
    })
}

/// Newest first.
pub fn list_transactions(
    conn: &Connection,
    owner: i64,
    filter: &TransactionFilter,
) -> FinanceResult<Vec<Transaction>> {
    let mut sql = format!("SELECT {} FROM transactions WHERE owner_id = ?1", TX_COLUMNS);
    let mut args = vec![Value::Integer(owner)];
    push_range(&mut sql, &mut args, "occurred_on", filter.from, filter.to);
    if let Some(t) = filter.r#type {
        args.push(Value::Text(t.as_str().to_string()));
        sql.push_str(&format!(" AND type = ?{}", args.len()));
    }
    sql.push_str(" ORDER BY occurred_on DESC, id DESC");
    if let Some(limit) = filter.limit {
        args.push(Value::Integer(limit as i64));
        sql.push_str(&format!(" LIMIT ?{}", args.len()));
    }
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(args), row_to_transaction)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn get_transaction(conn: &Connection, owner: i64, id: i64) -> FinanceResult<Transaction> {
    conn.query_row(
        &format!(
            "SELECT {} FROM transactions WHERE id = ?1 AND owner_id = ?2",
            TX_COLUMNS
        ),
        params![id, owner],
        row_to_transaction,
    )
    .optional()?
    .ok_or_else(|| FinanceError::not_found("Transaction", id))
}

pub fn update_transaction(
    conn: &Connection,
    owner: i64,
    id: i64,
    patch: &TransactionPatch,
) -> FinanceResult<Transaction> {
    let mut t = get_transaction(conn, owner, id)?;
    if (patch.amount.is_some()
        || patch.r#type.is_some()
        || patch.description.is_some()
        || patch.category_id.is_some())
        && backs_paid_bill(conn, id)?
    {
        return Err(FinanceError::Conflict(format!(
            "Transaction {} records a bill payment; only its date can change",
            id
        )));
    }
    if let Some(amount) = patch.amount {
        t.amount = ensure_positive(amount)?;
    }
    if let Some(ty) = patch.r#type {
        t.r#type = ty;
    }
    if let Some(desc) = &patch.description {
        t.description = optional_text(desc.as_deref());
    }
    if let Some(date) = patch.occurred_on {
        t.occurred_on = date;
    }
    if let Some(cat) = patch.category_id {
        ensure_category_owned(conn, owner, cat)?;
        t.category_id = cat;
    }
    conn.execute(
        "UPDATE transactions SET amount=?1, type=?2, description=?3, occurred_on=?4, category_id=?5
         WHERE id=?6 AND owner_id=?7",
        params![
            t.amount.to_string(),
            t.r#type,
            t.description,
            t.occurred_on,
            t.category_id,
            id,
            owner
        ],
    )?;
    Ok(t)
}

fn backs_paid_bill(conn: &Connection, id: i64) -> FinanceResult<bool> {
    let hit: Option<i64> = conn
        .query_row(
            "SELECT id FROM bills WHERE paid_transaction_id = ?1 LIMIT 1",
            params![id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(hit.is_some())
}

pub fn delete_transaction(conn: &Connection, owner: i64, id: i64) -> FinanceResult<()> {
    get_transaction(conn, owner, id)?;
    if backs_paid_bill(conn, id)? {
        return Err(FinanceError::Conflict(format!(
            "Transaction {} records a bill payment and cannot be deleted",
            id
        )));
    }
    conn.execute(
        "DELETE FROM transactions WHERE id=?1 AND owner_id=?2",
        params![id, owner],
    )?;
    Ok(())
}

/// Remove every transaction dated within `[from, to]`, except bill payments.
pub fn delete_in_period(
    conn: &Connection,
    owner: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> FinanceResult<usize> {
    if from > to {
        return Err(FinanceError::validation(format!(
            "Start date {} is after end date {}",
            from, to
        )));
    }
    let n = conn.execute(
        "DELETE FROM transactions
         WHERE owner_id = ?1 AND occurred_on >= ?2 AND occurred_on <= ?3
           AND id NOT IN (SELECT paid_transaction_id FROM bills WHERE paid_transaction_id IS NOT NULL)",
        params![owner, from, to],
    )?;
    tracing::info!(owner, %from, %to, removed = n, "purged transactions");
    Ok(n)
}

/// Income and expense sums over an inclusive date range.
pub fn summary(
    conn: &Connection,
    owner: i64,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> FinanceResult<Summary> {
    let mut sql = String::from("SELECT type, amount FROM transactions WHERE owner_id = ?1");
    let mut args = vec![Value::Integer(owner)];
    push_range(&mut sql, &mut args, "occurred_on", from, to);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(rusqlite::params_from_iter(args))?;
    let mut total_income = Decimal::ZERO;
    let mut total_expense = Decimal::ZERO;
    while let Some(r) = rows.next()? {
        let ty: TxType = r.get(0)?;
        let amount = decimal_col(r, 1)?;
        match ty {
            TxType::Income => total_income += amount,
            TxType::Expense => total_expense += amount,
        }
    }
    Ok(Summary {
        total_income,
        total_expense,
        balance: total_income - total_expense,
    })
}

/// Categorised transactions grouped by category and type.
///
/// Expense sums roll up into `fixed` or `variable` by the category's kind;
/// an expense filed under an Income-kind category lands in neither. Income
/// sums roll up into `income` whatever the kind. Uncategorised rows are left
/// out here but still count in [`summary`].
pub fn summary_by_category(
    conn: &Connection,
    owner: i64,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> FinanceResult<CategorySummary> {
    let mut sql = String::from(
        "SELECT c.id, c.name, c.kind, t.type, t.amount
         FROM transactions t
         JOIN categories c ON c.id = t.category_id AND c.owner_id = t.owner_id
         WHERE t.owner_id = ?1",
    );
    let mut args = vec![Value::Integer(owner)];
    push_range(&mut sql, &mut args, "t.occurred_on", from, to);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(rusqlite::params_from_iter(args))?;

    let mut groups: BTreeMap<i64, CategoryTotals> = BTreeMap::new();
    let mut by_kind = KindTotals::default();
    while let Some(r) = rows.next()? {
        let id: i64 = r.get(0)?;
        let kind: CategoryKind = r.get(2)?;
        let ty: TxType = r.get(3)?;
        let amount = decimal_col(r, 4)?;
        let entry = match groups.entry(id) {
            std::collections::btree_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::btree_map::Entry::Vacant(e) => e.insert(CategoryTotals {
                id,
                name: r.get(1)?,
                kind,
                income: Decimal::ZERO,
                expense: Decimal::ZERO,
            }),
        };
        match ty {
            TxType::Income => {
                entry.income += amount;
                by_kind.income += amount;
            }
            TxType::Expense => {
                entry.expense += amount;
                match kind {
                    CategoryKind::FixedExpense => by_kind.fixed += amount,
                    CategoryKind::VariableExpense => by_kind.variable += amount,
                    CategoryKind::Income => {}
                }
            }
        }
    }
    let mut categories: Vec<CategoryTotals> = groups.into_values().collect();
    categories.sort_by(|a, b| b.expense.cmp(&a.expense).then_with(|| a.name.cmp(&b.name)));
    Ok(CategorySummary {
        categories,
        by_kind,
    })
}
