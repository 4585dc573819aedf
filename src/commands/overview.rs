// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Monthly overview: totals, the fixed/variable split, derived ratios and
//! the bills due in the month.
//!
//! Totals classify strictly by transaction type. Category kind is only
//! consulted for the fixed/variable split, so an expense filed under an
//! Income-kind category counts in `expense` but in neither bucket.

use crate::commands::bills::{BillFilter, list_bills};
use crate::commands::transactions::{CategorySummary, summary, summary_by_category};
use crate::config::AppConfig;
use crate::error::FinanceResult;
use crate::models::Bill;
use crate::period::{Period, YearMonth};
use crate::utils::{fmt_money, fmt_pct, maybe_print_json, pretty_table};
use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

/// Scale kept on derived ratios.
const RATIO_DP: u32 = 4;

pub fn handle(conn: &Connection, cfg: &AppConfig, m: &clap::ArgMatches) -> Result<()> {
    let owner = cfg.require_owner(conn)?;
    let month = m.get_one::<String>("month").unwrap();
    let ov = month_overview(conn, owner, month)?;
    if maybe_print_json(m.get_flag("json"), m.get_flag("jsonl"), &ov)? {
        return Ok(());
    }
    let t = &ov.totals;
    let rows = vec![
        vec!["Income".into(), fmt_money(&t.income)],
        vec!["Expense".into(), fmt_money(&t.expense)],
        vec!["Balance".into(), fmt_money(&t.balance)],
        vec!["Fixed expenses".into(), fmt_money(&t.fixed_expenses)],
        vec!["Variable expenses".into(), fmt_money(&t.variable_expenses)],
        vec!["Savings rate".into(), fmt_pct(&t.savings_rate)],
        vec!["Fixed / income".into(), fmt_pct(&t.fixed_pct)],
        vec!["Variable / income".into(), fmt_pct(&t.variable_pct)],
        vec!["Bills due".into(), fmt_money(&ov.bills.total_due)],
        vec!["Bills paid".into(), fmt_money(&ov.bills.total_paid)],
        vec!["Bills open".into(), fmt_money(&ov.bills.total_open)],
        vec![
            "Cash after open bills".into(),
            fmt_money(&t.cash_available_after_open_bills),
        ],
    ];
    println!("Overview for {}", ov.period.month);
    println!("{}", pretty_table(&["Figure", "Value"], rows));
    if !ov.bills.items.is_empty() {
        let items = ov
            .bills
            .items
            .iter()
            .map(|b| {
                vec![
                    b.id.to_string(),
                    b.due_date.to_string(),
                    b.description.clone(),
                    fmt_money(&b.amount),
                    if b.paid { "yes".into() } else { "no".into() },
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["ID", "Due", "Description", "Amount", "Paid"], items)
        );
    }
    Ok(())
}

/// Money fields are exact sums. `savingsRate`, `fixedPct` and `variablePct` are
/// rounded to four decimal places and are zero when there is no income.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub income: Decimal,
    pub expense: Decimal,
    pub balance: Decimal,
    pub fixed_expenses: Decimal,
    pub variable_expenses: Decimal,
    pub savings_rate: Decimal,
    pub fixed_pct: Decimal,
    pub variable_pct: Decimal,
    pub cash_available_after_open_bills: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewBill {
    pub id: i64,
    pub description: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub paid: bool,
    pub paid_at: Option<NaiveDateTime>,
}

impl From<&Bill> for OverviewBill {
    fn from(b: &Bill) -> Self {
        Self {
            id: b.id,
            description: b.description.clone(),
            amount: b.amount,
            due_date: b.due_date,
            paid: b.paid,
            paid_at: b.paid_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillsBlock {
    pub total_due: Decimal,
    pub total_paid: Decimal,
    pub total_open: Decimal,
    pub items: Vec<OverviewBill>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub period: Period,
    pub totals: Totals,
    pub bills: BillsBlock,
}

/// Ledger figures for one period, shared with the advice rules.
#[derive(Debug, Clone)]
pub struct MonthFigures {
    pub period: Period,
    pub income: Decimal,
    pub expense: Decimal,
    pub fixed_expenses: Decimal,
    pub variable_expenses: Decimal,
    pub by_category: CategorySummary,
}

impl MonthFigures {
    pub fn balance(&self) -> Decimal {
        self.income - self.expense
    }
}

/// `part / income`, or zero when there is no income to divide by.
pub fn ratio(part: Decimal, income: Decimal) -> Decimal {
    if income <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    part.checked_div(income)
        .map(|r| r.round_dp(RATIO_DP).normalize())
        .unwrap_or(Decimal::ZERO)
}

pub fn month_figures(conn: &Connection, owner: i64, period: Period) -> FinanceResult<MonthFigures> {
    let (from, to) = (Some(period.from_date()), Some(period.to_date()));
    let totals = summary(conn, owner, from, to)?;
    let by_category = summary_by_category(conn, owner, from, to)?;
    tracing::debug!(
        owner,
        month = %period.month,
        income = %totals.total_income,
        expense = %totals.total_expense,
        "aggregated month"
    );
    Ok(MonthFigures {
        period,
        income: totals.total_income,
        expense: totals.total_expense,
        fixed_expenses: by_category.by_kind.fixed,
        variable_expenses: by_category.by_kind.variable,
        by_category,
    })
}

pub fn month_overview(conn: &Connection, owner: i64, month: &str) -> FinanceResult<Overview> {
    let period = YearMonth::parse(month)?.period();
    let figures = month_figures(conn, owner, period)?;

    let bills = list_bills(
        conn,
        owner,
        &BillFilter {
            status: None,
            from: Some(period.from_date()),
            to: Some(period.to_date()),
        },
    )?;
    let mut total_due = Decimal::ZERO;
    let mut total_paid = Decimal::ZERO;
    let mut total_open = Decimal::ZERO;
    for b in &bills {
        total_due += b.amount;
        if b.paid {
            total_paid += b.amount;
        } else {
            total_open += b.amount;
        }
    }

    let balance = figures.balance();
    let totals = Totals {
        income: figures.income,
        expense: figures.expense,
        balance,
        fixed_expenses: figures.fixed_expenses,
        variable_expenses: figures.variable_expenses,
        savings_rate: ratio(balance, figures.income),
        fixed_pct: ratio(figures.fixed_expenses, figures.income),
        variable_pct: ratio(figures.variable_expenses, figures.income),
        cash_available_after_open_bills: balance - total_open,
    };
    Ok(Overview {
        period,
        totals,
        bills: BillsBlock {
            total_due,
            total_paid,
            total_open,
            items: bills.iter().map(OverviewBill::from).collect(),
        },
    })
}
