// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Rule-based budgeting advice.
//!
//! Each rule looks at the month's figures on its own and contributes at most
//! one advisory. Rule order is display order. The upcoming-bills rule uses a
//! rolling window from "now", not the reporting month.

use crate::commands::bills::upcoming_unpaid;
use crate::commands::overview::{MonthFigures, month_figures, ratio};
use crate::config::AppConfig;
use crate::error::FinanceResult;
use crate::models::Bill;
use crate::period::{Period, resolve_month};
use crate::utils::{fmt_money, fmt_pct, maybe_print_json, pretty_table};
use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

pub const FIXED_SHARE_LIMIT: Decimal = Decimal::from_parts(5, 0, 0, false, 1);
pub const VARIABLE_SHARE_LIMIT: Decimal = Decimal::from_parts(3, 0, 0, false, 1);
pub const TOP_CATEGORY_SHARE_LIMIT: Decimal = Decimal::from_parts(3, 0, 0, false, 1);
pub const UPCOMING_WINDOW_DAYS: i64 = 7;

pub fn handle(conn: &Connection, cfg: &AppConfig, m: &clap::ArgMatches) -> Result<()> {
    let owner = cfg.require_owner(conn)?;
    let month = m.get_one::<String>("month").map(|s| s.as_str());
    let report = financial_advice(conn, owner, month)?;
    if maybe_print_json(m.get_flag("json"), m.get_flag("jsonl"), &report)? {
        return Ok(());
    }
    println!("Advice for {}", report.period.month);
    if report.advices.is_empty() {
        println!("No advice this month. Keep it up.");
        return Ok(());
    }
    let rows = report
        .advices
        .into_iter()
        .map(|a| vec![a.severity.as_str().to_string(), a.title, a.message])
        .collect();
    println!("{}", pretty_table(&["Severity", "Title", "Message"], rows));
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Alert,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Alert => "alert",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Advice {
    pub id: &'static str,
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviceTotals {
    pub income: Decimal,
    pub expense: Decimal,
    pub balance: Decimal,
    pub fixed_expenses: Decimal,
    pub variable_expenses: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdviceReport {
    pub period: Period,
    pub totals: AdviceTotals,
    pub advices: Vec<Advice>,
}

impl AdviceReport {
    pub fn find(&self, id: &str) -> Option<&Advice> {
        self.advices.iter().find(|a| a.id == id)
    }
}

pub fn financial_advice(
    conn: &Connection,
    owner: i64,
    month: Option<&str>,
) -> FinanceResult<AdviceReport> {
    financial_advice_at(conn, owner, month, Local::now().naive_local())
}

/// Advice for `month` (default: the month containing `now`).
pub fn financial_advice_at(
    conn: &Connection,
    owner: i64,
    month: Option<&str>,
    now: NaiveDateTime,
) -> FinanceResult<AdviceReport> {
    let today = now.date();
    let period = resolve_month(month, today)?.period();
    let figures = month_figures(conn, owner, period)?;
    let upcoming = upcoming_unpaid(conn, owner, today, UPCOMING_WINDOW_DAYS)?;
    let advices = evaluate(&figures, &upcoming);
    Ok(AdviceReport {
        period,
        totals: AdviceTotals {
            income: figures.income,
            expense: figures.expense,
            balance: figures.balance(),
            fixed_expenses: figures.fixed_expenses,
            variable_expenses: figures.variable_expenses,
        },
        advices,
    })
}

/// Run every rule in display order.
pub fn evaluate(figures: &MonthFigures, upcoming: &[Bill]) -> Vec<Advice> {
    [
        no_income(figures),
        high_fixed(figures),
        high_variable(figures),
        negative_balance(figures),
        top_category(figures),
        upcoming_bills(upcoming),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn no_income(f: &MonthFigures) -> Option<Advice> {
    if f.income > Decimal::ZERO || f.expense <= Decimal::ZERO {
        return None;
    }
    Some(Advice {
        id: "no-income",
        severity: Severity::Info,
        title: "No income recorded".into(),
        message: format!(
            "You recorded {} in expenses for {} but no income. Add your income to get meaningful ratios.",
            fmt_money(&f.expense),
            f.period.month
        ),
    })
}

fn high_fixed(f: &MonthFigures) -> Option<Advice> {
    if f.income <= Decimal::ZERO || f.fixed_expenses <= f.income * FIXED_SHARE_LIMIT {
        return None;
    }
    Some(Advice {
        id: "high-fixed",
        severity: Severity::Warning,
        title: "High fixed expenses".into(),
        message: format!(
            "Fixed expenses take {} of your income, above the {} mark. Review rent, subscriptions and contracts.",
            fmt_pct(&ratio(f.fixed_expenses, f.income)),
            fmt_pct(&FIXED_SHARE_LIMIT)
        ),
    })
}

fn high_variable(f: &MonthFigures) -> Option<Advice> {
    if f.income <= Decimal::ZERO || f.variable_expenses <= f.income * VARIABLE_SHARE_LIMIT {
        return None;
    }
    Some(Advice {
        id: "high-variable",
        severity: Severity::Warning,
        title: "High variable expenses".into(),
        message: format!(
            "Variable expenses take {} of your income, above the {} mark. Day-to-day spending is worth a closer look.",
            fmt_pct(&ratio(f.variable_expenses, f.income)),
            fmt_pct(&VARIABLE_SHARE_LIMIT)
        ),
    })
}

fn negative_balance(f: &MonthFigures) -> Option<Advice> {
    let balance = f.balance();
    if balance >= Decimal::ZERO {
        return None;
    }
    Some(Advice {
        id: "negative-balance",
        severity: Severity::Alert,
        title: "Negative balance".into(),
        message: format!(
            "You spent {} more than you earned in {}.",
            fmt_money(&balance.abs()),
            f.period.month
        ),
    })
}

fn top_category(f: &MonthFigures) -> Option<Advice> {
    if f.expense <= Decimal::ZERO {
        return None;
    }
    let top = f
        .by_category
        .categories
        .iter()
        .filter(|c| c.expense > Decimal::ZERO)
        .max_by(|a, b| a.expense.cmp(&b.expense).then_with(|| b.name.cmp(&a.name)))?;
    if top.expense <= f.expense * TOP_CATEGORY_SHARE_LIMIT {
        return None;
    }
    Some(Advice {
        id: "top-category",
        severity: Severity::Info,
        title: "Dominant expense category".into(),
        message: format!(
            "'{}' accounts for {} of your expenses ({}).",
            top.name,
            fmt_pct(&ratio(top.expense, f.expense)),
            fmt_money(&top.expense)
        ),
    })
}

fn upcoming_bills(upcoming: &[Bill]) -> Option<Advice> {
    let due: Vec<&Bill> = upcoming.iter().filter(|b| !b.paid).collect();
    if due.is_empty() {
        return None;
    }
    let total: Decimal = due.iter().map(|b| b.amount).sum();
    Some(Advice {
        id: "upcoming-bills",
        severity: Severity::Info,
        title: "Upcoming bills".into(),
        message: format!(
            "{} unpaid bill(s) totalling {} are due in the next {} days.",
            due.len(),
            fmt_money(&total),
            UPCOMING_WINDOW_DAYS
        ),
    })
}
