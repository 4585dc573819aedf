// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::bills::DEFAULT_REMINDER_DAYS;
use crate::config::AppConfig;
use crate::error::{FinanceError, FinanceResult};
use crate::models::{BillTemplate, Recurrence};
use crate::utils::{
    decimal_col, ensure_category_owned, ensure_due_day, ensure_positive, ensure_reminder_days,
    fmt_money, maybe_print_json, parse_decimal, pretty_table, required_text,
};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;

pub fn handle(conn: &Connection, cfg: &AppConfig, m: &clap::ArgMatches) -> Result<()> {
    let owner = cfg.require_owner(conn)?;
    match m.subcommand() {
        Some(("add", sub)) => {
            let new = NewTemplate {
                description: sub.get_one::<String>("desc").unwrap().to_string(),
                amount: parse_decimal(sub.get_one::<String>("amount").unwrap())?,
                category_id: sub.get_one::<i64>("category").copied(),
                due_day: *sub.get_one::<u32>("due_day").unwrap(),
                recurrence: sub
                    .get_one::<String>("recurrence")
                    .map(|s| s.parse::<Recurrence>())
                    .transpose()?,
                reminder_days: sub.get_one::<u32>("remind_days").copied(),
                active: !sub.get_flag("inactive"),
            };
            let t = create_template(conn, owner, &new)?;
            println!(
                "Added template '{}' for {} on day {} (id {})",
                t.description, t.amount, t.due_day, t.id
            );
        }
        Some(("list", sub)) => {
            let items = list_templates(conn, owner)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &items)? {
                let rows = items
                    .into_iter()
                    .map(|t| {
                        vec![
                            t.id.to_string(),
                            t.description,
                            fmt_money(&t.amount),
                            t.due_day.to_string(),
                            t.recurrence.to_string(),
                            if t.active { "yes".into() } else { "no".into() },
                            t.reminder_days.to_string(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(
                        &["ID", "Description", "Amount", "Due Day", "Recurrence", "Active", "Remind"],
                        rows
                    )
                );
            }
        }
        Some(("edit", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let active = if sub.get_flag("activate") {
                Some(true)
            } else if sub.get_flag("deactivate") {
                Some(false)
            } else {
                None
            };
            let category_id = if sub.get_flag("clear_category") {
                Some(None)
            } else {
                sub.get_one::<i64>("category").map(|c| Some(*c))
            };
            let patch = TemplatePatch {
                description: sub.get_one::<String>("desc").cloned(),
                amount: sub
                    .get_one::<String>("amount")
                    .map(|s| parse_decimal(s))
                    .transpose()?,
                category_id,
                due_day: sub.get_one::<u32>("due_day").copied(),
                recurrence: sub
                    .get_one::<String>("recurrence")
                    .map(|s| s.parse::<Recurrence>())
                    .transpose()?,
                active,
                reminder_days: sub.get_one::<u32>("remind_days").copied(),
            };
            let t = update_template(conn, owner, id, &patch)?;
            println!("Updated template {}", t.id);
        }
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            delete_template(conn, owner, id)?;
            println!("Removed template {}", id);
        }
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub description: String,
    pub amount: Decimal,
    pub category_id: Option<i64>,
    pub due_day: u32,
    pub recurrence: Option<Recurrence>,
    pub reminder_days: Option<u32>,
    pub active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TemplatePatch {
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub category_id: Option<Option<i64>>,
    pub due_day: Option<u32>,
    pub recurrence: Option<Recurrence>,
    pub active: Option<bool>,
    pub reminder_days: Option<u32>,
}

const TEMPLATE_COLUMNS: &str =
    "id, owner_id, description, amount, category_id, due_day, recurrence, active, reminder_days";

fn row_to_template(r: &Row<'_>) -> rusqlite::Result<BillTemplate> {
    Ok(BillTemplate {
        id: r.get(0)?,
        owner_id: r.get(1)?,
        description: r.get(2)?,
        amount: decimal_col(r, 3)?,
        category_id: r.get(4)?,
        due_day: r.get(5)?,
        recurrence: r.get(6)?,
        active: r.get(7)?,
        reminder_days: r.get(8)?,
    })
}

pub fn create_template(
    conn: &Connection,
    owner: i64,
    new: &NewTemplate,
) -> FinanceResult<BillTemplate> {
    let description = required_text("Description", &new.description)?;
    let amount = ensure_positive(new.amount)?;
    let due_day = ensure_due_day(new.due_day)?;
    let reminder_days = ensure_reminder_days(new.reminder_days.unwrap_or(DEFAULT_REMINDER_DAYS))?;
    let recurrence = new.recurrence.unwrap_or(Recurrence::Monthly);
    ensure_category_owned(conn, owner, new.category_id)?;
    conn.execute(
        "INSERT INTO bill_templates(owner_id, description, amount, category_id, due_day, recurrence, active, reminder_days)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            owner,
            description,
            amount.to_string(),
            new.category_id,
            due_day,
            recurrence,
            new.active,
            reminder_days
        ],
    )?;
    Ok(BillTemplate {
        id: conn.last_insert_rowid(),
        owner_id: owner,
        description,
        amount,
        category_id: new.category_id,
        due_day,
        recurrence,
        active: new.active,
        reminder_days,
    })
}

pub fn list_templates(conn: &Connection, owner: i64) -> FinanceResult<Vec<BillTemplate>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM bill_templates WHERE owner_id = ?1 ORDER BY due_day, id",
        TEMPLATE_COLUMNS
    ))?;
    let rows = stmt.query_map(params![owner], row_to_template)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn get_template(conn: &Connection, owner: i64, id: i64) -> FinanceResult<BillTemplate> {
    conn.query_row(
        &format!(
            "SELECT {} FROM bill_templates WHERE id = ?1 AND owner_id = ?2",
            TEMPLATE_COLUMNS
        ),
        params![id, owner],
        row_to_template,
    )
    .optional()?
    .ok_or_else(|| FinanceError::not_found("Bill template", id))
}

/// Changes apply to bills generated afterwards; existing bills are untouched.
pub fn update_template(
    conn: &Connection,
    owner: i64,
    id: i64,
    patch: &TemplatePatch,
) -> FinanceResult<BillTemplate> {
    let mut t = get_template(conn, owner, id)?;
    if let Some(desc) = &patch.description {
        t.description = required_text("Description", desc)?;
    }
    if let Some(amount) = patch.amount {
        t.amount = ensure_positive(amount)?;
    }
    if let Some(cat) = patch.category_id {
        ensure_category_owned(conn, owner, cat)?;
        t.category_id = cat;
    }
    if let Some(day) = patch.due_day {
        t.due_day = ensure_due_day(day)?;
    }
    if let Some(rec) = patch.recurrence {
        t.recurrence = rec;
    }
    if let Some(active) = patch.active {
        t.active = active;
    }
    if let Some(days) = patch.reminder_days {
        t.reminder_days = ensure_reminder_days(days)?;
    }
    conn.execute(
        "UPDATE bill_templates
         SET description=?1, amount=?2, category_id=?3, due_day=?4, recurrence=?5, active=?6, reminder_days=?7
         WHERE id=?8 AND owner_id=?9",
        params![
            t.description,
            t.amount.to_string(),
            t.category_id,
            t.due_day,
            t.recurrence,
            t.active,
            t.reminder_days,
            id,
            owner
        ],
    )?;
    Ok(t)
}

/// Generated bills survive with their template link cleared.
pub fn delete_template(conn: &Connection, owner: i64, id: i64) -> FinanceResult<()> {
    let n = conn.execute(
        "DELETE FROM bill_templates WHERE id=?1 AND owner_id=?2",
        params![id, owner],
    )?;
    if n == 0 {
        return Err(FinanceError::not_found("Bill template", id));
    }
    Ok(())
}
