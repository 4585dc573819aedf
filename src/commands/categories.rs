// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::AppConfig;
use crate::error::{FinanceError, FinanceResult, is_unique_violation};
use crate::models::{Category, CategoryKind};
use crate::utils::{maybe_print_json, pretty_table, required_text};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

/// Starter set seeded at registration.
pub const DEFAULT_CATEGORIES: &[(&str, CategoryKind)] = &[
    ("Rent", CategoryKind::FixedExpense),
    ("Internet", CategoryKind::FixedExpense),
    ("Gym", CategoryKind::FixedExpense),
    ("Groceries", CategoryKind::VariableExpense),
    ("Leisure", CategoryKind::VariableExpense),
    ("Transport", CategoryKind::VariableExpense),
    ("Salary", CategoryKind::Income),
    ("Extra Income", CategoryKind::Income),
];

pub fn handle(conn: &Connection, cfg: &AppConfig, m: &clap::ArgMatches) -> Result<()> {
    let owner = cfg.require_owner(conn)?;
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let kind = sub.get_one::<String>("kind").unwrap().parse::<CategoryKind>()?;
            let cat = create_category(conn, owner, name, kind)?;
            println!("Added category '{}' ({}) with id {}", cat.name, cat.kind, cat.id);
        }
        Some(("list", sub)) => {
            let cats = list_categories(conn, owner)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &cats)? {
                let data = cats
                    .into_iter()
                    .map(|c| vec![c.id.to_string(), c.name, c.kind.to_string()])
                    .collect();
                println!("{}", pretty_table(&["ID", "Category", "Kind"], data));
            }
        }
        _ => {}
    }
    Ok(())
}

fn row_to_category(r: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: r.get(0)?,
        owner_id: r.get(1)?,
        name: r.get(2)?,
        kind: r.get(3)?,
    })
}

pub fn list_categories(conn: &Connection, owner: i64) -> FinanceResult<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, name, kind FROM categories WHERE owner_id=?1 ORDER BY kind, name",
    )?;
    let rows = stmt.query_map(params![owner], row_to_category)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn get_category(conn: &Connection, owner: i64, id: i64) -> FinanceResult<Category> {
    conn.query_row(
        "SELECT id, owner_id, name, kind FROM categories WHERE id=?1 AND owner_id=?2",
        params![id, owner],
        row_to_category,
    )
    .optional()?
    .ok_or_else(|| FinanceError::not_found("Category", id))
}

/// Names are unique per owner; there is no update or delete.
pub fn create_category(
    conn: &Connection,
    owner: i64,
    name: &str,
    kind: CategoryKind,
) -> FinanceResult<Category> {
    let name = required_text("Category name", name)?;
    let taken: Option<i64> = conn
        .query_row(
            "SELECT id FROM categories WHERE owner_id=?1 AND name=?2",
            params![owner, name],
            |r| r.get(0),
        )
        .optional()?;
    if taken.is_some() {
        return Err(FinanceError::Conflict(format!(
            "Category '{}' already exists",
            name
        )));
    }
    match conn.execute(
        "INSERT INTO categories(owner_id, name, kind) VALUES (?1, ?2, ?3)",
        params![owner, name, kind],
    ) {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(FinanceError::Conflict(format!(
                "Category '{}' already exists",
                name
            )));
        }
        Err(e) => return Err(e.into()),
    }
    Ok(Category {
        id: conn.last_insert_rowid(),
        owner_id: owner,
        name,
        kind,
    })
}

/// Insert the starter set, skipping names the owner already has.
pub fn seed_defaults(conn: &Connection, owner: i64) -> FinanceResult<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT OR IGNORE INTO categories(owner_id, name, kind) VALUES (?1, ?2, ?3)",
    )?;
    let mut inserted = 0;
    for (name, kind) in DEFAULT_CATEGORIES {
        inserted += stmt.execute(params![owner, name, kind])?;
    }
    Ok(inserted)
}
