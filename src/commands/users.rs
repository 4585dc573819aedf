// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::categories::seed_defaults;
use crate::error::{FinanceError, FinanceResult, is_unique_violation};
use crate::models::User;
use crate::utils::{maybe_print_json, pretty_table, required_text};
use anyhow::Result;
use rusqlite::{Connection, params};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            let user = register(conn, name)?;
            println!("Registered user '{}' with id {}", user.name, user.id);
        }
        Some(("list", sub)) => {
            let users = list_users(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &users)? {
                let data = users
                    .into_iter()
                    .map(|u| vec![u.id.to_string(), u.name, u.created_at.to_string()])
                    .collect();
                println!("{}", pretty_table(&["ID", "Name", "Created"], data));
            }
        }
        _ => {}
    }
    Ok(())
}

/// Create a user and its starter categories in one unit of work.
pub fn register(conn: &mut Connection, name: &str) -> FinanceResult<User> {
    let name = required_text("User name", name)?;
    let tx = conn.transaction()?;
    match tx.execute("INSERT INTO users(name) VALUES (?1)", params![name]) {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(FinanceError::Conflict(format!(
                "User '{}' already exists",
                name
            )));
        }
        Err(e) => return Err(e.into()),
    }
    let id = tx.last_insert_rowid();
    let seeded = seed_defaults(&tx, id)?;
    let user = tx.query_row(
        "SELECT id, name, created_at FROM users WHERE id=?1",
        params![id],
        |r| {
            Ok(User {
                id: r.get(0)?,
                name: r.get(1)?,
                created_at: r.get(2)?,
            })
        },
    )?;
    tx.commit()?;
    tracing::info!(user = id, seeded, "registered user");
    Ok(user)
}

pub fn list_users(conn: &Connection) -> FinanceResult<Vec<User>> {
    let mut stmt = conn.prepare("SELECT id, name, created_at FROM users ORDER BY id")?;
    let rows = stmt.query_map([], |r| {
        Ok(User {
            id: r.get(0)?,
            name: r.get(1)?,
            created_at: r.get(2)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
