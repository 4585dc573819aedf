// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::categories::list_categories;
use crate::commands::transactions::{TransactionFilter, list_transactions};
use crate::config::AppConfig;
use crate::error::FinanceError;
use crate::utils::parse_date;
use anyhow::{Context, Result};
use rusqlite::Connection;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;

pub fn handle(conn: &Connection, cfg: &AppConfig, m: &clap::ArgMatches) -> Result<()> {
    let owner = cfg.require_owner(conn)?;
    match m.subcommand() {
        Some(("transactions", sub)) => {
            let fmt = sub.get_one::<String>("format").unwrap();
            let out = sub.get_one::<String>("out").unwrap();
            let filter = TransactionFilter {
                from: sub.get_one::<String>("from").map(|s| parse_date(s)).transpose()?,
                to: sub.get_one::<String>("to").map(|s| parse_date(s)).transpose()?,
                ..Default::default()
            };
            let n = export_transactions(conn, owner, fmt, Path::new(out.trim()), &filter)?;
            println!("Exported {} transaction(s) to {}", n, out.trim());
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Write the owner's transactions, oldest first, as `csv` or `json`.
pub fn export_transactions(
    conn: &Connection,
    owner: i64,
    format: &str,
    out: &Path,
    filter: &TransactionFilter,
) -> Result<usize> {
    let fmt = format.trim().to_lowercase();
    if fmt != "csv" && fmt != "json" {
        return Err(FinanceError::validation(format!(
            "Unknown format: {} (use csv|json)",
            fmt
        ))
        .into());
    }

    let names: HashMap<i64, String> = list_categories(conn, owner)?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();
    let mut rows = list_transactions(conn, owner, filter)?;
    rows.reverse();

    if fmt == "csv" {
        let mut wtr = csv::Writer::from_path(out)
            .with_context(|| format!("Create {}", out.display()))?;
        wtr.write_record(["id", "date", "type", "amount", "category", "description"])?;
        for t in &rows {
            let category = t
                .category_id
                .and_then(|c| names.get(&c).cloned())
                .unwrap_or_default();
            wtr.write_record([
                t.id.to_string(),
                t.occurred_on.to_string(),
                t.r#type.to_string(),
                t.amount.to_string(),
                category,
                t.description.clone().unwrap_or_default(),
            ])?;
        }
        wtr.flush()?;
    } else {
        let items: Vec<_> = rows
            .iter()
            .map(|t| {
                json!({
                    "id": t.id,
                    "date": t.occurred_on.to_string(),
                    "type": t.r#type.as_str(),
                    "amount": t.amount.to_string(),
                    "category": t.category_id.and_then(|c| names.get(&c).cloned()),
                    "description": t.description,
                })
            })
            .collect();
        std::fs::write(out, serde_json::to_string_pretty(&items)?)
            .with_context(|| format!("Write {}", out.display()))?;
    }
    tracing::info!(owner, rows = rows.len(), path = %out.display(), "exported transactions");
    Ok(rows.len())
}
