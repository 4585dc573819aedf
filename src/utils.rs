// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;

use crate::error::{FinanceError, FinanceResult};

pub fn parse_date(s: &str) -> FinanceResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
        FinanceError::validation(format!("Invalid date '{}', expected YYYY-MM-DD", s.trim()))
    })
}

pub fn parse_decimal(s: &str) -> FinanceResult<Decimal> {
    s.trim()
        .parse::<Decimal>()
        .map_err(|_| FinanceError::validation(format!("Invalid decimal '{}'", s.trim())))
}

pub fn ensure_positive(amount: Decimal) -> FinanceResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(FinanceError::validation(format!(
            "Amount must be greater than zero, got {}",
            amount
        )));
    }
    Ok(amount)
}

pub fn ensure_reminder_days(days: u32) -> FinanceResult<u32> {
    if days > 30 {
        return Err(FinanceError::validation(format!(
            "Reminder days must be between 0 and 30, got {}",
            days
        )));
    }
    Ok(days)
}

pub fn ensure_due_day(day: u32) -> FinanceResult<u32> {
    if !(1..=31).contains(&day) {
        return Err(FinanceError::validation(format!(
            "Due day must be between 1 and 31, got {}",
            day
        )));
    }
    Ok(day)
}

/// Trimmed text, or a validation error naming the missing field.
pub fn required_text(field: &str, value: &str) -> FinanceResult<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(FinanceError::validation(format!("{} is required", field)));
    }
    Ok(v.to_string())
}

pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Read a TEXT decimal column; amounts never pass through floating point.
pub fn decimal_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let s: String = row.get(idx)?;
    s.parse::<Decimal>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub fn fmt_money(d: &Decimal) -> String {
    format!("{:.2}", d.round_dp(2))
}

pub fn fmt_pct(ratio: &Decimal) -> String {
    format!("{:.1}%", (*ratio * Decimal::ONE_HUNDRED).round_dp(1))
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> anyhow::Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

/// The category must exist and belong to `owner`.
pub fn ensure_category_owned(
    conn: &Connection,
    owner: i64,
    category_id: Option<i64>,
) -> FinanceResult<()> {
    let Some(cid) = category_id else {
        return Ok(());
    };
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM categories WHERE id=?1 AND owner_id=?2",
            params![cid, owner],
            |r| r.get(0),
        )
        .optional()?;
    match found {
        Some(_) => Ok(()),
        None => Err(FinanceError::not_found("Category", cid)),
    }
}

pub fn ensure_user(conn: &Connection, owner: i64) -> FinanceResult<()> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM users WHERE id=?1", params![owner], |r| {
            r.get(0)
        })
        .optional()?;
    match found {
        Some(_) => Ok(()),
        None => Err(FinanceError::not_found("User", owner)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_amounts_only() {
        assert!(ensure_positive(Decimal::ZERO).unwrap_err().is_validation());
        assert!(ensure_positive(Decimal::NEGATIVE_ONE).is_err());
        assert_eq!(
            ensure_positive(parse_decimal("12.50").unwrap()).unwrap(),
            Decimal::new(125, 1)
        );
    }

    #[test]
    fn ranges() {
        assert!(ensure_reminder_days(30).is_ok());
        assert!(ensure_reminder_days(31).is_err());
        assert!(ensure_due_day(0).is_err());
        assert!(ensure_due_day(31).is_ok());
        assert!(ensure_due_day(32).is_err());
    }

    #[test]
    fn formats() {
        assert_eq!(fmt_money(&Decimal::new(500, 0)), "500.00");
        assert_eq!(fmt_pct(&Decimal::new(64, 2)), "64.0%");
        assert!(parse_date("2024-02-30").unwrap_err().is_validation());
        assert!(required_text("Description", "  ").unwrap_err().is_validation());
        assert_eq!(required_text("Description", " Rent ").unwrap(), "Rent");
    }
}
