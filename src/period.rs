// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Calendar-month reporting periods.
//!
//! A `YYYY-MM` string resolves to an inclusive range running from the first
//! day at 00:00:00 to the last real day of the month at 23:59:59.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

use crate::error::{FinanceError, FinanceResult};

static YEAR_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{1,4})-(\d{1,2})\s*$").unwrap_or_else(|e| panic!("bad regex: {e}"))
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> FinanceResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(FinanceError::validation(format!(
                "Invalid month number {}, expected 1-12",
                month
            )));
        }
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(FinanceError::validation(format!("Invalid year {}", year)));
        }
        Ok(Self { year, month })
    }

    pub fn parse(s: &str) -> FinanceResult<Self> {
        let caps = YEAR_MONTH.captures(s).ok_or_else(|| {
            FinanceError::validation(format!("Invalid month '{}', expected YYYY-MM", s.trim()))
        })?;
        let year: i32 = caps[1]
            .parse()
            .map_err(|_| FinanceError::validation(format!("Invalid year in '{}'", s.trim())))?;
        let month: u32 = caps[2]
            .parse()
            .map_err(|_| FinanceError::validation(format!("Invalid month in '{}'", s.trim())))?;
        Self::new(year, month)
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn days_in_month(&self) -> u32 {
        let (ny, nm) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        match NaiveDate::from_ymd_opt(ny, nm, 1) {
            Some(next) => next.pred_opt().map(|d| d.day()).unwrap_or(28),
            // Only reachable at the calendar's upper limit.
            None => 31,
        }
    }

    pub fn last_day(&self) -> NaiveDate {
        self.day_clamped(31)
    }

    /// Day-of-month capped at the month's real length, so 31 in February is the 28th/29th.
    pub fn day_clamped(&self, day: u32) -> NaiveDate {
        let day = day.clamp(1, self.days_in_month());
        NaiveDate::from_ymd_opt(self.year, self.month, day).unwrap_or_else(|| self.first_day())
    }

    pub fn period(&self) -> Period {
        Period {
            month: *self,
            start: self.first_day().and_time(NaiveTime::MIN),
            end: self
                .last_day()
                .and_hms_opt(23, 59, 59)
                .unwrap_or_else(|| self.last_day().and_time(NaiveTime::MIN)),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

/// Inclusive reporting window for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub month: YearMonth,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Period {
    pub fn from_date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn to_date(&self) -> NaiveDate {
        self.end.date()
    }
}

/// Resolve an optional `YYYY-MM` string, defaulting to the month containing `today`.
pub fn resolve_month(month: Option<&str>, today: NaiveDate) -> FinanceResult<YearMonth> {
    match month.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => YearMonth::parse(s),
        None => Ok(YearMonth::containing(today)),
    }
}
