// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Runtime configuration resolved from flags and environment.

use anyhow::Result;
use rusqlite::Connection;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::db;
use crate::error::FinanceError;
use crate::utils::ensure_user;

pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    /// Authenticated owner for this invocation. Never persisted.
    pub owner: Option<i64>,
    pub log_filter: String,
}

impl AppConfig {
    pub fn from_matches(m: &clap::ArgMatches) -> Result<Self> {
        let db_path = match m.get_one::<String>("db").map(|s| s.trim()) {
            Some(p) if !p.is_empty() => PathBuf::from(p),
            _ => db::default_db_path()?,
        };
        let owner = m.get_one::<i64>("user").copied();
        let log_filter = m
            .get_one::<String>("log")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        Ok(Self {
            db_path,
            owner,
            log_filter,
        })
    }

    /// Config bound to an owner, for embedding and tests.
    pub fn for_owner(owner: i64) -> Self {
        Self {
            db_path: PathBuf::from(":memory:"),
            owner: Some(owner),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    /// The owner id, checked against the users table.
    pub fn require_owner(&self, conn: &Connection) -> Result<i64> {
        let owner = self.owner.ok_or_else(|| {
            FinanceError::validation("No user given; pass --user <ID> or set HOMEBOOK_USER")
        })?;
        ensure_user(conn, owner)?;
        Ok(owner)
    }
}

/// Install the stderr fmt subscriber. Safe to call more than once.
pub fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
