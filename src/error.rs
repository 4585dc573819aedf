// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Error type shared by every ledger operation.
//!
//! Storage failures are logged once when they are converted, then surfaced
//! as an opaque internal failure. Everything else is a caller error.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinanceError {
    /// Malformed, missing or out-of-range input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity absent, or owned by somebody else. The two are not distinguished.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Unique name already taken within the owner's scope.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Detail is logged at conversion and kept as the source, never displayed.
    #[error("Internal storage failure")]
    Storage(#[source] rusqlite::Error),
}

pub type FinanceResult<T> = std::result::Result<T, FinanceError>;

impl FinanceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// HTTP-equivalent status class for a transport layer.
    pub fn status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound { .. } => 404,
            Self::Conflict(_) => 409,
            Self::Storage(_) => 500,
        }
    }
}

impl From<rusqlite::Error> for FinanceError {
    fn from(value: rusqlite::Error) -> Self {
        tracing::error!("an unhandled SQL error occurred: {}", value);
        FinanceError::Storage(value)
    }
}

/// True when the error is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}
