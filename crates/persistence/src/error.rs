// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 CreditCore Contributors
//
// This file is part of CreditCore.
//
// CreditCore is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// CreditCore is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with CreditCore. If not, see <https://www.gnu.org/licenses/>.

//! Persistence error types.
//!
//! Constraint violations that callers act on (idempotency replays, duplicate
//! active applications) are typed variants, distinguishable from generic
//! database failures which the worker treats as transient.

use creditcore_domain::StateTransitionError;
use thiserror::Error;
use uuid::Uuid;

/// Result type for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Errors from the persistence layer.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// An application with this idempotency key already exists.
    #[error("idempotency key already used: {0}")]
    IdempotencyConflict(String),

    /// An active application already exists for (country, document).
    #[error("an active application already exists for this document")]
    DuplicateActiveApplication,

    /// Row not found (or soft-deleted).
    #[error("application {0} not found")]
    ApplicationNotFound(Uuid),

    /// Status change rejected by the transition table.
    #[error(transparent)]
    InvalidTransition(#[from] StateTransitionError),

    /// PII encryption or decryption failure.
    #[error("pii cipher error: {0}")]
    Crypto(String),

    /// A row held a value the domain types reject.
    #[error("failed to decode row: {0}")]
    Decode(String),

    /// Everything else from the driver.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Partial unique indexes whose violations have typed meanings.
const IDEMPOTENCY_CONSTRAINT: &str = "unique_idempotency_key";
const ACTIVE_DUPLICATE_CONSTRAINT: &str = "unique_document_per_country";

impl PersistenceError {
    /// Translate a driver error from an application INSERT, turning the two
    /// meaningful unique violations into their typed variants.
    pub(crate) fn from_insert(err: sqlx::Error, idempotency_key: Option<&str>) -> Self {
        if let Some(db_err) = err.as_database_error() {
            match db_err.constraint() {
                Some(IDEMPOTENCY_CONSTRAINT) => {
                    return PersistenceError::IdempotencyConflict(
                        idempotency_key.unwrap_or_default().to_string(),
                    );
                }
                Some(ACTIVE_DUPLICATE_CONSTRAINT) => {
                    return PersistenceError::DuplicateActiveApplication;
                }
                _ => {}
            }
        }
        PersistenceError::Database(err)
    }

    /// Whether a worker should treat this failure as transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, PersistenceError::Database(_))
    }
}
