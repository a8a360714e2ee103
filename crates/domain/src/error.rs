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

//! Worker failure taxonomy.
//!
//! Processing failures split into two classes:
//!
//! - **Permanent**: retrying cannot succeed (bad id, missing row, invalid
//!   input, illegal transition, unsupported country). The job goes straight
//!   to the dead-letter table with `is_retryable = false`.
//! - **Transient**: external conditions that may clear (database or provider
//!   unavailable, timeouts, dropped connections). Retried with exponential
//!   backoff up to the configured maximum, then dead-lettered with
//!   `is_retryable = true` so the hourly sweep can re-enqueue them.
//!
//! [`ProcessingError::is_retryable`] is the single classifier; no other code
//! inspects error kinds to make retry decisions.

use crate::state_machine::StateTransitionError;

/// A failure while processing a credit application task.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    /// The task argument is not a well-formed application id.
    #[error("invalid application id: {0}")]
    InvalidApplicationId(String),

    /// No application row exists for the id.
    #[error("application {0} not found")]
    ApplicationNotFound(String),

    /// Input data failed validation; reprocessing the same data cannot pass.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The requested status change violates the transition table.
    #[error(transparent)]
    StateTransition(#[from] StateTransitionError),

    /// The application's country has no registered strategy.
    #[error("country '{0}' is not supported")]
    UnsupportedCountry(String),

    /// The database rejected or dropped the operation.
    #[error("database unavailable: {0}")]
    DatabaseUnavailable(String),

    /// The banking provider is failing or the breaker refused the call.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// An external call exceeded its deadline.
    #[error("network timeout: {0}")]
    NetworkTimeout(String),

    /// A connection-level failure (queue, pub/sub, lock store).
    #[error("connection error: {0}")]
    Connection(String),

    /// Explicitly marked recoverable by the raiser.
    #[error("recoverable: {0}")]
    Recoverable(String),
}

impl ProcessingError {
    /// Total retry classifier: `true` for transient kinds only.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProcessingError::InvalidApplicationId(_)
            | ProcessingError::ApplicationNotFound(_)
            | ProcessingError::Validation(_)
            | ProcessingError::StateTransition(_)
            | ProcessingError::UnsupportedCountry(_) => false,
            ProcessingError::DatabaseUnavailable(_)
            | ProcessingError::ProviderUnavailable(_)
            | ProcessingError::NetworkTimeout(_)
            | ProcessingError::Connection(_)
            | ProcessingError::Recoverable(_) => true,
        }
    }

    /// Stable kind name recorded as `error_type` in the dead-letter table.
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessingError::InvalidApplicationId(_) => "InvalidApplicationId",
            ProcessingError::ApplicationNotFound(_) => "ApplicationNotFound",
            ProcessingError::Validation(_) => "ValidationError",
            ProcessingError::StateTransition(_) => "StateTransitionError",
            ProcessingError::UnsupportedCountry(_) => "UnsupportedCountry",
            ProcessingError::DatabaseUnavailable(_) => "DatabaseUnavailable",
            ProcessingError::ProviderUnavailable(_) => "ProviderUnavailable",
            ProcessingError::NetworkTimeout(_) => "NetworkTimeout",
            ProcessingError::Connection(_) => "ConnectionError",
            ProcessingError::Recoverable(_) => "RecoverableError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::ApplicationStatus;

    #[test]
    fn test_permanent_kinds_not_retryable() {
        let errors = [
            ProcessingError::InvalidApplicationId("nope".into()),
            ProcessingError::ApplicationNotFound("x".into()),
            ProcessingError::Validation("bad document".into()),
            ProcessingError::StateTransition(StateTransitionError {
                from: ApplicationStatus::Approved,
                to: ApplicationStatus::Pending,
            }),
            ProcessingError::UnsupportedCountry("AR".into()),
        ];
        for err in errors {
            assert!(!err.is_retryable(), "{err}");
        }
    }

    #[test]
    fn test_transient_kinds_retryable() {
        let errors = [
            ProcessingError::DatabaseUnavailable("pool timeout".into()),
            ProcessingError::ProviderUnavailable("circuit open".into()),
            ProcessingError::NetworkTimeout("30s elapsed".into()),
            ProcessingError::Connection("reset by peer".into()),
            ProcessingError::Recoverable("rate limited".into()),
        ];
        for err in errors {
            assert!(err.is_retryable(), "{err}");
        }
    }

    #[test]
    fn test_kind_names_stable() {
        assert_eq!(
            ProcessingError::ApplicationNotFound("x".into()).kind(),
            "ApplicationNotFound"
        );
        assert_eq!(
            ProcessingError::NetworkTimeout("t".into()).kind(),
            "NetworkTimeout"
        );
    }
}
