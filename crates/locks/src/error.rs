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

//! Error types for lease operations.

use thiserror::Error;

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;

/// Errors that can occur during lease operations.
#[derive(Error, Debug)]
pub enum LockError {
    /// Another holder owns the lease and the wait budget ran out.
    #[error("lock {0} is held by another worker")]
    AlreadyHeld(String),

    /// The lease no longer exists (expired or never acquired).
    #[error("lock not found: {0}")]
    NotFound(String),

    /// The fencing token does not match the current lease.
    #[error("fencing token mismatch for lock {0}")]
    TokenMismatch(String),

    /// Backend failure (Redis connectivity, protocol).
    #[error("lock backend error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for LockError {
    fn from(err: redis::RedisError) -> Self {
        LockError::Backend(format!("redis error: {err}"))
    }
}
