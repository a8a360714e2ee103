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

//! Lock manager trait for distributed lease coordination.

use crate::LockResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Options for acquiring a lease.
#[derive(Clone, Debug)]
pub struct AcquireOptions {
    /// Key to lease, e.g. `process:{application_id}`.
    pub lock_key: String,
    /// Identity of the acquiring worker (for diagnostics).
    pub holder_id: String,
    /// How long the lease lives if never renewed or released.
    pub ttl: Duration,
    /// How long to keep retrying before giving up with
    /// [`crate::LockError::AlreadyHeld`]. Zero means a single attempt.
    pub wait_budget: Duration,
}

/// A held lease. The `token` is the fencing token; all mutations of the
/// lease validate it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lease {
    /// The leased key.
    pub lock_key: String,
    /// Holder that acquired the lease.
    pub holder_id: String,
    /// Fencing token generated at acquisition.
    pub token: String,
    /// Wall-clock expiry (approximate on the Redis backend).
    pub expires_at: DateTime<Utc>,
}

/// Trait for distributed lease management.
///
/// ## Behavior contract
/// - `acquire`: at most one live lease per key cluster-wide; retries within
///   `wait_budget`, then fails fast so the worker can abandon the task.
/// - `renew`: extends the expiry iff the fencing token still matches.
/// - `release`: compare-and-delete; succeeds when the lease is already gone,
///   refuses (without side effects) when the token mismatches.
#[async_trait]
pub trait LockManager: Send + Sync {
    /// Acquire an exclusive lease.
    async fn acquire(&self, options: AcquireOptions) -> LockResult<Lease>;

    /// Extend a held lease by `ttl` from now.
    async fn renew(&self, lease: &Lease, ttl: Duration) -> LockResult<Lease>;

    /// Release a held lease.
    async fn release(&self, lease: &Lease) -> LockResult<()>;

    /// Current holder of a key, if any.
    async fn holder(&self, lock_key: &str) -> LockResult<Option<String>>;
}
