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

//! # CreditCore Distributed Locks
//!
//! ## Purpose
//! Short-lived exclusive leases keyed by application id. The worker pool
//! acquires `process:{application_id}` before advancing an application, so at
//! most one worker cluster-wide mutates a given application at any instant.
//!
//! ## Design Decisions
//! - **Fencing tokens**: every lease carries a ULID token; release and renew
//!   are compare-and-set on the token, so a worker that lost its lease (TTL
//!   expiry, another holder) cannot release the new holder's lease.
//! - **TTL longer than the task deadline**: the default 5-minute TTL matches
//!   the worker task ceiling, so a dead holder never deadlocks a key for
//!   longer than one task budget.
//! - **Idempotent release**: releasing an already-expired or already-released
//!   lease succeeds; releasing with a stale token fails with
//!   [`LockError::TokenMismatch`] and leaves the current lease untouched.
//!
//! ## Backend Support
//! - [`memory::MemoryLockManager`]: process-local, for tests
//! - [`redis_backend::RedisLockManager`]: `SET NX PX` acquisition with Lua
//!   compare-and-set for renew/release (cluster-wide)
//!
//! ## Examples
//! ```rust,no_run
//! use std::time::Duration;
//! use creditcore_locks::{AcquireOptions, LockManager, memory::MemoryLockManager};
//!
//! # async fn example() -> Result<(), creditcore_locks::LockError> {
//! let manager = MemoryLockManager::new();
//!
//! let lease = manager
//!     .acquire(AcquireOptions {
//!         lock_key: "process:8f14e45f-ceea-4e6f-b7fe-d87b1b2c3d4e".to_string(),
//!         holder_id: "worker-1".to_string(),
//!         ttl: Duration::from_secs(300),
//!         wait_budget: Duration::from_secs(2),
//!     })
//!     .await?;
//!
//! // ... advance the application ...
//!
//! manager.release(&lease).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod manager;
pub mod memory;
pub mod redis_backend;

pub use error::{LockError, LockResult};
pub use manager::{AcquireOptions, Lease, LockManager};
