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

//! # CreditCore Worker
//!
//! ## Purpose
//! Executes `process_credit_application` tasks from the work queue and runs
//! the scheduled maintenance jobs. Correctness under concurrency and partial
//! failure lives here: the per-application lock, the retry/dead-letter
//! policy, the task deadline, and graceful shutdown.
//!
//! ## Task Pipeline
//! ```text
//! pop task ─> lock process:{id} ─> short-circuit check
//!    ─> PENDING→VALIDATING (+ broadcast)
//!    ─> validate document          (invalid ⇒ REJECTED, done)
//!    ─> fetch banking data         (breaker-wrapped, 30s timeout)
//!    ─> evaluate business rules
//!    ─> APPROVED | REJECTED | UNDER_REVIEW (+ broadcast)
//!    ─> mark pending_job completed, release lock, ack
//! ```
//!
//! ## Failure Policy
//! [`creditcore_domain::ProcessingError::is_retryable`] splits failures:
//! transient kinds retry with exponential backoff (base 1s, factor 2,
//! jitter) up to `max_retries`; permanent kinds and exhausted retries write
//! a `failed_jobs` row (with `is_retryable` reflecting the class) and mark
//! the pending job failed. A lost lock race is not a failure: the task is
//! skipped as already-processing.
//!
//! ## Key Components
//! - [`WorkerPool`]: concurrency-capped consumer with shutdown draining
//! - [`task::process_credit_application`]: the pipeline body
//! - [`MaintenanceRunner`]: orphan sweep, webhook TTL, DLQ auto-retry,
//!   partition assurance, optional stale-PENDING cancellation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod maintenance;
pub mod pool;
pub mod task;

pub use context::WorkerContext;
pub use maintenance::{MaintenanceConfig, MaintenanceRunner};
pub use pool::{WorkerConfig, WorkerPool};
pub use task::TaskOutcome;
