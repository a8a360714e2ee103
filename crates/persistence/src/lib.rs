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

//! # CreditCore Persistence
//!
//! ## Purpose
//! The only crate that talks to Postgres. Owns the schema (migrations under
//! `migrations/`), the database triggers, all row reads and writes, and the
//! PII cipher. Every other component mutates state through the repositories
//! here; none of them composes SQL.
//!
//! ## Architecture Context
//! Three schema decisions carry the pipeline's crash-safety story:
//!
//! 1. **Enqueue trigger**: inserting an application with status PENDING
//!    atomically creates a `pending_jobs` row. There is no code path that
//!    enqueues on creation; a crash after the HTTP response loses nothing.
//! 2. **Audit trigger**: every status change writes an `audit_logs` row in
//!    the same transaction, attributed through transaction-local settings.
//! 3. **Partial unique indexes**: at most one active application per
//!    (country, identity_document), and idempotency keys unique when
//!    present. Violations surface as typed conflicts, not generic errors.
//!
//! ## Key Components
//! - [`ApplicationRepository`]: insert, lookup, guarded status transitions
//! - [`PendingJobStore`] / [`FailedJobStore`] / [`WebhookEventStore`]: the
//!   job-table and intake-side stores
//! - [`PiiCipher`]: XChaCha20-Poly1305 for `full_name` / `identity_document`
//! - [`PartitionMaintenance`]: monthly range-partition assurance

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod crypto;
pub mod error;
pub mod models;
pub mod partitioning;
pub mod repository;
pub mod stores;

pub use crypto::PiiCipher;
pub use error::{PersistenceError, PersistenceResult};
pub use models::{
    ApplicationRecord, AuditLogEntry, FailedJobRecord, NewApplication, NewFailedJob,
    PendingJobRecord, PendingJobStatus, WebhookEventRecord, WebhookEventStatus,
};
pub use partitioning::PartitionMaintenance;
pub use repository::{ApplicationRepository, ChangeAttribution};
pub use stores::{FailedJobStore, PendingJobStore, WebhookEventInsert, WebhookEventStore};

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Open a connection pool against the given database URL.
pub async fn connect(database_url: &str, max_connections: u32) -> PersistenceResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Apply all pending schema migrations.
pub async fn run_migrations(pool: &PgPool) -> PersistenceResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| PersistenceError::Database(sqlx::Error::Migrate(Box::new(e))))?;
    Ok(())
}
