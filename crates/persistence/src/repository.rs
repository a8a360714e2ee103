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

//! Application repository: inserts, lookups, and guarded status changes.
//!
//! Every status change runs in one transaction: the current row is locked,
//! the transition validated against the state machine, the update applied.
//! The audit trigger fires inside the same transaction, so the audit trail
//! and the status are never out of step. Attributed changes set the
//! transaction-local `app.changed_by` / `app.change_reason` settings the
//! trigger reads.

use crate::models::{ApplicationRecord, AuditLogEntry, NewApplication};
use crate::{PersistenceError, PersistenceResult};
use chrono::{DateTime, Utc};
use creditcore_domain::state_machine::validate_transition;
use creditcore_domain::ApplicationStatus;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Attribution for a manual (non-worker) status change.
#[derive(Clone, Copy, Debug)]
pub struct ChangeAttribution<'a> {
    /// Recorded as `audit_logs.changed_by`.
    pub changed_by: &'a str,
    /// Recorded as `audit_logs.change_reason`.
    pub change_reason: &'a str,
}

/// Repository over the `applications` and `audit_logs` tables.
#[derive(Clone)]
pub struct ApplicationRepository {
    pool: PgPool,
}

impl ApplicationRepository {
    /// Create the repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new application with status PENDING.
    ///
    /// The enqueue trigger creates the matching `pending_jobs` row in the
    /// same transaction. Unique violations surface as
    /// [`PersistenceError::IdempotencyConflict`] or
    /// [`PersistenceError::DuplicateActiveApplication`].
    pub async fn insert(&self, new: NewApplication) -> PersistenceResult<ApplicationRecord> {
        let sql = format!(
            "INSERT INTO applications \
                 (country, full_name, identity_document, document_fingerprint, \
                  requested_amount, monthly_income, currency, idempotency_key, \
                  country_specific_data) \
             VALUES ($1::country_code, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {}",
            ApplicationRecord::COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(new.country.as_str())
            .bind(&new.full_name)
            .bind(&new.identity_document)
            .bind(&new.document_fingerprint)
            .bind(new.requested_amount)
            .bind(new.monthly_income)
            .bind(new.currency.as_str())
            .bind(&new.idempotency_key)
            .bind(&new.country_specific_data)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PersistenceError::from_insert(e, new.idempotency_key.as_deref()))?;
        ApplicationRecord::from_row(&row)
    }

    /// Fetch an application by id, ignoring soft-deleted rows.
    pub async fn find_by_id(&self, id: Uuid) -> PersistenceResult<Option<ApplicationRecord>> {
        let sql = format!(
            "SELECT {} FROM applications WHERE id = $1 AND deleted_at IS NULL",
            ApplicationRecord::COLUMNS
        );
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(|r| ApplicationRecord::from_row(&r)).transpose()
    }

    /// Fetch by idempotency key, for replay resolution on create.
    pub async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> PersistenceResult<Option<ApplicationRecord>> {
        let sql = format!(
            "SELECT {} FROM applications WHERE idempotency_key = $1 AND deleted_at IS NULL",
            ApplicationRecord::COLUMNS
        );
        let row = sqlx::query(&sql).bind(key).fetch_optional(&self.pool).await?;
        row.map(|r| ApplicationRecord::from_row(&r)).transpose()
    }

    /// Change an application's status.
    ///
    /// Locks the row, validates the transition, applies it. The audit
    /// trigger records the change; `attribution` routes through the
    /// transaction-local settings it reads.
    pub async fn transition_status(
        &self,
        id: Uuid,
        to: ApplicationStatus,
        attribution: Option<ChangeAttribution<'_>>,
    ) -> PersistenceResult<ApplicationRecord> {
        let mut tx = self.pool.begin().await?;
        let current = self.lock_row(&mut tx, id).await?;
        validate_transition(current.status, to)?;
        Self::apply_attribution(&mut tx, attribution).await?;

        let sql = format!(
            "UPDATE applications SET status = $2::application_status \
             WHERE id = $1 RETURNING {}",
            ApplicationRecord::COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(to.as_str())
            .fetch_one(&mut *tx)
            .await?;
        let record = ApplicationRecord::from_row(&row)?;
        tx.commit().await?;
        Ok(record)
    }

    /// Persist an evaluation outcome: status, risk score, banking data,
    /// validation errors, and the risk level inside country_specific_data —
    /// atomically with the transition.
    #[allow(clippy::too_many_arguments)]
    pub async fn record_evaluation(
        &self,
        id: Uuid,
        to: ApplicationStatus,
        risk_score: Decimal,
        banking_data: Value,
        validation_errors: &[String],
        risk_level: &str,
    ) -> PersistenceResult<ApplicationRecord> {
        let mut tx = self.pool.begin().await?;
        let current = self.lock_row(&mut tx, id).await?;
        validate_transition(current.status, to)?;

        let sql = format!(
            "UPDATE applications SET \
                 status = $2::application_status, \
                 risk_score = $3, \
                 banking_data = $4, \
                 validation_errors = $5, \
                 country_specific_data = country_specific_data || jsonb_build_object('risk_level', $6::text) \
             WHERE id = $1 RETURNING {}",
            ApplicationRecord::COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(to.as_str())
            .bind(risk_score)
            .bind(&banking_data)
            .bind(serde_json::to_value(validation_errors).expect("strings serialize"))
            .bind(risk_level)
            .fetch_one(&mut *tx)
            .await?;
        let record = ApplicationRecord::from_row(&row)?;
        tx.commit().await?;
        Ok(record)
    }

    /// Apply a webhook confirmation: transition plus a banking-data merge,
    /// attributed to `webhook:<provider>`.
    pub async fn apply_webhook_outcome(
        &self,
        id: Uuid,
        to: ApplicationStatus,
        banking_patch: Value,
        changed_by: &str,
    ) -> PersistenceResult<ApplicationRecord> {
        let mut tx = self.pool.begin().await?;
        let current = self.lock_row(&mut tx, id).await?;
        validate_transition(current.status, to)?;
        Self::apply_attribution(
            &mut tx,
            Some(ChangeAttribution {
                changed_by,
                change_reason: "bank confirmation webhook",
            }),
        )
        .await?;

        let sql = format!(
            "UPDATE applications SET \
                 status = $2::application_status, \
                 banking_data = banking_data || $3 \
             WHERE id = $1 RETURNING {}",
            ApplicationRecord::COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(to.as_str())
            .bind(&banking_patch)
            .fetch_one(&mut *tx)
            .await?;
        let record = ApplicationRecord::from_row(&row)?;
        tx.commit().await?;
        Ok(record)
    }

    /// Populate validation errors while transitioning (document rejection).
    pub async fn record_validation_failure(
        &self,
        id: Uuid,
        to: ApplicationStatus,
        validation_errors: &[String],
    ) -> PersistenceResult<ApplicationRecord> {
        let mut tx = self.pool.begin().await?;
        let current = self.lock_row(&mut tx, id).await?;
        validate_transition(current.status, to)?;

        let sql = format!(
            "UPDATE applications SET \
                 status = $2::application_status, \
                 validation_errors = $3 \
             WHERE id = $1 RETURNING {}",
            ApplicationRecord::COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(to.as_str())
            .bind(serde_json::to_value(validation_errors).expect("strings serialize"))
            .fetch_one(&mut *tx)
            .await?;
        let record = ApplicationRecord::from_row(&row)?;
        tx.commit().await?;
        Ok(record)
    }

    /// Audit trail for an application, oldest first.
    pub async fn audit_trail(&self, id: Uuid) -> PersistenceResult<Vec<AuditLogEntry>> {
        let rows = sqlx::query(
            "SELECT id, application_id, old_status::text AS old_status, \
                    new_status::text AS new_status, changed_by, change_reason, created_at \
             FROM audit_logs WHERE application_id = $1 ORDER BY created_at ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(AuditLogEntry::from_row).collect()
    }

    /// Ids of PENDING applications created before the cutoff. Used by the
    /// optional stale-application cancellation in maintenance.
    pub async fn stale_pending_ids(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> PersistenceResult<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT id FROM applications \
             WHERE status = 'PENDING' AND created_at < $1 AND deleted_at IS NULL \
             ORDER BY created_at ASC LIMIT $2",
        )
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| sqlx::Row::try_get(row, "id").map_err(PersistenceError::Database))
            .collect()
    }

    async fn lock_row(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> PersistenceResult<ApplicationRecord> {
        let sql = format!(
            "SELECT {} FROM applications WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
            ApplicationRecord::COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(PersistenceError::ApplicationNotFound(id))?;
        ApplicationRecord::from_row(&row)
    }

    async fn apply_attribution(
        tx: &mut Transaction<'_, Postgres>,
        attribution: Option<ChangeAttribution<'_>>,
    ) -> PersistenceResult<()> {
        if let Some(attr) = attribution {
            sqlx::query("SELECT set_config('app.changed_by', $1, TRUE)")
                .bind(attr.changed_by)
                .execute(&mut **tx)
                .await?;
            sqlx::query("SELECT set_config('app.change_reason', $1, TRUE)")
                .bind(attr.change_reason)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }
}
