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

//! Job-table and webhook-event stores.

use crate::models::{
    FailedJobRecord, NewFailedJob, PendingJobRecord, WebhookEventRecord,
};
use crate::PersistenceResult;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;
use uuid::Uuid;

/// Store over `pending_jobs`.
///
/// The claim/enqueue path is transactional by construction: the bridge
/// begins a transaction, claims rows with `FOR UPDATE SKIP LOCKED`, pushes
/// each to the queue, records the handle, and commits. A crash between the
/// queue push and the commit leaves the row at `pending`, visible to the
/// next tick — at-least-once enqueue, deduplicated downstream.
#[derive(Clone)]
pub struct PendingJobStore {
    pool: PgPool,
}

impl PendingJobStore {
    /// Create the store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Begin a claim transaction.
    pub async fn begin(&self) -> PersistenceResult<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    /// Claim up to `limit` pending rows, oldest first, skipping rows locked
    /// by concurrent bridge workers.
    pub async fn claim_pending(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        limit: i64,
    ) -> PersistenceResult<Vec<PendingJobRecord>> {
        let sql = format!(
            "SELECT {} FROM pending_jobs WHERE status = 'pending' \
             ORDER BY created_at ASC LIMIT $1 FOR UPDATE SKIP LOCKED",
            PendingJobRecord::COLUMNS
        );
        let rows = sqlx::query(&sql).bind(limit).fetch_all(&mut **tx).await?;
        rows.iter().map(PendingJobRecord::from_row).collect()
    }

    /// Record a successful queue push inside the claim transaction.
    pub async fn mark_enqueued(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        queue_message_id: &str,
    ) -> PersistenceResult<()> {
        sqlx::query(
            "UPDATE pending_jobs SET status = 'enqueued', queue_message_id = $2, \
             enqueued_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(id)
        .bind(queue_message_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Mark the row for a queue message as processing and bump its attempt
    /// counter. Returns the row, if one matches.
    pub async fn mark_processing(
        &self,
        queue_message_id: &str,
    ) -> PersistenceResult<Option<PendingJobRecord>> {
        let sql = format!(
            "UPDATE pending_jobs SET status = 'processing', retry_count = retry_count + 1 \
             WHERE queue_message_id = $1 AND status IN ('enqueued', 'processing', 'pending') \
             RETURNING {}",
            PendingJobRecord::COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(queue_message_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| PendingJobRecord::from_row(&r)).transpose()
    }

    /// Terminal success. `note` records skip reasons ("already processing").
    pub async fn mark_completed(
        &self,
        queue_message_id: &str,
        note: Option<&str>,
    ) -> PersistenceResult<()> {
        sqlx::query(
            "UPDATE pending_jobs SET status = 'completed', processed_at = CURRENT_TIMESTAMP, \
             error_message = $2 WHERE queue_message_id = $1",
        )
        .bind(queue_message_id)
        .bind(note)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Terminal failure; the job is dead-lettered separately.
    pub async fn mark_failed(
        &self,
        queue_message_id: &str,
        error_message: &str,
    ) -> PersistenceResult<()> {
        sqlx::query(
            "UPDATE pending_jobs SET status = 'failed', processed_at = CURRENT_TIMESTAMP, \
             error_message = $2 WHERE queue_message_id = $1",
        )
        .bind(queue_message_id)
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Return an interrupted job to `pending` so the next bridge tick
    /// re-enqueues it (shutdown mid-task).
    pub async fn release_for_retry(&self, queue_message_id: &str) -> PersistenceResult<()> {
        sqlx::query(
            "UPDATE pending_jobs SET status = 'pending', queue_message_id = NULL \
             WHERE queue_message_id = $1 AND status = 'processing'",
        )
        .bind(queue_message_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Reset `processing` rows whose last update is older than the cutoff.
    /// Covers workers that died holding a job; the lock TTL has expired by
    /// then, so re-running is safe.
    pub async fn reclaim_orphans(&self, older_than: Duration) -> PersistenceResult<u64> {
        let result = sqlx::query(
            "UPDATE pending_jobs SET status = 'pending', queue_message_id = NULL \
             WHERE status = 'processing' \
               AND updated_at < CURRENT_TIMESTAMP - $1::interval",
        )
        .bind(format!("{} seconds", older_than.as_secs()))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Insert a fresh, already-enqueued row for a dead-letter retry.
    pub async fn insert_enqueued(
        &self,
        application_id: Uuid,
        task_name: &str,
        job_args: &Value,
        job_kwargs: &Value,
        queue_message_id: &str,
    ) -> PersistenceResult<PendingJobRecord> {
        let sql = format!(
            "INSERT INTO pending_jobs \
                 (application_id, task_name, job_args, job_kwargs, status, queue_message_id, enqueued_at) \
             VALUES ($1, $2, $3, $4, 'enqueued', $5, CURRENT_TIMESTAMP) \
             RETURNING {}",
            PendingJobRecord::COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(application_id)
            .bind(task_name)
            .bind(job_args)
            .bind(job_kwargs)
            .bind(queue_message_id)
            .fetch_one(&self.pool)
            .await?;
        PendingJobRecord::from_row(&row)
    }

    /// Pending job for an application, most recent first. Test and
    /// diagnostics helper.
    pub async fn find_by_application(
        &self,
        application_id: Uuid,
    ) -> PersistenceResult<Vec<PendingJobRecord>> {
        let sql = format!(
            "SELECT {} FROM pending_jobs WHERE application_id = $1 ORDER BY created_at DESC",
            PendingJobRecord::COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(application_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(PendingJobRecord::from_row).collect()
    }
}

/// Store over `failed_jobs` (the dead-letter table).
#[derive(Clone)]
pub struct FailedJobStore {
    pool: PgPool,
}

impl FailedJobStore {
    /// Create the store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Dead-letter a job. Replayed inserts for the same job id are ignored.
    pub async fn insert(&self, new: NewFailedJob) -> PersistenceResult<()> {
        sqlx::query(
            "INSERT INTO failed_jobs \
                 (job_id, task_name, job_args, job_kwargs, error_type, error_message, \
                  error_traceback, retry_count, max_retries, is_retryable, pending_job_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (job_id) DO NOTHING",
        )
        .bind(&new.job_id)
        .bind(&new.task_name)
        .bind(&new.job_args)
        .bind(&new.job_kwargs)
        .bind(&new.error_type)
        .bind(&new.error_message)
        .bind(&new.error_traceback)
        .bind(new.retry_count)
        .bind(new.max_retries)
        .bind(new.is_retryable)
        .bind(new.pending_job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Retryable, unreviewed failures, oldest first.
    pub async fn list_retryable(&self, limit: i64) -> PersistenceResult<Vec<FailedJobRecord>> {
        let sql = format!(
            "SELECT {} FROM failed_jobs \
             WHERE is_retryable AND status = 'pending' \
             ORDER BY created_at ASC LIMIT $1",
            FailedJobRecord::COLUMNS
        );
        let rows = sqlx::query(&sql).bind(limit).fetch_all(&self.pool).await?;
        rows.iter().map(FailedJobRecord::from_row).collect()
    }

    /// Mark a failure as re-enqueued.
    pub async fn mark_retried(&self, id: Uuid, new_job_id: &str) -> PersistenceResult<()> {
        sqlx::query(
            "UPDATE failed_jobs SET status = 'retried', reprocessed_job_id = $2, \
             reprocessed_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(id)
        .bind(new_job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Failure row for a queue message, if any. Test and diagnostics helper.
    pub async fn find_by_job_id(&self, job_id: &str) -> PersistenceResult<Option<FailedJobRecord>> {
        let sql = format!(
            "SELECT {} FROM failed_jobs WHERE job_id = $1",
            FailedJobRecord::COLUMNS
        );
        let row = sqlx::query(&sql).bind(job_id).fetch_optional(&self.pool).await?;
        row.map(|r| FailedJobRecord::from_row(&r)).transpose()
    }
}

/// Result of the idempotent webhook-event insert.
#[derive(Debug)]
pub enum WebhookEventInsert {
    /// First time this idempotency key was seen; process the event.
    Inserted(WebhookEventRecord),
    /// Key already exists; the handler decides based on its status.
    Duplicate(WebhookEventRecord),
}

/// Store over `webhook_events`.
#[derive(Clone)]
pub struct WebhookEventStore {
    pool: PgPool,
}

impl WebhookEventStore {
    /// Create the store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert an event keyed by the provider reference.
    ///
    /// `ON CONFLICT DO NOTHING` plus a follow-up fetch makes concurrent
    /// deliveries of the same reference race-safe: exactly one caller
    /// observes `Inserted`.
    pub async fn insert(
        &self,
        idempotency_key: &str,
        application_id: Uuid,
        payload: &Value,
    ) -> PersistenceResult<WebhookEventInsert> {
        let sql = format!(
            "INSERT INTO webhook_events (idempotency_key, application_id, payload) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (idempotency_key) DO NOTHING \
             RETURNING {}",
            WebhookEventRecord::COLUMNS
        );
        let inserted = sqlx::query(&sql)
            .bind(idempotency_key)
            .bind(application_id)
            .bind(payload)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = inserted {
            return Ok(WebhookEventInsert::Inserted(WebhookEventRecord::from_row(
                &row,
            )?));
        }

        let sql = format!(
            "SELECT {} FROM webhook_events WHERE idempotency_key = $1",
            WebhookEventRecord::COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(idempotency_key)
            .fetch_one(&self.pool)
            .await?;
        Ok(WebhookEventInsert::Duplicate(WebhookEventRecord::from_row(
            &row,
        )?))
    }

    /// Mark an event processed.
    pub async fn mark_processed(&self, id: Uuid) -> PersistenceResult<()> {
        sqlx::query(
            "UPDATE webhook_events SET status = 'processed', processed_at = CURRENT_TIMESTAMP \
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Mark an event failed with a reason.
    pub async fn mark_failed(&self, id: Uuid, reason: &str) -> PersistenceResult<()> {
        sqlx::query("UPDATE webhook_events SET status = 'failed', error_message = $2 WHERE id = $1")
            .bind(id)
            .bind(reason)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Reset a previously failed event for a retry delivery.
    pub async fn reset_for_retry(&self, id: Uuid) -> PersistenceResult<()> {
        sqlx::query(
            "UPDATE webhook_events SET status = 'processing', error_message = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// TTL cleanup: delete events older than `days`. Returns rows deleted.
    pub async fn delete_older_than_days(&self, days: i64) -> PersistenceResult<u64> {
        let result = sqlx::query(
            "DELETE FROM webhook_events \
             WHERE created_at < CURRENT_TIMESTAMP - make_interval(days => $1::int)",
        )
        .bind(days as i32)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
