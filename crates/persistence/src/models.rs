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

//! Row types returned by the repositories.
//!
//! Plain data, fully materialized at fetch time. Enum columns travel as
//! text (`status::text`) and parse into the domain enums here; a value
//! outside the closed sets is a decode error, not a panic.

use crate::crypto::PiiCipher;
use crate::{PersistenceError, PersistenceResult};
use chrono::{DateTime, Utc};
use creditcore_domain::{ApplicationStatus, CountryCode, Currency};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

/// Input for creating an application. PII arrives already encrypted.
#[derive(Clone, Debug)]
pub struct NewApplication {
    /// Market the application belongs to.
    pub country: CountryCode,
    /// Ciphertext of the applicant's full name.
    pub full_name: Vec<u8>,
    /// Ciphertext of the identity document.
    pub identity_document: Vec<u8>,
    /// Deterministic keyed digest of the document; carries the
    /// one-active-application uniqueness.
    pub document_fingerprint: Vec<u8>,
    /// Requested credit amount.
    pub requested_amount: Decimal,
    /// Applicant's monthly income.
    pub monthly_income: Decimal,
    /// Currency, already validated against the country.
    pub currency: Currency,
    /// Client-supplied idempotency key.
    pub idempotency_key: Option<String>,
    /// Opaque country-specific document.
    pub country_specific_data: Value,
}

/// An `applications` row.
#[derive(Clone, Debug)]
pub struct ApplicationRecord {
    /// Row id.
    pub id: Uuid,
    /// Market.
    pub country: CountryCode,
    /// Ciphertext of the full name.
    pub full_name: Vec<u8>,
    /// Ciphertext of the identity document.
    pub identity_document: Vec<u8>,
    /// Requested amount, NUMERIC(12,2).
    pub requested_amount: Decimal,
    /// Monthly income, NUMERIC(12,2).
    pub monthly_income: Decimal,
    /// ISO-4217 currency.
    pub currency: Currency,
    /// Idempotency key when the client supplied one.
    pub idempotency_key: Option<String>,
    /// Lifecycle status.
    pub status: ApplicationStatus,
    /// Country-specific document.
    pub country_specific_data: Value,
    /// Banking data document (provider output or webhook merge).
    pub banking_data: Value,
    /// Ordered validation errors.
    pub validation_errors: Vec<String>,
    /// Risk score once evaluated, NUMERIC(5,2).
    pub risk_score: Option<Decimal>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp (trigger-maintained).
    pub updated_at: DateTime<Utc>,
    /// Soft-delete timestamp.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ApplicationRecord {
    /// Column list used by every SELECT on `applications`.
    pub(crate) const COLUMNS: &'static str = "id, country::text AS country, full_name, \
         identity_document, requested_amount, monthly_income, currency, idempotency_key, \
         status::text AS status, country_specific_data, banking_data, validation_errors, \
         risk_score, created_at, updated_at, deleted_at";

    pub(crate) fn from_row(row: &PgRow) -> PersistenceResult<Self> {
        let country: String = row.try_get("country")?;
        let status: String = row.try_get("status")?;
        let currency: String = row.try_get("currency")?;
        let validation_errors: Value = row.try_get("validation_errors")?;
        Ok(Self {
            id: row.try_get("id")?,
            country: CountryCode::from_str(&country)
                .map_err(|e| PersistenceError::Decode(e.to_string()))?,
            full_name: row.try_get("full_name")?,
            identity_document: row.try_get("identity_document")?,
            requested_amount: row.try_get("requested_amount")?,
            monthly_income: row.try_get("monthly_income")?,
            currency: Currency::from_str(currency.trim())
                .map_err(|e| PersistenceError::Decode(e.to_string()))?,
            idempotency_key: row.try_get("idempotency_key")?,
            status: ApplicationStatus::from_str(&status)
                .map_err(|e| PersistenceError::Decode(e.to_string()))?,
            country_specific_data: row.try_get("country_specific_data")?,
            banking_data: row.try_get("banking_data")?,
            validation_errors: serde_json::from_value(validation_errors)
                .map_err(|e| PersistenceError::Decode(format!("validation_errors: {e}")))?,
            risk_score: row.try_get("risk_score")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }

    /// Decrypt the PII pair: (full_name, identity_document).
    pub fn decrypt_pii(&self, cipher: &PiiCipher) -> PersistenceResult<(String, String)> {
        Ok((
            cipher.decrypt(&self.full_name)?,
            cipher.decrypt(&self.identity_document)?,
        ))
    }
}

/// An `audit_logs` row.
#[derive(Clone, Debug)]
pub struct AuditLogEntry {
    /// Row id.
    pub id: Uuid,
    /// Application the change belongs to.
    pub application_id: Uuid,
    /// Status before the change; None for the initial insert path.
    pub old_status: Option<ApplicationStatus>,
    /// Status after the change.
    pub new_status: ApplicationStatus,
    /// Who made the change (`system`, `webhook:<provider>`, a user).
    pub changed_by: String,
    /// Free-form reason when supplied.
    pub change_reason: Option<String>,
    /// When the change happened.
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    pub(crate) fn from_row(row: &PgRow) -> PersistenceResult<Self> {
        let old_status: Option<String> = row.try_get("old_status")?;
        let new_status: String = row.try_get("new_status")?;
        Ok(Self {
            id: row.try_get("id")?,
            application_id: row.try_get("application_id")?,
            old_status: old_status
                .map(|s| ApplicationStatus::from_str(&s))
                .transpose()
                .map_err(|e| PersistenceError::Decode(e.to_string()))?,
            new_status: ApplicationStatus::from_str(&new_status)
                .map_err(|e| PersistenceError::Decode(e.to_string()))?,
            changed_by: row.try_get("changed_by")?,
            change_reason: row.try_get("change_reason")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Status of a pending job row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingJobStatus {
    /// Written by the trigger, not yet on the queue.
    Pending,
    /// Pushed to the work queue by the bridge.
    Enqueued,
    /// A worker is executing it.
    Processing,
    /// Terminal: done.
    Completed,
    /// Terminal: dead-lettered.
    Failed,
}

impl PendingJobStatus {
    /// Database enum label.
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingJobStatus::Pending => "pending",
            PendingJobStatus::Enqueued => "enqueued",
            PendingJobStatus::Processing => "processing",
            PendingJobStatus::Completed => "completed",
            PendingJobStatus::Failed => "failed",
        }
    }
}

impl FromStr for PendingJobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PendingJobStatus::Pending),
            "enqueued" => Ok(PendingJobStatus::Enqueued),
            "processing" => Ok(PendingJobStatus::Processing),
            "completed" => Ok(PendingJobStatus::Completed),
            "failed" => Ok(PendingJobStatus::Failed),
            other => Err(format!("unknown pending job status: {other}")),
        }
    }
}

/// A `pending_jobs` row.
#[derive(Clone, Debug)]
pub struct PendingJobRecord {
    /// Row id.
    pub id: Uuid,
    /// Application the job processes.
    pub application_id: Uuid,
    /// Task to execute.
    pub task_name: String,
    /// Positional task arguments.
    pub job_args: Value,
    /// Keyword task arguments.
    pub job_kwargs: Value,
    /// Job lifecycle status.
    pub status: PendingJobStatus,
    /// Queue handle recorded when the bridge enqueued it.
    pub queue_message_id: Option<String>,
    /// When the trigger created the row.
    pub created_at: DateTime<Utc>,
    /// When the bridge enqueued it.
    pub enqueued_at: Option<DateTime<Utc>>,
    /// When processing finished.
    pub processed_at: Option<DateTime<Utc>>,
    /// Last update (trigger-maintained).
    pub updated_at: DateTime<Utc>,
    /// Failure or skip note.
    pub error_message: Option<String>,
    /// Attempts so far.
    pub retry_count: i32,
}

impl PendingJobRecord {
    pub(crate) const COLUMNS: &'static str = "id, application_id, task_name, job_args, \
         job_kwargs, status::text AS status, queue_message_id, created_at, enqueued_at, \
         processed_at, updated_at, error_message, retry_count";

    pub(crate) fn from_row(row: &PgRow) -> PersistenceResult<Self> {
        let status: String = row.try_get("status")?;
        Ok(Self {
            id: row.try_get("id")?,
            application_id: row.try_get("application_id")?,
            task_name: row.try_get("task_name")?,
            job_args: row.try_get("job_args")?,
            job_kwargs: row.try_get("job_kwargs")?,
            status: PendingJobStatus::from_str(&status).map_err(PersistenceError::Decode)?,
            queue_message_id: row.try_get("queue_message_id")?,
            created_at: row.try_get("created_at")?,
            enqueued_at: row.try_get("enqueued_at")?,
            processed_at: row.try_get("processed_at")?,
            updated_at: row.try_get("updated_at")?,
            error_message: row.try_get("error_message")?,
            retry_count: row.try_get("retry_count")?,
        })
    }
}

/// Status of a webhook event row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WebhookEventStatus {
    /// Being handled.
    Processing,
    /// Handled successfully; replays short-circuit.
    Processed,
    /// Handling failed; replays may retry.
    Failed,
}

impl WebhookEventStatus {
    /// Database enum label.
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEventStatus::Processing => "processing",
            WebhookEventStatus::Processed => "processed",
            WebhookEventStatus::Failed => "failed",
        }
    }
}

impl FromStr for WebhookEventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(WebhookEventStatus::Processing),
            "processed" => Ok(WebhookEventStatus::Processed),
            "failed" => Ok(WebhookEventStatus::Failed),
            other => Err(format!("unknown webhook event status: {other}")),
        }
    }
}

/// A `webhook_events` row.
#[derive(Clone, Debug)]
pub struct WebhookEventRecord {
    /// Row id.
    pub id: Uuid,
    /// Provider reference, unique.
    pub idempotency_key: String,
    /// Application the event targets.
    pub application_id: Uuid,
    /// Full payload, kept for audit.
    pub payload: Value,
    /// Processing status.
    pub status: WebhookEventStatus,
    /// Failure detail when status is failed.
    pub error_message: Option<String>,
    /// When processing finished.
    pub processed_at: Option<DateTime<Utc>>,
    /// When the event was first received.
    pub created_at: DateTime<Utc>,
}

impl WebhookEventRecord {
    pub(crate) const COLUMNS: &'static str = "id, idempotency_key, application_id, payload, \
         status::text AS status, error_message, processed_at, created_at";

    pub(crate) fn from_row(row: &PgRow) -> PersistenceResult<Self> {
        let status: String = row.try_get("status")?;
        Ok(Self {
            id: row.try_get("id")?,
            idempotency_key: row.try_get("idempotency_key")?,
            application_id: row.try_get("application_id")?,
            payload: row.try_get("payload")?,
            status: WebhookEventStatus::from_str(&status).map_err(PersistenceError::Decode)?,
            error_message: row.try_get("error_message")?,
            processed_at: row.try_get("processed_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Input for dead-lettering a job.
#[derive(Clone, Debug)]
pub struct NewFailedJob {
    /// Queue message id of the failed job.
    pub job_id: String,
    /// Task name.
    pub task_name: String,
    /// Positional arguments.
    pub job_args: Value,
    /// Keyword arguments.
    pub job_kwargs: Value,
    /// Stable error kind name.
    pub error_type: String,
    /// Error message.
    pub error_message: String,
    /// Error chain rendering.
    pub error_traceback: Option<String>,
    /// Attempts made.
    pub retry_count: i32,
    /// Configured maximum attempts.
    pub max_retries: i32,
    /// Whether the hourly sweep may re-enqueue it.
    pub is_retryable: bool,
    /// Back-reference to the pending job, when known.
    pub pending_job_id: Option<Uuid>,
}

/// A `failed_jobs` row.
#[derive(Clone, Debug)]
pub struct FailedJobRecord {
    /// Row id.
    pub id: Uuid,
    /// Queue message id, unique.
    pub job_id: String,
    /// Task name.
    pub task_name: String,
    /// Positional arguments.
    pub job_args: Value,
    /// Keyword arguments.
    pub job_kwargs: Value,
    /// Stable error kind name.
    pub error_type: String,
    /// Error message.
    pub error_message: String,
    /// Attempts made.
    pub retry_count: i32,
    /// Configured maximum attempts.
    pub max_retries: i32,
    /// Review status: pending, reviewed, reprocessed, ignored, retried.
    pub status: String,
    /// Whether the sweep may re-enqueue it.
    pub is_retryable: bool,
    /// Back-reference to the pending job.
    pub pending_job_id: Option<Uuid>,
    /// When the job was dead-lettered.
    pub created_at: DateTime<Utc>,
}

impl FailedJobRecord {
    pub(crate) const COLUMNS: &'static str = "id, job_id, task_name, job_args, job_kwargs, \
         error_type, error_message, retry_count, max_retries, status, is_retryable, \
         pending_job_id, created_at";

    pub(crate) fn from_row(row: &PgRow) -> PersistenceResult<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            job_id: row.try_get("job_id")?,
            task_name: row.try_get("task_name")?,
            job_args: row.try_get("job_args")?,
            job_kwargs: row.try_get("job_kwargs")?,
            error_type: row.try_get("error_type")?,
            error_message: row.try_get("error_message")?,
            retry_count: row.try_get("retry_count")?,
            max_retries: row.try_get("max_retries")?,
            status: row.try_get("status")?,
            is_retryable: row.try_get("is_retryable")?,
            pending_job_id: row.try_get("pending_job_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
