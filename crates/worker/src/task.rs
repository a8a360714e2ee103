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

//! The `process_credit_application` task body.

use crate::context::WorkerContext;
use creditcore_domain::money::clamp_risk_score;
use creditcore_domain::{ApplicationStatus, ProcessingError, Recommendation};
use creditcore_locks::{AcquireOptions, Lease, LockError};
use creditcore_persistence::{ApplicationRecord, PersistenceError};
use creditcore_queue::TaskEnvelope;
use creditcore_strategies::EvaluationInput;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Lease TTL; longer than the worst-case task duration so a dead holder
/// cannot deadlock an application for more than one task budget.
const LOCK_TTL: Duration = Duration::from_secs(300);

/// How long to wait for the lock before abandoning the task to the holder.
const LOCK_WAIT_BUDGET: Duration = Duration::from_secs(2);

/// Ceiling on a single provider call.
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

/// How a task run ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Pipeline ran to a decision.
    Processed {
        /// Status the application landed on.
        final_status: ApplicationStatus,
    },
    /// Another worker holds the application lock.
    SkippedAlreadyProcessing,
    /// The application was already at or past its decision point.
    AlreadyDecided {
        /// Status found on load.
        status: ApplicationStatus,
    },
}

/// Process one credit application.
///
/// At-least-once safe: duplicate deliveries either fail to take the lock
/// (skip) or find the application already decided (short-circuit). The
/// lease is released on every exit path below; if the process dies instead,
/// the TTL releases it.
pub async fn process_credit_application(
    ctx: &WorkerContext,
    envelope: &TaskEnvelope,
) -> Result<TaskOutcome, ProcessingError> {
    let raw_id = envelope
        .application_id()
        .ok_or_else(|| ProcessingError::InvalidApplicationId("missing argument".into()))?;
    let application_id = Uuid::parse_str(raw_id)
        .map_err(|_| ProcessingError::InvalidApplicationId(raw_id.to_string()))?;

    if let Some(trace) = &envelope.trace_context {
        debug!(traceparent = %trace.traceparent, "joining caller trace context");
    }

    let lease = match ctx
        .locks
        .acquire(AcquireOptions {
            lock_key: format!("process:{application_id}"),
            holder_id: ctx.worker_id.clone(),
            ttl: LOCK_TTL,
            wait_budget: LOCK_WAIT_BUDGET,
        })
        .await
    {
        Ok(lease) => lease,
        Err(LockError::AlreadyHeld(_)) => {
            info!(%application_id, "application locked by another worker, skipping");
            return Ok(TaskOutcome::SkippedAlreadyProcessing);
        }
        Err(err) => return Err(ProcessingError::Connection(err.to_string())),
    };

    let result = run_pipeline(ctx, application_id).await;
    release_lease(ctx, &lease).await;
    result
}

async fn run_pipeline(
    ctx: &WorkerContext,
    application_id: Uuid,
) -> Result<TaskOutcome, ProcessingError> {
    let application = ctx
        .repository
        .find_by_id(application_id)
        .await
        .map_err(map_persistence)?
        .ok_or_else(|| ProcessingError::ApplicationNotFound(application_id.to_string()))?;

    // At-least-once: a redelivered task for a decided application is done.
    match application.status {
        ApplicationStatus::Pending | ApplicationStatus::Validating => {}
        status => {
            info!(%application_id, %status, "application already decided, nothing to do");
            return Ok(TaskOutcome::AlreadyDecided { status });
        }
    }

    let application = if application.status == ApplicationStatus::Pending {
        let updated = ctx
            .repository
            .transition_status(application_id, ApplicationStatus::Validating, None)
            .await
            .map_err(map_persistence)?;
        ctx.broadcast(&updated).await;
        updated
    } else {
        // A previous attempt died after reaching VALIDATING; resume.
        application
    };

    let Some(strategy) = ctx.strategies.get(application.country) else {
        return park_unsupported_country(ctx, &application).await;
    };

    let (full_name, document) = application
        .decrypt_pii(&ctx.cipher)
        .map_err(|e| ProcessingError::Validation(format!("pii decryption failed: {e}")))?;

    let validation = strategy.validate_document(&document);
    if !validation.is_valid {
        info!(
            %application_id,
            errors = validation.errors.len(),
            "document validation failed, rejecting"
        );
        let rejected = ctx
            .repository
            .record_validation_failure(
                application_id,
                ApplicationStatus::Rejected,
                &validation.errors,
            )
            .await
            .map_err(map_persistence)?;
        ctx.broadcast(&rejected).await;
        return Ok(TaskOutcome::Processed {
            final_status: ApplicationStatus::Rejected,
        });
    }

    info!(
        %application_id,
        country = %application.country,
        "fetching banking data"
    );
    let banking = ctx
        .breakers
        .call(application.country, strategy.provider_name(), || async {
            match tokio::time::timeout(
                PROVIDER_TIMEOUT,
                strategy.fetch_banking_data(&document, &full_name),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(creditcore_strategies::ProviderError::Timeout(format!(
                    "no answer within {}s",
                    PROVIDER_TIMEOUT.as_secs()
                ))),
            }
        })
        .await
        .map_err(|err| ProcessingError::ProviderUnavailable(err.to_string()))?;

    let input = EvaluationInput {
        requested_amount: application.requested_amount,
        monthly_income: application.monthly_income,
        country_specific_data: application
            .country_specific_data
            .as_object()
            .cloned()
            .unwrap_or_default(),
    };
    let assessment = strategy.evaluate(&input, &banking);

    let target = if banking.is_fallback() {
        // Synthetic data never auto-decides.
        ApplicationStatus::UnderReview
    } else {
        match assessment.recommendation {
            Recommendation::Approve => ApplicationStatus::Approved,
            Recommendation::Reject => ApplicationStatus::Rejected,
            Recommendation::Review => ApplicationStatus::UnderReview,
        }
    };

    let banking_json = serde_json::to_value(&banking)
        .map_err(|e| ProcessingError::Validation(format!("banking data serialization: {e}")))?;
    let updated = ctx
        .repository
        .record_evaluation(
            application_id,
            target,
            clamp_risk_score(assessment.risk_score),
            banking_json,
            &assessment.reasons,
            assessment.risk_level.as_str(),
        )
        .await
        .map_err(map_persistence)?;
    ctx.broadcast(&updated).await;

    info!(
        %application_id,
        final_status = %target,
        risk_score = %assessment.risk_score,
        fallback = banking.is_fallback(),
        "application processed"
    );
    Ok(TaskOutcome::Processed {
        final_status: target,
    })
}

/// Country lost between insert and pickup: park the application for human
/// review and surface a permanent failure for the dead-letter path.
async fn park_unsupported_country(
    ctx: &WorkerContext,
    application: &ApplicationRecord,
) -> Result<TaskOutcome, ProcessingError> {
    let country = application.country.as_str().to_string();
    warn!(
        application_id = %application.id,
        country = %country,
        "no strategy registered for country"
    );
    let errors = vec![format!("Country '{country}' is not supported")];
    match ctx
        .repository
        .record_validation_failure(application.id, ApplicationStatus::UnderReview, &errors)
        .await
    {
        Ok(updated) => ctx.broadcast(&updated).await,
        Err(err) => warn!(
            application_id = %application.id,
            error = %err,
            "failed to park application for review"
        ),
    }
    Err(ProcessingError::UnsupportedCountry(country))
}

async fn release_lease(ctx: &WorkerContext, lease: &Lease) {
    if let Err(err) = ctx.locks.release(lease).await {
        warn!(lock_key = %lease.lock_key, error = %err, "failed to release lease");
    }
}

/// Persistence failures seen by the pipeline, classified for retry.
fn map_persistence(err: PersistenceError) -> ProcessingError {
    match err {
        PersistenceError::ApplicationNotFound(id) => {
            ProcessingError::ApplicationNotFound(id.to_string())
        }
        PersistenceError::InvalidTransition(e) => ProcessingError::StateTransition(e),
        PersistenceError::Crypto(message) => ProcessingError::Validation(message),
        PersistenceError::Decode(message) => ProcessingError::Validation(message),
        PersistenceError::IdempotencyConflict(_) | PersistenceError::DuplicateActiveApplication => {
            // Cannot happen on the worker's update paths; treat as permanent
            // input trouble rather than retrying forever.
            ProcessingError::Validation(err.to_string())
        }
        PersistenceError::Database(e) => ProcessingError::DatabaseUnavailable(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_persistence_classification() {
        let not_found = map_persistence(PersistenceError::ApplicationNotFound(Uuid::nil()));
        assert!(!not_found.is_retryable());
        assert_eq!(not_found.kind(), "ApplicationNotFound");

        let db = map_persistence(PersistenceError::Database(sqlx::Error::PoolTimedOut));
        assert!(db.is_retryable());
        assert_eq!(db.kind(), "DatabaseUnavailable");
    }
}
