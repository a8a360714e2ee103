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

//! `POST /webhooks/bank-confirmation`: authenticated, idempotent provider
//! confirmations.
//!
//! Order matters: size check, then signature over the raw body, then
//! parsing, then the idempotent event insert, then the transition. The
//! event row commits before the transition, so replays short-circuit even
//! when processing fails mid-way.

use crate::error::ApiError;
use crate::{AppState, MAX_WEBHOOK_PAYLOAD_BYTES};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use creditcore_domain::ApplicationStatus;
use creditcore_persistence::{PersistenceError, WebhookEventInsert, WebhookEventStatus};
use creditcore_realtime::UpdatePayload;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

/// Header carrying the HMAC signature.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Bank-confirmation payload.
#[derive(Debug, Deserialize)]
pub struct BankConfirmation {
    /// Application the confirmation targets.
    pub application_id: Uuid,
    /// Provider's reference; the idempotency key.
    pub provider_reference: String,
    /// Target status: APPROVED or REJECTED.
    pub outcome: ConfirmationOutcome,
    /// Provider name, used for audit attribution.
    #[serde(default)]
    pub provider: Option<String>,
    /// Confirmed credit score.
    #[serde(default)]
    pub credit_score: Option<i32>,
    /// Confirmed total debt.
    #[serde(default)]
    pub total_debt: Option<Decimal>,
    /// Confirmed monthly obligations.
    #[serde(default)]
    pub monthly_obligations: Option<Decimal>,
    /// Confirmed default flag.
    #[serde(default)]
    pub has_defaults: Option<bool>,
    /// When the provider verified the data.
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
}

/// Allowed webhook outcomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfirmationOutcome {
    /// Approve the application.
    Approved,
    /// Reject the application.
    Rejected,
}

impl ConfirmationOutcome {
    fn status(self) -> ApplicationStatus {
        match self {
            ConfirmationOutcome::Approved => ApplicationStatus::Approved,
            ConfirmationOutcome::Rejected => ApplicationStatus::Rejected,
        }
    }
}

/// Handler for `POST /webhooks/bank-confirmation`.
pub async fn bank_confirmation(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    // Content-Length first, then the actual body, in case the header lied.
    if let Some(length) = headers
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
    {
        if length > MAX_WEBHOOK_PAYLOAD_BYTES {
            return Err(ApiError::PayloadTooLarge);
        }
    }
    if body.len() > MAX_WEBHOOK_PAYLOAD_BYTES {
        return Err(ApiError::PayloadTooLarge);
    }

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;
    if !state.webhook_signature.verify(&body, signature) {
        warn!("webhook signature mismatch");
        return Err(ApiError::Unauthorized);
    }

    let confirmation: BankConfirmation = serde_json::from_slice(&body)
        .map_err(|e| ApiError::Validation(vec![format!("invalid webhook payload: {e}")]))?;
    if confirmation.provider_reference.is_empty() {
        return Err(ApiError::Validation(vec![
            "provider_reference is required".to_string(),
        ]));
    }
    let payload_json: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::Validation(vec![format!("invalid webhook payload: {e}")]))?;

    // The application must exist before an event row can reference it.
    state
        .repository
        .find_by_id(confirmation.application_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "application {} not found",
                confirmation.application_id
            ))
        })?;

    let event = match state
        .webhook_events
        .insert(
            &confirmation.provider_reference,
            confirmation.application_id,
            &payload_json,
        )
        .await
        .map_err(ApiError::from)?
    {
        WebhookEventInsert::Inserted(event) => event,
        WebhookEventInsert::Duplicate(event) => match event.status {
            WebhookEventStatus::Processed => {
                info!(
                    idempotency_key = %event.idempotency_key,
                    application_id = %event.application_id,
                    "webhook already processed, idempotent response"
                );
                return Ok((
                    StatusCode::OK,
                    Json(json!({
                        "message": "webhook already processed",
                        "application_id": event.application_id.to_string(),
                        "already_processed": true,
                    })),
                ));
            }
            // A previous delivery failed mid-processing; retry it.
            WebhookEventStatus::Processing | WebhookEventStatus::Failed => {
                state
                    .webhook_events
                    .reset_for_retry(event.id)
                    .await
                    .map_err(ApiError::from)?;
                event
            }
        },
    };

    let target = confirmation.outcome.status();
    let changed_by = format!(
        "webhook:{}",
        confirmation.provider.as_deref().unwrap_or("bank")
    );
    let banking_patch = banking_patch(&confirmation);

    let updated = match state
        .repository
        .apply_webhook_outcome(
            confirmation.application_id,
            target,
            banking_patch,
            &changed_by,
        )
        .await
    {
        Ok(updated) => updated,
        Err(PersistenceError::InvalidTransition(err)) => {
            state
                .webhook_events
                .mark_failed(event.id, &format!("invalid transition: {err}"))
                .await
                .map_err(ApiError::from)?;
            return Err(ApiError::Unprocessable(format!(
                "invalid transition: {err}"
            )));
        }
        Err(err) => {
            let reason = err.to_string();
            if let Err(mark_err) = state.webhook_events.mark_failed(event.id, &reason).await {
                warn!(error = %mark_err, "failed to mark webhook event failed");
            }
            return Err(err.into());
        }
    };

    state
        .webhook_events
        .mark_processed(event.id)
        .await
        .map_err(ApiError::from)?;

    // Best-effort fan-out; the confirmation is already durable.
    let update = UpdatePayload {
        id: updated.id.to_string(),
        status: updated.status.as_str().to_string(),
        risk_score: updated.risk_score.map(|score| score.to_string()),
        updated_at: Some(updated.updated_at.to_rfc3339()),
    };
    if let Err(err) = state.publisher.publish_update(&update).await {
        warn!(application_id = %updated.id, error = %err, "failed to publish webhook update");
    }

    info!(
        application_id = %updated.id,
        status = %updated.status,
        idempotency_key = %confirmation.provider_reference,
        "bank confirmation processed"
    );
    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "webhook processed",
            "application_id": updated.id.to_string(),
            "status": updated.status.as_str(),
            "already_processed": false,
        })),
    ))
}

/// Banking-data document merged into the application. Decimals become
/// strings so the JSONB round-trip stays exact.
fn banking_patch(confirmation: &BankConfirmation) -> Value {
    json!({
        "provider_reference": confirmation.provider_reference,
        "credit_score": confirmation.credit_score,
        "total_debt": confirmation.total_debt.map(|d| d.to_string()),
        "monthly_obligations": confirmation.monthly_obligations.map(|d| d.to_string()),
        "has_defaults": confirmation.has_defaults,
        "verified_at": confirmation.verified_at.map(|t| t.to_rfc3339()),
        "webhook_received": true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_parses_scenario_shape() {
        let body = r#"{
            "provider_reference": "r1",
            "application_id": "8f14e45f-ceea-4e6f-b7fe-d87b1b2c3d4e",
            "outcome": "APPROVED",
            "credit_score": 720
        }"#;
        let parsed: BankConfirmation = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.provider_reference, "r1");
        assert_eq!(parsed.outcome, ConfirmationOutcome::Approved);
        assert_eq!(parsed.credit_score, Some(720));
        assert_eq!(parsed.outcome.status(), ApplicationStatus::Approved);
    }

    #[test]
    fn test_unknown_outcome_rejected() {
        let body = r#"{
            "provider_reference": "r1",
            "application_id": "8f14e45f-ceea-4e6f-b7fe-d87b1b2c3d4e",
            "outcome": "MAYBE"
        }"#;
        assert!(serde_json::from_str::<BankConfirmation>(body).is_err());
    }

    #[test]
    fn test_banking_patch_keeps_decimals_as_strings() {
        let confirmation = BankConfirmation {
            application_id: Uuid::nil(),
            provider_reference: "r1".into(),
            outcome: ConfirmationOutcome::Approved,
            provider: Some("serasa".into()),
            credit_score: Some(720),
            total_debt: Some(Decimal::new(1234_56, 2)),
            monthly_obligations: None,
            has_defaults: Some(false),
            verified_at: None,
        };
        let patch = banking_patch(&confirmation);
        assert_eq!(patch["total_debt"], json!("1234.56"));
        assert_eq!(patch["webhook_received"], json!(true));
    }
}
