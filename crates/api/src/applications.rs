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

//! `POST /applications`: intake validation and the insert that starts the
//! pipeline.
//!
//! The handler's only asynchronous obligation is the insert; enqueueing is
//! the database trigger's job. Validation fails fast here so bad input
//! never reaches the pipeline.

use crate::error::ApiError;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use creditcore_domain::money::validate_amount;
use creditcore_domain::{CountryCode, Currency};
use creditcore_persistence::crypto::mask_document;
use creditcore_persistence::{ApplicationRecord, NewApplication, PersistenceError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use tracing::info;

const MIN_NAME_LEN: usize = 3;
const MAX_NAME_LEN: usize = 255;
const MIN_DOCUMENT_LEN: usize = 5;
const MAX_DOCUMENT_LEN: usize = 50;

/// Create-application request body.
#[derive(Debug, Deserialize)]
pub struct CreateApplicationRequest {
    /// Two-letter country code.
    pub country: String,
    /// Applicant's full name (at least first and last).
    pub full_name: String,
    /// Identity document in the country's format.
    pub identity_document: String,
    /// Requested amount; string form keeps precision exact.
    pub requested_amount: Decimal,
    /// Monthly income.
    pub monthly_income: Decimal,
    /// ISO-4217 currency; inferred from the country when omitted.
    pub currency: Option<String>,
    /// Client idempotency key.
    pub idempotency_key: Option<String>,
    /// Opaque country-specific document.
    pub country_specific_data: Option<Value>,
}

/// Application as returned to clients. PII is decrypted here and only here;
/// the document is masked.
#[derive(Debug, Serialize)]
pub struct ApplicationResponse {
    /// Application id.
    pub id: String,
    /// Country code.
    pub country: String,
    /// Decrypted full name.
    pub full_name: String,
    /// Masked identity document (last four characters visible).
    pub identity_document: String,
    /// Requested amount as an exact string.
    pub requested_amount: String,
    /// Monthly income as an exact string.
    pub monthly_income: String,
    /// Currency code.
    pub currency: String,
    /// Current status.
    pub status: String,
    /// Risk score, when evaluated.
    pub risk_score: Option<String>,
    /// Validation errors, when any.
    pub validation_errors: Vec<String>,
    /// Creation timestamp, RFC 3339.
    pub created_at: String,
    /// Last-update timestamp, RFC 3339.
    pub updated_at: String,
}

impl ApplicationResponse {
    /// Build the response shape from a row, decrypting and masking PII.
    pub fn from_record(
        record: &ApplicationRecord,
        cipher: &creditcore_persistence::PiiCipher,
    ) -> Result<Self, ApiError> {
        let (full_name, document) = record
            .decrypt_pii(cipher)
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        Ok(Self {
            id: record.id.to_string(),
            country: record.country.as_str().to_string(),
            full_name,
            identity_document: mask_document(&document),
            requested_amount: record.requested_amount.to_string(),
            monthly_income: record.monthly_income.to_string(),
            currency: record.currency.as_str().to_string(),
            status: record.status.as_str().to_string(),
            risk_score: record.risk_score.map(|score| score.to_string()),
            validation_errors: record.validation_errors.clone(),
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
        })
    }
}

/// Handler for `POST /applications`.
pub async fn create_application(
    State(state): State<AppState>,
    Json(request): Json<CreateApplicationRequest>,
) -> Result<(StatusCode, Json<ApplicationResponse>), ApiError> {
    let (country, currency, document) = validate_request(&state.strategies, &request)?;

    // Idempotency replays resolve to the existing application.
    if let Some(key) = request.idempotency_key.as_deref() {
        if let Some(existing) = state
            .repository
            .find_by_idempotency_key(key)
            .await
            .map_err(ApiError::from)?
        {
            info!(application_id = %existing.id, "idempotency key replay");
            return Ok((
                StatusCode::CREATED,
                Json(ApplicationResponse::from_record(&existing, &state.cipher)?),
            ));
        }
    }

    let full_name = request.full_name.trim().to_string();
    let new = NewApplication {
        country,
        full_name: state
            .cipher
            .encrypt(&full_name)
            .map_err(|e| ApiError::Internal(e.to_string()))?,
        identity_document: state
            .cipher
            .encrypt(&document)
            .map_err(|e| ApiError::Internal(e.to_string()))?,
        document_fingerprint: state.cipher.document_fingerprint(&document),
        requested_amount: request.requested_amount,
        monthly_income: request.monthly_income,
        currency,
        idempotency_key: request.idempotency_key.clone(),
        country_specific_data: request
            .country_specific_data
            .clone()
            .unwrap_or_else(|| Value::Object(Default::default())),
    };

    let record = match state.repository.insert(new).await {
        Ok(record) => record,
        // Insert raced with another replay of the same key.
        Err(PersistenceError::IdempotencyConflict(key)) => state
            .repository
            .find_by_idempotency_key(&key)
            .await
            .map_err(ApiError::from)?
            .ok_or_else(|| ApiError::Internal("idempotency conflict without row".into()))?,
        Err(err) => return Err(err.into()),
    };

    info!(
        application_id = %record.id,
        country = %record.country,
        document = %mask_document(&document),
        "application created"
    );
    Ok((
        StatusCode::CREATED,
        Json(ApplicationResponse::from_record(&record, &state.cipher)?),
    ))
}

/// Fail-fast input validation. Returns the parsed country, the resolved
/// currency, and the normalized document.
fn validate_request(
    strategies: &creditcore_strategies::StrategyRegistry,
    request: &CreateApplicationRequest,
) -> Result<(CountryCode, Currency, String), ApiError> {
    let mut errors = Vec::new();

    let country = CountryCode::from_str(&request.country).map_err(|_| {
        ApiError::Validation(vec![format!(
            "Country '{}' is not supported",
            request.country
        )])
    })?;

    let name = request.full_name.trim();
    if name.len() < MIN_NAME_LEN || name.len() > MAX_NAME_LEN {
        errors.push(format!(
            "Full name must be between {MIN_NAME_LEN} and {MAX_NAME_LEN} characters"
        ));
    } else if name.split_whitespace().count() < 2 {
        errors.push("Full name should include at least first and last name".to_string());
    }

    let document = request.identity_document.trim().to_string();
    if document.len() < MIN_DOCUMENT_LEN || document.len() > MAX_DOCUMENT_LEN {
        errors.push(format!(
            "Identity document must be between {MIN_DOCUMENT_LEN} and {MAX_DOCUMENT_LEN} characters"
        ));
    }

    if let Err(err) = validate_amount(request.requested_amount) {
        errors.push(format!("requested_amount: {err}"));
    }
    if let Err(err) = validate_amount(request.monthly_income) {
        errors.push(format!("monthly_income: {err}"));
    }

    let currency = match &request.currency {
        None => country.currency(),
        Some(raw) => match Currency::from_str(raw) {
            Ok(currency) if currency == country.currency() => currency,
            Ok(currency) => {
                errors.push(format!(
                    "Currency {currency} does not match {country}'s currency {}",
                    country.currency()
                ));
                country.currency()
            }
            Err(_) => {
                errors.push(format!("Unknown currency '{raw}'"));
                country.currency()
            }
        },
    };

    // Country document format check runs last so the cheap checks above
    // report first.
    if errors.is_empty() {
        if let Some(strategy) = strategies.get(country) {
            let validation = strategy.validate_document(&document);
            if !validation.is_valid {
                errors.extend(validation.errors);
            }
        }
    }

    if errors.is_empty() {
        Ok((country, currency, document))
    } else {
        Err(ApiError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use creditcore_strategies::StrategyRegistry;
    use rust_decimal_macros::dec;

    fn request() -> CreateApplicationRequest {
        CreateApplicationRequest {
            country: "ES".into(),
            full_name: "Juan García López".into(),
            identity_document: "12345678Z".into(),
            requested_amount: dec!(15000.00),
            monthly_income: dec!(3500.00),
            currency: Some("EUR".into()),
            idempotency_key: Some("k1".into()),
            country_specific_data: None,
        }
    }

    fn registry() -> StrategyRegistry {
        StrategyRegistry::with_mock_providers()
    }

    #[test]
    fn test_request_body_parses_string_amounts() {
        let body = r#"{
            "country": "ES",
            "full_name": "Juan García López",
            "identity_document": "12345678Z",
            "requested_amount": "15000.00",
            "monthly_income": "3500.00",
            "currency": "EUR",
            "idempotency_key": "k1"
        }"#;
        let parsed: CreateApplicationRequest = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.requested_amount, dec!(15000.00));
        assert_eq!(parsed.monthly_income, dec!(3500.00));
    }

    #[test]
    fn test_valid_request_passes() {
        let (country, currency, document) = validate_request(&registry(), &request()).unwrap();
        assert_eq!(country, CountryCode::Es);
        assert_eq!(currency, Currency::Eur);
        assert_eq!(document, "12345678Z");
    }

    #[test]
    fn test_currency_inferred_when_omitted() {
        let mut r = request();
        r.currency = None;
        let (_, currency, _) = validate_request(&registry(), &r).unwrap();
        assert_eq!(currency, Currency::Eur);
    }

    #[test]
    fn test_currency_mismatch_rejected() {
        let mut r = request();
        r.currency = Some("BRL".into());
        let err = validate_request(&registry(), &r).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_unknown_country_rejected() {
        let mut r = request();
        r.country = "AR".into();
        let err = validate_request(&registry(), &r).unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors[0].contains("not supported"));
    }

    #[test]
    fn test_single_word_name_rejected() {
        let mut r = request();
        r.full_name = "Juan".into();
        let err = validate_request(&registry(), &r).unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.iter().any(|e| e.contains("first and last name")));
    }

    #[test]
    fn test_precision_overflow_rejected() {
        let mut r = request();
        r.requested_amount = dec!(10000000000.00);
        let err = validate_request(&registry(), &r).unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.iter().any(|e| e.contains("requested_amount")));
    }

    #[test]
    fn test_bad_document_checksum_rejected() {
        let mut r = request();
        r.identity_document = "12345678A".into();
        let err = validate_request(&registry(), &r).unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.iter().any(|e| e.contains("check letter")));
    }
}
