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

//! Banking-provider and risk-evaluation artifacts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Banking data obtained from (or synthesized for) a provider.
///
/// Persisted verbatim into the application's `banking_data` JSONB document.
/// Decimal fields serialize as strings to keep exact precision on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BankingData {
    /// Provider that produced the data; fallback artifacts carry an
    /// "(FALLBACK - Circuit Open)" annotation here.
    pub provider_name: String,
    /// Account standing reported by the provider.
    pub account_status: String,
    /// Credit score on the provider's scale, when known.
    pub credit_score: Option<i32>,
    /// Total outstanding debt.
    #[serde(with = "rust_decimal::serde::str_option")]
    pub total_debt: Option<Decimal>,
    /// Monthly debt service obligations.
    #[serde(with = "rust_decimal::serde::str_option")]
    pub monthly_obligations: Option<Decimal>,
    /// Whether the bureau reports active defaults.
    pub has_defaults: bool,
    /// Provider-specific extras; fallback artifacts set `fallback: true` here.
    #[serde(default)]
    pub additional_data: Map<String, Value>,
}

impl BankingData {
    /// Whether this value is a circuit-breaker fallback artifact rather than
    /// real provider data.
    pub fn is_fallback(&self) -> bool {
        self.additional_data
            .get("fallback")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Outcome of a pure document-format validation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentValidation {
    /// Whether the document is acceptable.
    pub is_valid: bool,
    /// Blocking problems (empty when valid).
    pub errors: Vec<String>,
    /// Non-blocking observations.
    pub warnings: Vec<String>,
}

impl DocumentValidation {
    /// A passing validation with optional warnings.
    pub fn valid(warnings: Vec<String>) -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings,
        }
    }

    /// A failing validation.
    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            errors,
            warnings: Vec::new(),
        }
    }
}

/// Evaluation recommendation produced by a country strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    /// Grant the credit.
    Approve,
    /// Deny the credit.
    Reject,
    /// Escalate to manual review.
    Review,
}

/// Risk classification ladder derived from the score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// Score below 30.
    Low,
    /// Score 30 to 49.
    Medium,
    /// Score 50 to 69.
    High,
    /// Score 70 and above.
    Critical,
}

impl RiskLevel {
    /// Classify a (clamped) risk score.
    pub fn from_score(score: Decimal) -> Self {
        if score >= Decimal::new(70, 0) {
            RiskLevel::Critical
        } else if score >= Decimal::new(50, 0) {
            RiskLevel::High
        } else if score >= Decimal::new(30, 0) {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Label stored into `country_specific_data.risk_level`.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

/// Result of applying a country's business rules to an application.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Score in [0, 100], two decimal places.
    pub risk_score: Decimal,
    /// Ladder classification of the score.
    pub risk_level: RiskLevel,
    /// What the pipeline should do with the application.
    pub recommendation: Recommendation,
    /// Human-readable reasons behind the score.
    pub reasons: Vec<String>,
    /// Set when a rule demands human judgment regardless of score.
    pub requires_review: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_risk_level_ladder() {
        assert_eq!(RiskLevel::from_score(dec!(0)), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(dec!(29.99)), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(dec!(30)), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(dec!(49.99)), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(dec!(50)), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(dec!(70)), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(dec!(100)), RiskLevel::Critical);
    }

    #[test]
    fn test_banking_data_decimal_fields_serialize_as_strings() {
        let data = BankingData {
            provider_name: "Spanish Banking Provider".into(),
            account_status: "active".into(),
            credit_score: Some(660),
            total_debt: Some(dec!(510.00)),
            monthly_obligations: Some(dec!(14.17)),
            has_defaults: false,
            additional_data: Map::new(),
        };
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["total_debt"], serde_json::json!("510.00"));
        assert_eq!(json["monthly_obligations"], serde_json::json!("14.17"));

        let back: BankingData = serde_json::from_value(json).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_fallback_detection() {
        let mut data = BankingData {
            provider_name: "x".into(),
            account_status: "active".into(),
            credit_score: None,
            total_debt: None,
            monthly_obligations: None,
            has_defaults: false,
            additional_data: Map::new(),
        };
        assert!(!data.is_fallback());
        data.additional_data
            .insert("fallback".into(), Value::Bool(true));
        assert!(data.is_fallback());
    }
}
