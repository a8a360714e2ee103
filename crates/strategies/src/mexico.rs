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

//! Mexico (MX): CURP validation and Mexican credit rules.

use crate::providers::{BankingProvider, ProviderError};
use crate::rules::{self, ScoreCard};
use crate::strategy::{debt_to_income_ratio, payment_to_income_ratio, CountryStrategy, EvaluationInput};
use async_trait::async_trait;
use creditcore_domain::{BankingData, CountryCode, DocumentValidation, RiskAssessment};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Credit application strategy for Mexico.
///
/// Document: CURP, 18 characters (4 letters, 6 digits, sex marker, 5
/// letters, homoclave, check digit). Minimum income MXN 5,000, maximum
/// loan MXN 200,000, max debt-to-income 45%, minimum credit score 500.
pub struct MexicoStrategy {
    provider: Arc<dyn BankingProvider>,
}

impl MexicoStrategy {
    /// Create the strategy with its banking provider.
    pub fn new(provider: Arc<dyn BankingProvider>) -> Self {
        Self { provider }
    }

    fn min_income() -> Decimal {
        Decimal::new(5_000_00, 2)
    }

    fn max_loan() -> Decimal {
        Decimal::new(200_000_00, 2)
    }

    fn max_dti() -> Decimal {
        Decimal::new(450, 1)
    }

    const MIN_CREDIT_SCORE: i32 = 500;
}

#[async_trait]
impl CountryStrategy for MexicoStrategy {
    fn country(&self) -> CountryCode {
        CountryCode::Mx
    }

    fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    fn validate_document(&self, document: &str) -> DocumentValidation {
        let normalized: String = document
            .chars()
            .filter(|c| !matches!(c, ' ' | '-'))
            .collect::<String>()
            .to_ascii_uppercase();

        if normalized.len() != 18 {
            return DocumentValidation::invalid(vec![format!(
                "CURP must be exactly 18 characters long (received {})",
                normalized.len()
            )]);
        }

        let bytes = normalized.as_bytes();
        let mut errors = Vec::new();

        if !bytes[..4].iter().all(u8::is_ascii_alphabetic) {
            errors.push("CURP positions 1-4 must be letters".to_string());
        }
        if !bytes[4..10].iter().all(u8::is_ascii_digit) {
            errors.push("CURP positions 5-10 must be the birth date digits".to_string());
        }
        if !matches!(bytes[10], b'H' | b'M' | b'X') {
            errors.push("CURP position 11 must be the sex marker (H/M/X)".to_string());
        }
        if !bytes[11..16].iter().all(u8::is_ascii_alphabetic) {
            errors.push("CURP positions 12-16 must be letters".to_string());
        }
        if !bytes[17].is_ascii_digit() {
            errors.push("CURP position 18 must be the check digit".to_string());
        }

        if errors.is_empty() {
            DocumentValidation::valid(Vec::new())
        } else {
            DocumentValidation::invalid(errors)
        }
    }

    async fn fetch_banking_data(
        &self,
        document: &str,
        full_name: &str,
    ) -> Result<BankingData, ProviderError> {
        self.provider.fetch_banking_data(document, full_name).await
    }

    fn evaluate(&self, input: &EvaluationInput, banking: &BankingData) -> RiskAssessment {
        let mut card = ScoreCard::open(banking);

        if input.requested_amount > Self::max_loan() {
            return card.reject(format!(
                "Requested amount ({}) exceeds maximum allowed ({})",
                input.requested_amount,
                Self::max_loan()
            ));
        }

        if input.monthly_income < Self::min_income() {
            // Mexico weighs income shortfalls heavier than the EU markets.
            card.penalize(
                Decimal::new(40, 0),
                format!(
                    "Monthly income ({}) below minimum ({})",
                    input.monthly_income,
                    Self::min_income()
                ),
            );
        }

        let annual_income = input.monthly_income * Decimal::from(12u32);
        if input.requested_amount > annual_income * Decimal::from(3u32) {
            card.penalize(
                Decimal::new(35, 0),
                "Requested amount exceeds 3 years of income",
            );
        }

        if let Some(obligations) = banking.monthly_obligations {
            let dti = debt_to_income_ratio(input.monthly_income, obligations);
            if dti > Self::max_dti() {
                card.penalize(
                    rules::penalty_high_dti(),
                    format!("Debt-to-income ratio too high: {:.1}%", dti),
                );
            }
        }

        if let Some(score) = banking.credit_score {
            if score < Self::MIN_CREDIT_SCORE {
                card.penalize(
                    Decimal::new(30, 0),
                    format!(
                        "Credit score below minimum: {score} (min {})",
                        Self::MIN_CREDIT_SCORE
                    ),
                );
            } else if score >= rules::EXCELLENT_SCORE_THRESHOLD {
                card.reward(rules::bonus_excellent_credit(), "Excellent credit score");
            }
        }

        if banking.has_defaults {
            card.penalize(rules::penalty_defaults(), "Has active defaults in credit bureau");
            card.demand_review();
        }

        let payment_ratio = payment_to_income_ratio(input.requested_amount, input.monthly_income, 36);
        if payment_ratio > Decimal::new(35, 0) {
            card.penalize(
                Decimal::new(25, 0),
                format!("Estimated payment would be {:.1}% of income", payment_ratio),
            );
        }

        card.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockBankingProvider;
    use creditcore_domain::Recommendation;
    use rust_decimal_macros::dec;
    use serde_json::Map;

    fn strategy() -> MexicoStrategy {
        MexicoStrategy::new(Arc::new(MockBankingProvider::new(CountryCode::Mx)))
    }

    #[test]
    fn test_valid_curp() {
        assert!(strategy().validate_document("GARC800101HDFLNS09").is_valid);
    }

    #[test]
    fn test_invalid_sex_marker() {
        let result = strategy().validate_document("GARC800101QDFLNS09");
        assert!(!result.is_valid);
        assert!(result.errors[0].contains("sex marker"));
    }

    #[test]
    fn test_wrong_length() {
        assert!(!strategy().validate_document("GARC800101HDFLNS0").is_valid);
    }

    #[test]
    fn test_loan_to_income_multiple_penalized() {
        let banking = BankingData {
            provider_name: "Mexican Banking Provider (Buró de Crédito)".into(),
            account_status: "active".into(),
            credit_score: Some(650),
            total_debt: Some(dec!(0)),
            monthly_obligations: Some(dec!(0)),
            has_defaults: false,
            additional_data: Map::new(),
        };
        // 200,000 requested on 5,000/month = 3.3x annual income.
        let input = EvaluationInput {
            requested_amount: dec!(200000.00),
            monthly_income: dec!(5000.00),
            country_specific_data: Map::new(),
        };
        let assessment = strategy().evaluate(&input, &banking);
        assert_ne!(assessment.recommendation, Recommendation::Approve);
    }
}
