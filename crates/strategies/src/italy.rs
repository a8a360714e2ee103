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

//! Italy (IT): Codice Fiscale validation and Italian credit rules.

use crate::providers::{BankingProvider, ProviderError};
use crate::rules::{self, ScoreCard};
use crate::strategy::{debt_to_income_ratio, payment_to_income_ratio, CountryStrategy, EvaluationInput};
use async_trait::async_trait;
use creditcore_domain::{BankingData, CountryCode, DocumentValidation, RiskAssessment};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Month letters used in positions 9 of the Codice Fiscale.
const VALID_MONTH_LETTERS: &str = "ABCDEHLMPRST";

/// Credit application strategy for Italy.
///
/// Document: Codice Fiscale, 16 alphanumeric characters
/// (`SSSNNNYYMDDCCCX`). The structural warnings mirror what the upstream
/// bureau tolerates; only length and character-class problems are fatal.
/// Minimum income EUR 1,200, maximum loan EUR 40,000, max debt-to-income
/// 35%, minimum credit score 550. Requests above two years of income
/// require a financial-stability review.
pub struct ItalyStrategy {
    provider: Arc<dyn BankingProvider>,
}

impl ItalyStrategy {
    /// Create the strategy with its banking provider.
    pub fn new(provider: Arc<dyn BankingProvider>) -> Self {
        Self { provider }
    }

    fn min_income() -> Decimal {
        Decimal::new(1_200_00, 2)
    }

    fn max_loan() -> Decimal {
        Decimal::new(40_000_00, 2)
    }

    fn max_dti() -> Decimal {
        Decimal::new(350, 1)
    }

    const MIN_CREDIT_SCORE: i32 = 550;
}

#[async_trait]
impl CountryStrategy for ItalyStrategy {
    fn country(&self) -> CountryCode {
        CountryCode::It
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

        if normalized.len() != 16 {
            return DocumentValidation::invalid(vec![format!(
                "Codice Fiscale must be exactly 16 characters long (received {})",
                normalized.len()
            )]);
        }
        if !normalized.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return DocumentValidation::invalid(vec![
                "Codice Fiscale must contain only letters and numbers".to_string(),
            ]);
        }

        let mut warnings = Vec::new();
        let bytes = normalized.as_bytes();

        if !bytes[..6].iter().all(u8::is_ascii_alphabetic) {
            warnings.push("First 6 characters should be letters".to_string());
        }
        if !bytes[6..8].iter().all(u8::is_ascii_digit) {
            warnings.push("Year part (characters 7-8) should be digits".to_string());
        }
        if !VALID_MONTH_LETTERS.contains(bytes[8] as char) {
            warnings.push(format!("Month character '{}' may be invalid", bytes[8] as char));
        }
        if !bytes[9..11].iter().all(u8::is_ascii_digit) {
            warnings.push("Day part (characters 10-11) should be digits".to_string());
        }
        if !(bytes[15] as char).is_ascii_alphabetic() {
            warnings.push("Check character (last) should be a letter".to_string());
        }

        DocumentValidation::valid(warnings)
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
            card.penalize(
                rules::penalty_low_income(),
                format!(
                    "Monthly income ({}) below minimum ({})",
                    input.monthly_income,
                    Self::min_income()
                ),
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
                    rules::penalty_low_credit(),
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

        // Italy keeps a tighter payment-ratio threshold than its neighbors.
        let payment_ratio = payment_to_income_ratio(input.requested_amount, input.monthly_income, 36);
        if payment_ratio > Decimal::new(30, 0) {
            card.penalize(
                rules::penalty_high_payment_ratio(),
                format!("New loan payment would be {:.1}% of income", payment_ratio),
            );
        }

        let annual_income = input.monthly_income * Decimal::from(12u32);
        if input.requested_amount > annual_income * Decimal::from(2u32) {
            card.penalize(
                rules::penalty_stability(),
                "Requested amount exceeds 2 years of income, stability review required",
            );
            card.demand_review();
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

    fn strategy() -> ItalyStrategy {
        ItalyStrategy::new(Arc::new(MockBankingProvider::new(CountryCode::It)))
    }

    #[test]
    fn test_valid_codice_fiscale() {
        let result = strategy().validate_document("RSSMRA80A01H501U");
        assert!(result.is_valid);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_wrong_length_is_fatal() {
        assert!(!strategy().validate_document("RSSMRA80A01H501").is_valid);
    }

    #[test]
    fn test_structural_problems_are_warnings() {
        // Digits where letters belong: tolerated with warnings.
        let result = strategy().validate_document("12SMRA80A01H501U");
        assert!(result.is_valid);
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn test_stability_check_demands_review() {
        let banking = BankingData {
            provider_name: "Italian Banking Provider".into(),
            account_status: "active".into(),
            credit_score: Some(700),
            total_debt: Some(dec!(0)),
            monthly_obligations: Some(dec!(0)),
            has_defaults: false,
            additional_data: Map::new(),
        };
        // 40,000 > 2 * 12 * 1,300 = 31,200
        let input = EvaluationInput {
            requested_amount: dec!(39000.00),
            monthly_income: dec!(1300.00),
            country_specific_data: Map::new(),
        };
        let assessment = strategy().evaluate(&input, &banking);
        assert!(assessment.requires_review);
        assert_ne!(assessment.recommendation, Recommendation::Approve);
    }
}
