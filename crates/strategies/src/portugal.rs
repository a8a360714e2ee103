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

//! Portugal (PT): NIF validation and Portuguese credit rules.

use crate::providers::{BankingProvider, ProviderError};
use crate::rules::{self, ScoreCard};
use crate::strategy::{debt_to_income_ratio, payment_to_income_ratio, CountryStrategy, EvaluationInput};
use async_trait::async_trait;
use creditcore_domain::{BankingData, CountryCode, DocumentValidation, RiskAssessment};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Credit application strategy for Portugal.
///
/// Document: NIF, 9 digits with a mod-11 check digit. Minimum income
/// EUR 800, maximum loan EUR 30,000, max debt-to-income 35%, minimum
/// credit score 550.
pub struct PortugalStrategy {
    provider: Arc<dyn BankingProvider>,
}

impl PortugalStrategy {
    /// Create the strategy with its banking provider.
    pub fn new(provider: Arc<dyn BankingProvider>) -> Self {
        Self { provider }
    }

    fn min_income() -> Decimal {
        Decimal::new(800_00, 2)
    }

    fn max_loan() -> Decimal {
        Decimal::new(30_000_00, 2)
    }

    fn max_dti() -> Decimal {
        Decimal::new(350, 1)
    }

    const MIN_CREDIT_SCORE: i32 = 550;
}

#[async_trait]
impl CountryStrategy for PortugalStrategy {
    fn country(&self) -> CountryCode {
        CountryCode::Pt
    }

    fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    fn validate_document(&self, document: &str) -> DocumentValidation {
        let normalized: String = document
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '.'))
            .collect();

        if normalized.len() != 9 || !normalized.bytes().all(|b| b.is_ascii_digit()) {
            return DocumentValidation::invalid(vec![
                "NIF must be exactly 9 digits".to_string(),
            ]);
        }

        let digits: Vec<u32> = normalized.bytes().map(|b| (b - b'0') as u32).collect();
        if !matches!(digits[0], 1 | 2 | 3 | 5 | 6 | 8 | 9) {
            return DocumentValidation::invalid(vec![format!(
                "NIF cannot start with digit {}",
                digits[0]
            )]);
        }

        // Mod-11: weighted sum of the first 8 digits, weights 9..2.
        let sum: u32 = digits[..8]
            .iter()
            .enumerate()
            .map(|(i, d)| d * (9 - i as u32))
            .sum();
        let check = match 11 - (sum % 11) {
            10 | 11 => 0,
            other => other,
        };

        if digits[8] != check {
            return DocumentValidation::invalid(vec!["Invalid NIF check digit".to_string()]);
        }

        DocumentValidation::valid(Vec::new())
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

        let payment_ratio = payment_to_income_ratio(input.requested_amount, input.monthly_income, 36);
        if payment_ratio > Decimal::new(35, 0) {
            card.penalize(
                rules::penalty_high_payment_ratio(),
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

    fn strategy() -> PortugalStrategy {
        PortugalStrategy::new(Arc::new(MockBankingProvider::new(CountryCode::Pt)))
    }

    #[test]
    fn test_valid_nif() {
        // 123456789: sum = 1*9+2*8+3*7+4*6+5*5+6*4+7*3+8*2 = 156,
        // 156 % 11 = 2, check = 9.
        assert!(strategy().validate_document("123456789").is_valid);
    }

    #[test]
    fn test_invalid_check_digit() {
        assert!(!strategy().validate_document("123456780").is_valid);
    }

    #[test]
    fn test_invalid_leading_digit() {
        assert!(!strategy().validate_document("423456789").is_valid);
        assert!(!strategy().validate_document("723456789").is_valid);
    }

    #[test]
    fn test_wrong_length() {
        assert!(!strategy().validate_document("12345678").is_valid);
        assert!(!strategy().validate_document("1234567890").is_valid);
    }

    #[test]
    fn test_modest_income_still_approvable() {
        let banking = BankingData {
            provider_name: "Portuguese Banking Provider".into(),
            account_status: "active".into(),
            credit_score: Some(620),
            total_debt: Some(dec!(2000.00)),
            monthly_obligations: Some(dec!(55.56)),
            has_defaults: false,
            additional_data: Map::new(),
        };
        let input = EvaluationInput {
            requested_amount: dec!(5000.00),
            monthly_income: dec!(900.00),
            country_specific_data: Map::new(),
        };
        let assessment = strategy().evaluate(&input, &banking);
        assert_eq!(assessment.recommendation, Recommendation::Approve);
    }
}
