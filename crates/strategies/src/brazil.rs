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

//! Brazil (BR): CPF validation and Brazilian credit rules.

use crate::providers::{BankingProvider, ProviderError};
use crate::rules::{self, ScoreCard};
use crate::strategy::{debt_to_income_ratio, CountryStrategy, EvaluationInput};
use async_trait::async_trait;
use creditcore_domain::{BankingData, CountryCode, DocumentValidation, RiskAssessment};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Credit application strategy for Brazil.
///
/// Document: CPF, 11 digits with two mod-11 check digits. Minimum income
/// BRL 2,000, maximum loan BRL 100,000, loan capped at 5x annual income,
/// max debt-to-income 35%. Credit scores use the Serasa 0-1000 scale with a
/// 550 minimum.
pub struct BrazilStrategy {
    provider: Arc<dyn BankingProvider>,
}

impl BrazilStrategy {
    /// Create the strategy with its banking provider.
    pub fn new(provider: Arc<dyn BankingProvider>) -> Self {
        Self { provider }
    }

    fn min_income() -> Decimal {
        Decimal::new(2_000_00, 2)
    }

    fn max_loan() -> Decimal {
        Decimal::new(100_000_00, 2)
    }

    fn max_dti() -> Decimal {
        Decimal::new(350, 1)
    }

    const MIN_CREDIT_SCORE: i32 = 550;
    /// Serasa score considered excellent.
    const EXCELLENT_SERASA_SCORE: i32 = 800;

    fn cpf_check_digit(digits: &[u32], weights_from: u32) -> u32 {
        let sum: u32 = digits
            .iter()
            .enumerate()
            .map(|(i, d)| d * (weights_from - i as u32))
            .sum();
        let digit = (sum * 10) % 11;
        if digit == 10 {
            0
        } else {
            digit
        }
    }
}

#[async_trait]
impl CountryStrategy for BrazilStrategy {
    fn country(&self) -> CountryCode {
        CountryCode::Br
    }

    fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    fn validate_document(&self, document: &str) -> DocumentValidation {
        let normalized: String = document
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '.'))
            .collect();

        if normalized.len() != 11 || !normalized.bytes().all(|b| b.is_ascii_digit()) {
            return DocumentValidation::invalid(vec![format!(
                "CPF must have 11 digits, got {}",
                normalized.len()
            )]);
        }

        let digits: Vec<u32> = normalized.bytes().map(|b| (b - b'0') as u32).collect();

        if digits.iter().all(|&d| d == digits[0]) {
            return DocumentValidation::invalid(vec![
                "CPF cannot have all equal digits".to_string(),
            ]);
        }

        if digits[9] != Self::cpf_check_digit(&digits[..9], 10) {
            return DocumentValidation::invalid(vec![
                "Invalid CPF checksum (first digit)".to_string(),
            ]);
        }
        if digits[10] != Self::cpf_check_digit(&digits[..10], 11) {
            return DocumentValidation::invalid(vec![
                "Invalid CPF checksum (second digit)".to_string(),
            ]);
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

        let annual_income = input.monthly_income * Decimal::from(12u32);
        if input.requested_amount > annual_income * Decimal::from(5u32) {
            card.penalize(
                Decimal::new(35, 0),
                "Requested amount exceeds 5x annual income",
            );
        }

        if let Some(obligations) = banking.monthly_obligations {
            let dti = debt_to_income_ratio(input.monthly_income, obligations);
            if dti > Self::max_dti() {
                card.penalize(
                    Decimal::new(20, 0),
                    format!("Debt-to-income ratio too high: {:.1}%", dti),
                );
            }
        }

        if let Some(score) = banking.credit_score {
            if score < Self::MIN_CREDIT_SCORE {
                card.penalize(
                    Decimal::new(30, 0),
                    format!(
                        "Serasa score below minimum: {score} (min {})",
                        Self::MIN_CREDIT_SCORE
                    ),
                );
            } else if score >= Self::EXCELLENT_SERASA_SCORE {
                card.reward(rules::bonus_excellent_credit(), "Excellent Serasa score");
            }
        }

        if banking.has_defaults {
            card.penalize(rules::penalty_defaults(), "Has active defaults in credit bureau");
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

    fn strategy() -> BrazilStrategy {
        BrazilStrategy::new(Arc::new(MockBankingProvider::new(CountryCode::Br)))
    }

    #[test]
    fn test_valid_cpf() {
        assert!(strategy().validate_document("12345678909").is_valid);
        assert!(strategy().validate_document("123.456.789-09").is_valid);
    }

    #[test]
    fn test_all_equal_digits_rejected() {
        let result = strategy().validate_document("11111111111");
        assert!(!result.is_valid);
        assert!(result.errors[0].contains("equal digits"));
    }

    #[test]
    fn test_bad_check_digits_rejected() {
        assert!(!strategy().validate_document("12345678919").is_valid);
        assert!(!strategy().validate_document("12345678901").is_valid);
    }

    #[test]
    fn test_loan_to_income_cap() {
        let banking = BankingData {
            provider_name: "Brazilian Banking Provider (Serasa)".into(),
            account_status: "active".into(),
            credit_score: Some(700),
            total_debt: Some(dec!(0)),
            monthly_obligations: Some(dec!(0)),
            has_defaults: false,
            additional_data: Map::new(),
        };
        // 100,000 > 5 * 12 * 1,500 = 90,000 and income below minimum.
        let input = EvaluationInput {
            requested_amount: dec!(100000.00),
            monthly_income: dec!(1500.00),
            country_specific_data: Map::new(),
        };
        let assessment = strategy().evaluate(&input, &banking);
        // 30 (income) + 35 (multiple) = 65 -> HIGH -> review
        assert_eq!(assessment.recommendation, Recommendation::Review);
    }
}
