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

//! Spain (ES): DNI/NIE validation and Spanish credit rules.

use crate::providers::{BankingProvider, ProviderError};
use crate::rules::{self, ScoreCard};
use crate::strategy::{debt_to_income_ratio, payment_to_income_ratio, CountryStrategy, EvaluationInput};
use async_trait::async_trait;
use creditcore_domain::{BankingData, CountryCode, DocumentValidation, RiskAssessment};
use rust_decimal::Decimal;
use std::sync::Arc;

/// DNI/NIE check letters indexed by `number % 23`.
const DNI_CHECK_LETTERS: &[u8; 23] = b"TRWAGMYFPDXBNJZSQVHLCKE";

/// Credit application strategy for Spain.
///
/// - Document: DNI (8 digits + check letter) or NIE (X/Y/Z + 7 digits +
///   check letter)
/// - Minimum monthly income: EUR 1,500
/// - Maximum loan amount: EUR 50,000 (amounts above EUR 20,000 carry an
///   extra penalty)
/// - Debt-to-income must stay under 40%
/// - Minimum credit score: 600
pub struct SpainStrategy {
    provider: Arc<dyn BankingProvider>,
}

impl SpainStrategy {
    /// Create the strategy with its banking provider.
    pub fn new(provider: Arc<dyn BankingProvider>) -> Self {
        Self { provider }
    }

    fn min_income() -> Decimal {
        Decimal::new(1_500_00, 2)
    }

    fn max_loan() -> Decimal {
        Decimal::new(50_000_00, 2)
    }

    fn high_amount_threshold() -> Decimal {
        Decimal::new(20_000_00, 2)
    }

    fn max_dti() -> Decimal {
        Decimal::new(400, 1)
    }

    const MIN_CREDIT_SCORE: i32 = 600;
}

#[async_trait]
impl CountryStrategy for SpainStrategy {
    fn country(&self) -> CountryCode {
        CountryCode::Es
    }

    fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    /// Validate a Spanish DNI or NIE.
    ///
    /// The check letter is `DNI_CHECK_LETTERS[number % 23]`; for NIE the
    /// leading X/Y/Z maps to 0/1/2 before the division.
    fn validate_document(&self, document: &str) -> DocumentValidation {
        let normalized: String = document
            .chars()
            .filter(|c| !matches!(c, ' ' | '-'))
            .collect::<String>()
            .to_ascii_uppercase();

        if normalized.len() != 9 {
            return DocumentValidation::invalid(vec![format!(
                "DNI/NIE must be 9 characters long (received {})",
                normalized.len()
            )]);
        }

        let bytes = normalized.as_bytes();
        let digits = match bytes[0] {
            b'X' | b'Y' | b'Z' => {
                let prefix = (bytes[0] - b'X') as u64;
                let rest = &normalized[1..8];
                if !rest.bytes().all(|b| b.is_ascii_digit()) {
                    return DocumentValidation::invalid(vec![
                        "NIE must be a letter followed by 7 digits and a check letter".into(),
                    ]);
                }
                prefix * 10_000_000 + rest.parse::<u64>().unwrap_or(0)
            }
            _ => {
                let rest = &normalized[0..8];
                if !rest.bytes().all(|b| b.is_ascii_digit()) {
                    return DocumentValidation::invalid(vec![
                        "DNI must be 8 digits followed by a check letter".into(),
                    ]);
                }
                rest.parse::<u64>().unwrap_or(0)
            }
        };

        let expected = DNI_CHECK_LETTERS[(digits % 23) as usize];
        if bytes[8] != expected {
            return DocumentValidation::invalid(vec![format!(
                "Invalid DNI/NIE check letter (expected '{}')",
                expected as char
            )]);
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

        if input.requested_amount > Self::high_amount_threshold() {
            card.penalize(
                rules::penalty_stability(),
                format!(
                    "Requested amount above the {} review threshold",
                    Self::high_amount_threshold()
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
            card.penalize(
                Decimal::new(40, 0),
                "Has active defaults in credit bureau",
            );
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

    fn strategy() -> SpainStrategy {
        SpainStrategy::new(Arc::new(MockBankingProvider::new(CountryCode::Es)))
    }

    fn input(amount: Decimal, income: Decimal) -> EvaluationInput {
        EvaluationInput {
            requested_amount: amount,
            monthly_income: income,
            country_specific_data: Map::new(),
        }
    }

    fn clean_banking() -> BankingData {
        BankingData {
            provider_name: "Spanish Banking Provider".into(),
            account_status: "active".into(),
            credit_score: Some(660),
            total_debt: Some(dec!(510.00)),
            monthly_obligations: Some(dec!(14.17)),
            has_defaults: false,
            additional_data: Map::new(),
        }
    }

    #[test]
    fn test_valid_dni() {
        assert!(strategy().validate_document("12345678Z").is_valid);
        assert!(strategy().validate_document("12345678z").is_valid);
        assert!(strategy().validate_document("12345678-Z").is_valid);
    }

    #[test]
    fn test_invalid_check_letter() {
        let result = strategy().validate_document("12345678A");
        assert!(!result.is_valid);
        assert!(result.errors[0].contains("check letter"));
    }

    #[test]
    fn test_valid_nie() {
        // X1234567 -> 01234567 % 23 = 13 -> 'L'
        assert!(strategy().validate_document("X1234567L").is_valid);
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(!strategy().validate_document("1234567Z").is_valid);
        assert!(!strategy().validate_document("").is_valid);
    }

    #[test]
    fn test_happy_path_approves() {
        let assessment = strategy().evaluate(&input(dec!(15000.00), dec!(3500.00)), &clean_banking());
        assert_eq!(assessment.recommendation, Recommendation::Approve);
        assert!(assessment.risk_score < dec!(30));
    }

    #[test]
    fn test_amount_over_maximum_rejects() {
        let assessment = strategy().evaluate(&input(dec!(60000.00), dec!(3500.00)), &clean_banking());
        assert_eq!(assessment.recommendation, Recommendation::Reject);
        assert_eq!(assessment.risk_score, dec!(100));
    }

    #[test]
    fn test_low_income_and_low_score_accumulate() {
        let mut banking = clean_banking();
        banking.credit_score = Some(550);
        let assessment = strategy().evaluate(&input(dec!(10000.00), dec!(1000.00)), &banking);
        // 30 (income) + 25 (credit) = 55 -> HIGH -> review
        assert_eq!(assessment.recommendation, Recommendation::Review);
        assert_eq!(assessment.risk_score, dec!(55.00));
    }

    #[test]
    fn test_defaults_require_review() {
        let mut banking = clean_banking();
        banking.has_defaults = true;
        let assessment = strategy().evaluate(&input(dec!(5000.00), dec!(3500.00)), &banking);
        assert!(assessment.requires_review);
        assert_ne!(assessment.recommendation, Recommendation::Approve);
    }

    #[test]
    fn test_fallback_data_reviews_not_approves() {
        let banking = creditcore_circuit_breaker_fallback();
        let assessment = strategy().evaluate(&input(dec!(15000.00), dec!(3500.00)), &banking);
        assert_eq!(assessment.recommendation, Recommendation::Review);
    }

    // Local copy of the fallback artifact shape to keep this crate free of a
    // dev-dependency cycle with the breaker crate.
    fn creditcore_circuit_breaker_fallback() -> BankingData {
        let mut additional = Map::new();
        additional.insert("fallback".into(), serde_json::Value::Bool(true));
        BankingData {
            provider_name: "Spanish Banking Provider (FALLBACK - Circuit Open)".into(),
            account_status: "unknown".into(),
            credit_score: Some(500),
            total_debt: Some(dec!(50000.00)),
            monthly_obligations: Some(dec!(2000.00)),
            has_defaults: false,
            additional_data: additional,
        }
    }
}
