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

//! Colombia (CO): Cédula validation and Colombian credit rules.

use crate::providers::{BankingProvider, ProviderError};
use crate::rules::{self, ScoreCard};
use crate::strategy::{payment_to_income_ratio, CountryStrategy, EvaluationInput};
use async_trait::async_trait;
use creditcore_domain::{BankingData, CountryCode, DocumentValidation, RiskAssessment};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Credit application strategy for Colombia.
///
/// Document: Cédula de Ciudadanía, 6 to 10 digits. Minimum income
/// COP 1,500,000, maximum loan COP 50,000,000, payment-to-income capped at
/// 40% over a 12-month term, minimum credit score 600.
pub struct ColombiaStrategy {
    provider: Arc<dyn BankingProvider>,
}

impl ColombiaStrategy {
    /// Create the strategy with its banking provider.
    pub fn new(provider: Arc<dyn BankingProvider>) -> Self {
        Self { provider }
    }

    fn min_income() -> Decimal {
        Decimal::new(1_500_000_00, 2)
    }

    fn max_loan() -> Decimal {
        Decimal::new(50_000_000_00, 2)
    }

    fn max_payment_ratio() -> Decimal {
        Decimal::new(400, 1)
    }

    const MIN_CREDIT_SCORE: i32 = 600;
    const LOAN_TERM_MONTHS: u32 = 12;
}

#[async_trait]
impl CountryStrategy for ColombiaStrategy {
    fn country(&self) -> CountryCode {
        CountryCode::Co
    }

    fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    fn validate_document(&self, document: &str) -> DocumentValidation {
        let normalized: String = document
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '.'))
            .collect();

        if normalized.is_empty() || !normalized.bytes().all(|b| b.is_ascii_digit()) {
            return DocumentValidation::invalid(vec![
                "Cédula must contain only digits".to_string(),
            ]);
        }
        if !(6..=10).contains(&normalized.len()) {
            return DocumentValidation::invalid(vec![format!(
                "Cédula must be 6 to 10 digits long (received {})",
                normalized.len()
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

        // Colombian consumer credit amortizes over 12 months, which makes
        // the payment-to-income cap the binding constraint.
        let payment_ratio = payment_to_income_ratio(
            input.requested_amount,
            input.monthly_income,
            Self::LOAN_TERM_MONTHS,
        );
        if payment_ratio > Self::max_payment_ratio() {
            card.penalize(
                Decimal::new(25, 0),
                format!(
                    "Payment-to-income ratio too high: {:.1}% over {} months",
                    payment_ratio,
                    Self::LOAN_TERM_MONTHS
                ),
            );
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

    fn strategy() -> ColombiaStrategy {
        ColombiaStrategy::new(Arc::new(MockBankingProvider::new(CountryCode::Co)))
    }

    #[test]
    fn test_valid_cedula() {
        assert!(strategy().validate_document("12345678").is_valid);
        assert!(strategy().validate_document("1.234.567.890").is_valid);
    }

    #[test]
    fn test_rejects_letters_and_bad_lengths() {
        assert!(!strategy().validate_document("12345").is_valid);
        assert!(!strategy().validate_document("12345678901").is_valid);
        assert!(!strategy().validate_document("1234567A").is_valid);
    }

    #[test]
    fn test_payment_ratio_binds_over_short_term() {
        let banking = BankingData {
            provider_name: "Colombian Banking Provider (DataCrédito)".into(),
            account_status: "active".into(),
            credit_score: Some(700),
            total_debt: Some(dec!(0)),
            monthly_obligations: Some(dec!(0)),
            has_defaults: false,
            additional_data: Map::new(),
        };
        // 30,000,000 over 12 months = 2,500,000/month against 3,000,000
        // income = 83% payment ratio.
        let input = EvaluationInput {
            requested_amount: dec!(30000000.00),
            monthly_income: dec!(3000000.00),
            country_specific_data: Map::new(),
        };
        let assessment = strategy().evaluate(&input, &banking);
        assert!(assessment
            .reasons
            .iter()
            .any(|reason| reason.contains("Payment-to-income")));
        assert_eq!(assessment.recommendation, Recommendation::Approve);
    }
}
