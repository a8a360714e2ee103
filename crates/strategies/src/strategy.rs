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

//! The country strategy trait and shared evaluation helpers.

use crate::providers::ProviderError;
use async_trait::async_trait;
use creditcore_domain::{BankingData, CountryCode, DocumentValidation, RiskAssessment};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

/// Inputs to business-rule evaluation.
#[derive(Clone, Debug)]
pub struct EvaluationInput {
    /// Credit amount requested, validated NUMERIC(12,2).
    pub requested_amount: Decimal,
    /// Applicant's monthly income, validated NUMERIC(12,2).
    pub monthly_income: Decimal,
    /// Opaque country-specific document from the application.
    pub country_specific_data: Map<String, Value>,
}

/// Market-specific behavior for one country.
#[async_trait]
pub trait CountryStrategy: Send + Sync {
    /// The country this strategy serves.
    fn country(&self) -> CountryCode;

    /// Name of the banking provider behind `fetch_banking_data`; the
    /// circuit-breaker key is (country, provider_name).
    fn provider_name(&self) -> &str;

    /// Validate the identity document format and checksum. Pure.
    fn validate_document(&self, document: &str) -> DocumentValidation;

    /// Retrieve banking data from the country's provider. The caller wraps
    /// this with circuit-breaker protection and a timeout.
    async fn fetch_banking_data(
        &self,
        document: &str,
        full_name: &str,
    ) -> Result<BankingData, ProviderError>;

    /// Apply the country's business rules. Pure.
    fn evaluate(&self, input: &EvaluationInput, banking: &BankingData) -> RiskAssessment;
}

/// Debt-to-income ratio as a percentage. Income at or below zero pegs the
/// ratio at 100 so the caller's threshold check fails closed.
pub(crate) fn debt_to_income_ratio(monthly_income: Decimal, monthly_debt: Decimal) -> Decimal {
    if monthly_income < Decimal::new(1, 2) {
        return Decimal::new(100, 0);
    }
    (monthly_debt / monthly_income) * Decimal::new(100, 0)
}

/// Estimated payment-to-income ratio as a percentage, assuming a linear
/// amortization over `term_months`.
pub(crate) fn payment_to_income_ratio(
    requested_amount: Decimal,
    monthly_income: Decimal,
    term_months: u32,
) -> Decimal {
    if monthly_income < Decimal::new(1, 2) {
        return Decimal::new(100, 0);
    }
    let payment = requested_amount / Decimal::from(term_months.max(1));
    (payment / monthly_income) * Decimal::new(100, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_debt_to_income_ratio() {
        assert_eq!(debt_to_income_ratio(dec!(2000), dec!(500)), dec!(25));
    }

    #[test]
    fn test_zero_income_pegs_ratio() {
        assert_eq!(debt_to_income_ratio(dec!(0), dec!(500)), dec!(100));
        assert_eq!(payment_to_income_ratio(dec!(10000), dec!(0), 36), dec!(100));
    }

    #[test]
    fn test_payment_ratio_over_term() {
        // 36000 over 36 months = 1000/month against 4000 income = 25%
        assert_eq!(payment_to_income_ratio(dec!(36000), dec!(4000), 36), dec!(25));
    }
}
