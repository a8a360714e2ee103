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

//! Banking-provider interface and the deterministic mock implementation.

use async_trait::async_trait;
use creditcore_domain::{BankingData, CountryCode};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::time::Duration;

/// Failure fetching banking data. All kinds are transient: the breaker and
/// the retry policy decide what happens next.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider did not answer in time.
    #[error("provider timeout: {0}")]
    Timeout(String),
    /// The provider answered with an error or the connection failed.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// A source of banking data for one country.
#[async_trait]
pub trait BankingProvider: Send + Sync {
    /// Provider display name (used in breaker keys and stored artifacts).
    fn provider_name(&self) -> &str;

    /// Fetch banking data for an applicant.
    async fn fetch_banking_data(
        &self,
        document: &str,
        full_name: &str,
    ) -> Result<BankingData, ProviderError>;
}

/// Display names of the per-country providers.
pub(crate) fn provider_display_name(country: CountryCode) -> &'static str {
    match country {
        CountryCode::Es => "Spanish Banking Provider",
        CountryCode::Pt => "Portuguese Banking Provider",
        CountryCode::It => "Italian Banking Provider",
        CountryCode::Mx => "Mexican Banking Provider (Buró de Crédito)",
        CountryCode::Co => "Colombian Banking Provider (DataCrédito)",
        CountryCode::Br => "Brazilian Banking Provider (Serasa)",
    }
}

/// Deterministic mock provider.
///
/// Banking data is derived from a digit-sum hash of the document so the same
/// applicant always receives the same answer, which keeps processing
/// reproducible across workers and runs. A small sleep stands in for network
/// latency.
pub struct MockBankingProvider {
    country: CountryCode,
    name: &'static str,
    latency: Duration,
}

impl MockBankingProvider {
    /// Create the mock provider for a country.
    pub fn new(country: CountryCode) -> Self {
        Self {
            country,
            name: provider_display_name(country),
            latency: Duration::from_millis(25),
        }
    }

    /// Deterministic hash: sum of character codes, separators stripped.
    fn document_hash(document: &str) -> u32 {
        document
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '.'))
            .map(|c| c as u32)
            .sum()
    }

    fn generate(&self, document: &str) -> BankingData {
        let hash = Self::document_hash(document);

        // Per-country scales: Serasa runs 0-1000, the rest use the
        // international 300-850 band; peso markets carry larger debt figures.
        let (credit_score, total_debt, term_months, defaults_modulus) = match self.country {
            CountryCode::Es => (500 + (hash % 350) as i32, Decimal::from(hash % 30_000), 36, 9),
            CountryCode::Pt => (500 + (hash % 350) as i32, Decimal::from(hash % 25_000), 36, 11),
            CountryCode::It => (500 + (hash % 350) as i32, Decimal::from(hash % 28_000), 36, 10),
            CountryCode::Mx => (450 + (hash % 400) as i32, Decimal::from(hash % 80_000), 36, 8),
            CountryCode::Co => (
                450 + (hash % 400) as i32,
                Decimal::from((hash as u64 * 997) % 20_000_000),
                12,
                13,
            ),
            CountryCode::Br => (300 + (hash % 700) as i32, Decimal::from(hash % 50_000), 36, 12),
        };

        let total_debt = total_debt.round_dp(2);
        let monthly_obligations = (total_debt / Decimal::from(term_months)).round_dp(2);

        let mut additional_data = Map::new();
        additional_data.insert(
            "data_source".into(),
            Value::String(format!("{}_mock", self.country.as_str().to_lowercase())),
        );
        additional_data.insert(
            "account_age_months".into(),
            Value::Number(((hash % 120) as u64).into()),
        );

        BankingData {
            provider_name: self.name.to_string(),
            account_status: "active".into(),
            credit_score: Some(credit_score),
            total_debt: Some(total_debt),
            monthly_obligations: Some(monthly_obligations),
            has_defaults: hash % defaults_modulus == 0,
            additional_data,
        }
    }
}

#[async_trait]
impl BankingProvider for MockBankingProvider {
    fn provider_name(&self) -> &str {
        self.name
    }

    async fn fetch_banking_data(
        &self,
        document: &str,
        _full_name: &str,
    ) -> Result<BankingData, ProviderError> {
        tokio::time::sleep(self.latency).await;
        Ok(self.generate(document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_data_is_deterministic() {
        let provider = MockBankingProvider::new(CountryCode::Es);
        let first = provider.fetch_banking_data("12345678Z", "Juan").await.unwrap();
        let second = provider.fetch_banking_data("12345678Z", "Juan").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_separators_do_not_change_hash() {
        let provider = MockBankingProvider::new(CountryCode::Br);
        let with = provider
            .fetch_banking_data("123.456.789-09", "Maria")
            .await
            .unwrap();
        let without = provider
            .fetch_banking_data("12345678909", "Maria")
            .await
            .unwrap();
        assert_eq!(with.credit_score, without.credit_score);
        assert_eq!(with.total_debt, without.total_debt);
    }

    #[tokio::test]
    async fn test_happy_path_document_has_clean_profile() {
        // The canonical ES test document must evaluate approvable: score
        // above the Spanish minimum and no defaults.
        let provider = MockBankingProvider::new(CountryCode::Es);
        let data = provider
            .fetch_banking_data("12345678Z", "Juan García López")
            .await
            .unwrap();
        assert!(data.credit_score.unwrap() >= 600);
        assert!(!data.has_defaults);
        assert!(!data.is_fallback());
    }

    #[test]
    fn test_scores_within_country_scale() {
        for country in CountryCode::ALL {
            let provider = MockBankingProvider::new(country);
            for document in ["12345678Z", "98765432M", "X1234567L", "11122233344"] {
                let data = provider.generate(document);
                let score = data.credit_score.unwrap();
                match country {
                    CountryCode::Br => assert!((300..=1000).contains(&score)),
                    _ => assert!((300..=850).contains(&score), "{country}: {score}"),
                }
            }
        }
    }
}
