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

//! Strategy registry: immutable country -> strategy table built at startup.

use crate::providers::MockBankingProvider;
use crate::strategy::CountryStrategy;
use crate::{
    BrazilStrategy, ColombiaStrategy, ItalyStrategy, MexicoStrategy, PortugalStrategy,
    SpainStrategy,
};
use creditcore_domain::CountryCode;
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable lookup table from country code to strategy.
///
/// Built once at process start; an application whose country has no entry is
/// a permanent `UnsupportedCountry` failure in the worker.
pub struct StrategyRegistry {
    strategies: HashMap<CountryCode, Arc<dyn CountryStrategy>>,
}

impl StrategyRegistry {
    /// Build a registry from explicit entries.
    pub fn new(entries: Vec<Arc<dyn CountryStrategy>>) -> Self {
        let strategies = entries
            .into_iter()
            .map(|strategy| (strategy.country(), strategy))
            .collect();
        Self { strategies }
    }

    /// Build the full six-country registry backed by the deterministic mock
    /// providers. Production deployments swap individual providers by
    /// constructing the strategies with real [`crate::BankingProvider`]
    /// implementations and calling [`StrategyRegistry::new`].
    pub fn with_mock_providers() -> Self {
        Self::new(vec![
            Arc::new(SpainStrategy::new(Arc::new(MockBankingProvider::new(
                CountryCode::Es,
            )))),
            Arc::new(PortugalStrategy::new(Arc::new(MockBankingProvider::new(
                CountryCode::Pt,
            )))),
            Arc::new(ItalyStrategy::new(Arc::new(MockBankingProvider::new(
                CountryCode::It,
            )))),
            Arc::new(MexicoStrategy::new(Arc::new(MockBankingProvider::new(
                CountryCode::Mx,
            )))),
            Arc::new(ColombiaStrategy::new(Arc::new(MockBankingProvider::new(
                CountryCode::Co,
            )))),
            Arc::new(BrazilStrategy::new(Arc::new(MockBankingProvider::new(
                CountryCode::Br,
            )))),
        ])
    }

    /// Strategy for a country, if registered.
    pub fn get(&self, country: CountryCode) -> Option<Arc<dyn CountryStrategy>> {
        self.strategies.get(&country).cloned()
    }

    /// Registered countries, for diagnostics.
    pub fn supported_countries(&self) -> Vec<CountryCode> {
        let mut countries: Vec<_> = self.strategies.keys().copied().collect();
        countries.sort_by_key(|c| c.as_str());
        countries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_registry_covers_all_countries() {
        let registry = StrategyRegistry::with_mock_providers();
        for country in CountryCode::ALL {
            let strategy = registry.get(country).expect("strategy registered");
            assert_eq!(strategy.country(), country);
        }
        assert_eq!(registry.supported_countries().len(), 6);
    }

    #[test]
    fn test_partial_registry_returns_none() {
        let registry = StrategyRegistry::new(vec![Arc::new(SpainStrategy::new(Arc::new(
            MockBankingProvider::new(CountryCode::Es),
        )))]);
        assert!(registry.get(CountryCode::Es).is_some());
        assert!(registry.get(CountryCode::Br).is_none());
    }

    #[tokio::test]
    async fn test_registry_strategies_fetch_deterministic_data() {
        let registry = StrategyRegistry::with_mock_providers();
        let strategy = registry.get(CountryCode::Es).unwrap();
        let a = strategy
            .fetch_banking_data("12345678Z", "Juan García López")
            .await
            .unwrap();
        let b = strategy
            .fetch_banking_data("12345678Z", "Juan García López")
            .await
            .unwrap();
        assert_eq!(a, b);
    }
}
