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

//! Breaker registry and the provider-call wrapper.

use crate::breaker::{Admission, BreakerConfig, CircuitBreaker, CircuitState};
use creditcore_domain::{BankingData, CountryCode};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Credit score used in the fallback artifact.
const FALLBACK_CREDIT_SCORE: i32 = 500;

/// A provider call that failed while the breaker was not open.
///
/// Transient by definition: the worker retry policy decides what happens
/// next. An *open* breaker is not an error — the caller receives the
/// fallback artifact instead.
#[derive(Debug, thiserror::Error)]
#[error("provider '{provider}' call failed for {country}: {message}")]
pub struct ProviderCallError {
    /// Country whose provider failed.
    pub country: CountryCode,
    /// Provider name.
    pub provider: String,
    /// Underlying failure description.
    pub message: String,
}

/// Registry of breakers keyed by (country, provider).
///
/// Breakers are created lazily on first use and live for the process
/// lifetime. State is per process; see the crate docs for why that is the
/// intended scope.
pub struct CircuitBreakerRegistry {
    config: BreakerConfig,
    breakers: Mutex<HashMap<(CountryCode, String), CircuitBreaker>>,
}

impl CircuitBreakerRegistry {
    /// Create a registry with the given per-breaker configuration.
    pub fn new(config: BreakerConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            breakers: Mutex::new(HashMap::new()),
        })
    }

    async fn breaker(&self, country: CountryCode, provider: &str) -> CircuitBreaker {
        let mut breakers = self.breakers.lock().await;
        breakers
            .entry((country, provider.to_string()))
            .or_insert_with(|| CircuitBreaker::new(self.config))
            .clone()
    }

    /// Run a banking-provider call under breaker protection.
    ///
    /// ## Behavior
    /// - Breaker open: the wrapped call is **not** invoked; the conservative
    ///   fallback artifact is returned and the short-circuit counter bumped.
    /// - Breaker closed/half-open: the call runs. Success feeds the breaker
    ///   and returns the data; failure feeds the breaker and surfaces as
    ///   [`ProviderCallError`] for the retry policy.
    pub async fn call<F, Fut, E>(
        &self,
        country: CountryCode,
        provider: &str,
        f: F,
    ) -> Result<BankingData, ProviderCallError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<BankingData, E>>,
        E: std::fmt::Display,
    {
        let breaker = self.breaker(country, provider).await;

        match breaker.admit().await {
            Admission::ShortCircuit => {
                tracing::warn!(
                    country = %country,
                    provider = %provider,
                    "circuit open, returning fallback banking data"
                );
                Ok(fallback_banking_data(country, provider))
            }
            Admission::Allowed => match f().await {
                Ok(data) => {
                    breaker.record_success().await;
                    Ok(data)
                }
                Err(err) => {
                    let tripped = breaker.record_failure().await;
                    if tripped {
                        tracing::error!(
                            country = %country,
                            provider = %provider,
                            error = %err,
                            "circuit breaker opened"
                        );
                    }
                    Err(ProviderCallError {
                        country,
                        provider: provider.to_string(),
                        message: err.to_string(),
                    })
                }
            },
        }
    }

    /// Manually close a breaker.
    pub async fn force_close(&self, country: CountryCode, provider: &str) {
        self.breaker(country, provider).await.force_close().await;
    }

    /// Manually open a breaker.
    pub async fn force_open(&self, country: CountryCode, provider: &str) {
        self.breaker(country, provider).await.force_open().await;
    }

    /// Metric snapshot: (state encoding 0/1/2, short-circuit count).
    pub async fn snapshot(&self, country: CountryCode, provider: &str) -> (CircuitState, u64) {
        let breaker = self.breaker(country, provider).await;
        (breaker.state().await, breaker.short_circuit_count().await)
    }
}

/// Conservative synthetic banking data returned while a breaker is open.
///
/// The values land below every country's approval threshold, so evaluation
/// tends toward UNDER_REVIEW rather than approving or rejecting on data the
/// provider never produced.
pub fn fallback_banking_data(country: CountryCode, provider: &str) -> BankingData {
    let mut additional_data = Map::new();
    additional_data.insert("fallback".into(), Value::Bool(true));
    additional_data.insert(
        "reason".into(),
        Value::String("circuit breaker open, provider unavailable".into()),
    );
    additional_data.insert("country".into(), Value::String(country.as_str().into()));

    BankingData {
        provider_name: format!("{provider} (FALLBACK - Circuit Open)"),
        account_status: "unknown".into(),
        credit_score: Some(FALLBACK_CREDIT_SCORE),
        total_debt: Some(rust_decimal::Decimal::new(5_000_000, 2)),
        monthly_obligations: Some(rust_decimal::Decimal::new(200_000, 2)),
        has_defaults: false,
        additional_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Duration;

    fn sample_data() -> BankingData {
        BankingData {
            provider_name: "Spanish Banking Provider".into(),
            account_status: "active".into(),
            credit_score: Some(700),
            total_debt: Some(dec!(1000.00)),
            monthly_obligations: Some(dec!(100.00)),
            has_defaults: false,
            additional_data: Map::new(),
        }
    }

    fn registry() -> Arc<CircuitBreakerRegistry> {
        CircuitBreakerRegistry::new(BreakerConfig {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
        })
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let registry = registry();
        let data = registry
            .call(CountryCode::Es, "spain", || async {
                Ok::<_, String>(sample_data())
            })
            .await
            .unwrap();
        assert!(!data.is_fallback());
        assert_eq!(data.credit_score, Some(700));
    }

    #[tokio::test]
    async fn test_failures_below_threshold_surface_as_errors() {
        let registry = registry();
        for _ in 0..4 {
            let err = registry
                .call(CountryCode::Es, "spain", || async {
                    Err::<BankingData, _>("connection refused".to_string())
                })
                .await
                .unwrap_err();
            assert_eq!(err.country, CountryCode::Es);
        }
        let (state, _) = registry.snapshot(CountryCode::Es, "spain").await;
        assert_eq!(state, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_fifth_failure_opens_and_short_circuits() {
        let registry = registry();
        let calls = AtomicU32::new(0);

        for _ in 0..5 {
            let _ = registry
                .call(CountryCode::Es, "spain", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<BankingData, _>("down".to_string())
                })
                .await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 5);

        // Next call must not reach the provider and must return the fallback.
        let data = registry
            .call(CountryCode::Es, "spain", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(sample_data())
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert!(data.is_fallback());
        assert_eq!(data.credit_score, Some(500));
        assert_eq!(data.total_debt, Some(dec!(50000.00)));
        assert_eq!(data.monthly_obligations, Some(dec!(2000.00)));
        assert!(!data.has_defaults);
        assert!(data.provider_name.contains("FALLBACK"));

        let (state, short_circuits) = registry.snapshot(CountryCode::Es, "spain").await;
        assert_eq!(state, CircuitState::Open);
        assert!(short_circuits >= 1);
    }

    #[tokio::test]
    async fn test_breakers_isolated_per_country() {
        let registry = registry();
        for _ in 0..5 {
            let _ = registry
                .call(CountryCode::Es, "spain", || async {
                    Err::<BankingData, _>("down".to_string())
                })
                .await;
        }

        // Brazil's breaker is untouched.
        let data = registry
            .call(CountryCode::Br, "brazil", || async {
                Ok::<_, String>(sample_data())
            })
            .await
            .unwrap();
        assert!(!data.is_fallback());

        let (es_state, _) = registry.snapshot(CountryCode::Es, "spain").await;
        let (br_state, _) = registry.snapshot(CountryCode::Br, "brazil").await;
        assert_eq!(es_state, CircuitState::Open);
        assert_eq!(br_state, CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_probe_then_close() {
        let registry = registry();
        for _ in 0..5 {
            let _ = registry
                .call(CountryCode::Es, "spain", || async {
                    Err::<BankingData, _>("down".to_string())
                })
                .await;
        }

        tokio::time::advance(Duration::from_secs(61)).await;

        // The probe is admitted and succeeds; the breaker closes.
        let data = registry
            .call(CountryCode::Es, "spain", || async {
                Ok::<_, String>(sample_data())
            })
            .await
            .unwrap();
        assert!(!data.is_fallback());
        let (state, _) = registry.snapshot(CountryCode::Es, "spain").await;
        assert_eq!(state, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_force_close_reopens_traffic() {
        let registry = registry();
        registry.force_open(CountryCode::Es, "spain").await;
        let data = registry
            .call(CountryCode::Es, "spain", || async {
                Ok::<_, String>(sample_data())
            })
            .await
            .unwrap();
        assert!(data.is_fallback());

        registry.force_close(CountryCode::Es, "spain").await;
        let data = registry
            .call(CountryCode::Es, "spain", || async {
                Ok::<_, String>(sample_data())
            })
            .await
            .unwrap();
        assert!(!data.is_fallback());
    }
}
