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

//! Single circuit breaker with consecutive-failure detection.

use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

/// Breaker tuning parameters.
#[derive(Clone, Copy, Debug)]
pub struct BreakerConfig {
    /// Consecutive failures that trip the breaker open.
    pub failure_threshold: u32,
    /// Time the breaker stays open before admitting a probe.
    pub recovery_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

/// Breaker states. The numeric values (0/1/2) are the metric encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation, calls pass through.
    Closed = 0,
    /// Tripped; calls short-circuit to the fallback artifact.
    Open = 1,
    /// Recovery test; exactly one probe call is admitted.
    HalfOpen = 2,
}

/// Decision for an incoming call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Execute the wrapped call.
    Allowed,
    /// Breaker open (or half-open with the probe slot taken): short-circuit.
    ShortCircuit,
}

struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
    short_circuit_count: u64,
}

/// Circuit breaker for one (country, provider) key.
#[derive(Clone)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Arc<RwLock<BreakerInner>>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            inner: Arc::new(RwLock::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
                short_circuit_count: 0,
            })),
        }
    }

    /// Decide whether a call may proceed.
    ///
    /// An open breaker whose recovery timeout has elapsed moves to half-open
    /// and admits exactly one probe; every other caller short-circuits until
    /// the probe resolves.
    pub async fn admit(&self) -> Admission {
        let mut inner = self.inner.write().await;
        match inner.state {
            CircuitState::Closed => Admission::Allowed,
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed() >= self.config.recovery_timeout)
                    .unwrap_or(true);
                if elapsed {
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_in_flight = true;
                    Admission::Allowed
                } else {
                    inner.short_circuit_count += 1;
                    Admission::ShortCircuit
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    inner.short_circuit_count += 1;
                    Admission::ShortCircuit
                } else {
                    inner.probe_in_flight = true;
                    Admission::Allowed
                }
            }
        }
    }

    /// Record a successful call.
    pub async fn record_success(&self) {
        let mut inner = self.inner.write().await;
        inner.consecutive_failures = 0;
        inner.probe_in_flight = false;
        if inner.state != CircuitState::Closed {
            inner.state = CircuitState::Closed;
            inner.opened_at = None;
        }
    }

    /// Record a failed call.
    ///
    /// Returns `true` when this failure tripped the breaker open.
    pub async fn record_failure(&self) -> bool {
        let mut inner = self.inner.write().await;
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.probe_in_flight = false;
                true
            }
            CircuitState::Open => false,
        }
    }

    /// Current state.
    pub async fn state(&self) -> CircuitState {
        self.inner.read().await.state
    }

    /// Times a call was short-circuited while open/half-open.
    pub async fn short_circuit_count(&self) -> u64 {
        self.inner.read().await.short_circuit_count
    }

    /// Manually trip the breaker open (maintenance).
    pub async fn force_open(&self) {
        let mut inner = self.inner.write().await;
        inner.state = CircuitState::Open;
        inner.opened_at = Some(Instant::now());
        inner.probe_in_flight = false;
    }

    /// Manually reset the breaker closed (maintenance).
    pub async fn force_close(&self) {
        let mut inner = self.inner.write().await;
        inner.state = CircuitState::Closed;
        inner.opened_at = None;
        inner.consecutive_failures = 0;
        inner.probe_in_flight = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(BreakerConfig {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(60),
        })
    }

    #[tokio::test]
    async fn test_starts_closed() {
        assert_eq!(breaker().state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_consecutive_failures_trip() {
        let cb = breaker();
        assert!(!cb.record_failure().await);
        assert!(!cb.record_failure().await);
        assert_eq!(cb.state().await, CircuitState::Closed);

        assert!(cb.record_failure().await);
        assert_eq!(cb.state().await, CircuitState::Open);
        assert_eq!(cb.admit().await, Admission::ShortCircuit);
        assert_eq!(cb.short_circuit_count().await, 1);
    }

    #[tokio::test]
    async fn test_success_resets_failure_count() {
        let cb = breaker();
        cb.record_failure().await;
        cb.record_failure().await;
        cb.record_success().await;

        cb.record_failure().await;
        cb.record_failure().await;
        assert_eq!(cb.state().await, CircuitState::Closed);
        cb.record_failure().await;
        assert_eq!(cb.state().await, CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_timeout_admits_single_probe() {
        let cb = breaker();
        for _ in 0..3 {
            cb.record_failure().await;
        }
        assert_eq!(cb.admit().await, Admission::ShortCircuit);

        tokio::time::advance(Duration::from_secs(61)).await;

        // First call after the timeout is the probe; the next short-circuits.
        assert_eq!(cb.admit().await, Admission::Allowed);
        assert_eq!(cb.state().await, CircuitState::HalfOpen);
        assert_eq!(cb.admit().await, Admission::ShortCircuit);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_success_closes() {
        let cb = breaker();
        for _ in 0..3 {
            cb.record_failure().await;
        }
        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cb.admit().await, Admission::Allowed);
        cb.record_success().await;
        assert_eq!(cb.state().await, CircuitState::Closed);
        assert_eq!(cb.admit().await, Admission::Allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_failure_reopens() {
        let cb = breaker();
        for _ in 0..3 {
            cb.record_failure().await;
        }
        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cb.admit().await, Admission::Allowed);
        assert!(cb.record_failure().await);
        assert_eq!(cb.state().await, CircuitState::Open);

        // opened_at was refreshed: still short-circuiting before the timeout.
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cb.admit().await, Admission::ShortCircuit);
        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(cb.admit().await, Admission::Allowed);
    }

    #[tokio::test]
    async fn test_force_open_and_close() {
        let cb = breaker();
        cb.force_open().await;
        assert_eq!(cb.state().await, CircuitState::Open);
        assert_eq!(cb.admit().await, Admission::ShortCircuit);

        cb.force_close().await;
        assert_eq!(cb.state().await, CircuitState::Closed);
        assert_eq!(cb.admit().await, Admission::Allowed);
    }
}
