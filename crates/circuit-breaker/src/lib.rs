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

//! # CreditCore Circuit Breaker
//!
//! ## Purpose
//! Protects banking-provider calls from cascading failure. One breaker per
//! (country, provider) key; each process keeps its own breaker state — the
//! failure the breaker guards against (a provider outage) is itself
//! cluster-wide, so independent local detection converges quickly without a
//! coordination dependency.
//!
//! ## State Machine
//! ```text
//!   ┌────────┐ 5 consecutive failures ┌──────┐
//!   │ Closed │───────────────────────>│ Open │<────┐
//!   └────────┘                        └──┬───┘     │ probe
//!        ^                               │ 60s     │ failure
//!        │ probe success            ┌────▼─────┐   │
//!        └──────────────────────────│ HalfOpen │───┘
//!                                   └──────────┘
//! ```
//! While Open, calls short-circuit in bounded time and receive a conservative
//! fallback [`creditcore_domain::BankingData`] artifact; downstream
//! evaluation then tends toward UNDER_REVIEW rather than an automatic
//! approve/reject. A provider outage therefore never fails an application.
//!
//! ## Key Components
//! - [`CircuitBreaker`]: one breaker (closed / open / half-open)
//! - [`CircuitBreakerRegistry`]: concurrent map of breakers plus the
//!   `call` wrapper returning real data or the fallback artifact
//! - [`fallback_banking_data`]: the conservative artifact

#![warn(missing_docs)]
#![warn(clippy::all)]

mod breaker;
mod registry;

pub use breaker::{BreakerConfig, CircuitBreaker, CircuitState};
pub use registry::{fallback_banking_data, CircuitBreakerRegistry, ProviderCallError};
