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

//! # CreditCore Country Strategies
//!
//! ## Purpose
//! Everything that differs per market lives behind one trait: document
//! validation, banking-provider integration, and credit business rules for
//! Spain, Portugal, Italy, Mexico, Colombia, and Brazil.
//!
//! ## Architecture Context
//! The worker pool resolves a [`CountryStrategy`] from the
//! [`StrategyRegistry`] — an immutable table built once at process start —
//! then runs the three capabilities in order:
//!
//! 1. `validate_document` — synchronous, pure, no I/O
//! 2. `fetch_banking_data` — provider call; the worker wraps it with the
//!    circuit-breaker registry
//! 3. `evaluate` — pure; produces a recommendation and a 0-100 decimal score
//!
//! ## Design Decisions
//! - **Decimal everywhere**: every monetary computation uses `rust_decimal`.
//! - **Fallback forces review**: evaluation of a circuit-breaker fallback
//!   artifact always requires review; conservative synthetic data must never
//!   auto-approve or auto-reject.
//! - **Deterministic mocks**: mock providers derive data from a digit-sum
//!   hash of the document, so the same applicant gets the same answer across
//!   runs and processes.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod brazil;
mod colombia;
mod italy;
mod mexico;
mod portugal;
pub mod providers;
mod registry;
mod rules;
mod spain;
mod strategy;

pub use brazil::BrazilStrategy;
pub use colombia::ColombiaStrategy;
pub use italy::ItalyStrategy;
pub use mexico::MexicoStrategy;
pub use portugal::PortugalStrategy;
pub use providers::{BankingProvider, MockBankingProvider, ProviderError};
pub use registry::StrategyRegistry;
pub use spain::SpainStrategy;
pub use strategy::{CountryStrategy, EvaluationInput};
