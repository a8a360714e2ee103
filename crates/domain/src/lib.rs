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

//! # CreditCore Domain
//!
//! ## Purpose
//! Shared vocabulary of the credit-application pipeline: country and currency
//! codes, the application status state machine, monetary precision rules, the
//! banking/risk data transfer types, and the processing-error taxonomy whose
//! retry classification drives the worker pool.
//!
//! ## Architecture Context
//! Every other crate in the workspace depends on this one and nothing here
//! depends on I/O. Types are plain serde structs; there is no session-scoped
//! or lazily-loaded state — the persistence layer returns fully materialized
//! values of these types.
//!
//! ## Key Components
//! - [`CountryCode`] / [`Currency`]: closed enums for the six markets
//! - [`ApplicationStatus`] + [`state_machine`]: the authoritative transition table
//! - [`money`]: fixed-point validation for monetary fields (12 integer + 2
//!   fractional digits, never binary floating point)
//! - [`BankingData`] / [`RiskAssessment`]: provider and evaluation artifacts
//! - [`ProcessingError`]: worker failure taxonomy; `is_retryable()` is the
//!   single, total retry classifier

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod banking;
pub mod country;
pub mod error;
pub mod money;
pub mod state_machine;
pub mod status;

pub use banking::{BankingData, DocumentValidation, Recommendation, RiskAssessment, RiskLevel};
pub use country::{CountryCode, Currency};
pub use error::ProcessingError;
pub use state_machine::StateTransitionError;
pub use status::ApplicationStatus;
