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

//! # CreditCore
//!
//! Asynchronous credit-application processing: HTTP intake, a
//! trigger-backed durable job table, a Redis Streams work queue, a locked
//! worker pipeline with per-provider circuit breakers, webhook
//! confirmations, and realtime WebSocket fan-out.
//!
//! This crate wires the workspace together: configuration loading with
//! fail-closed secret validation, tracing setup, and the `server` /
//! `worker` binaries.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod tracing_setup;

pub use config::Config;
