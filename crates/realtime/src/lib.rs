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

//! # CreditCore Realtime Fan-out
//!
//! ## Purpose
//! Pushes application status updates to connected WebSocket clients.
//! Workers and the webhook handler publish to one Redis pub/sub channel;
//! each API process runs a subscriber task that forwards messages to its
//! local sessions according to their subscriptions.
//!
//! ```text
//! worker ──publish──> redis channel ──subscriber──> ConnectionManager ──> WS sessions
//! ```
//!
//! ## Delivery Contract
//! Best-effort and advisory only:
//! - A publish failure is logged and never blocks a state transition.
//! - A failed session send evicts the session; there are no acks.
//! - Per-application ordering follows pub/sub order; nothing is guaranteed
//!   across applications.
//!
//! ## Key Components
//! - [`UpdatePublisher`] / [`RedisUpdatePublisher`]: the producer side
//! - [`run_subscriber`]: per-process bridge with bounded reconnect backoff
//! - [`ConnectionManager`]: session registry and subscription routing
//! - [`ServerMessage`] / [`ClientAction`]: the WebSocket protocol

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod manager;
pub mod messages;
pub mod publisher;
pub mod subscriber;

pub use manager::ConnectionManager;
pub use messages::{ClientAction, ServerMessage, UpdatePayload, BROADCAST_CHANNEL};
pub use publisher::{RecordingPublisher, RedisUpdatePublisher, UpdatePublisher};
pub use subscriber::{run_subscriber, SubscriberConfig};

use thiserror::Error;

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Errors from the realtime layer.
#[derive(Error, Debug)]
pub enum RealtimeError {
    /// Redis connectivity or protocol failure.
    #[error("realtime backend error: {0}")]
    Backend(String),

    /// Message could not be encoded.
    #[error("realtime serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for RealtimeError {
    fn from(err: redis::RedisError) -> Self {
        RealtimeError::Backend(format!("redis error: {err}"))
    }
}
