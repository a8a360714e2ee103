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

//! # CreditCore API
//!
//! ## Purpose
//! The synchronous HTTP surface the pipeline consumes:
//!
//! - `POST /applications` — validate, encrypt, insert. The database trigger
//!   takes it from there; this handler never talks to the queue.
//! - `POST /webhooks/bank-confirmation` — HMAC-authenticated, idempotent
//!   provider confirmations.
//! - `GET /ws` — WebSocket endpoint for realtime status updates.
//! - `GET /health` — liveness.
//!
//! ## Error Mapping
//! | Condition | Status |
//! |-----------|--------|
//! | input validation (name, document, amount, currency) | 400 |
//! | idempotency-key replay | 201 with the existing application |
//! | active duplicate (country, document) | 409 |
//! | webhook signature missing/mismatched | 401 |
//! | webhook payload over 1 MiB | 413 |
//! | webhook target unreachable from current status | 422 |
//!
//! Request authentication (JWT) and rate limiting belong to an outer layer.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod applications;
pub mod error;
pub mod signature;
pub mod websocket;
pub mod webhooks;

pub use error::ApiError;
pub use signature::WebhookSignature;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use creditcore_persistence::{ApplicationRepository, PiiCipher, WebhookEventStore};
use creditcore_realtime::{ConnectionManager, UpdatePublisher};
use creditcore_strategies::StrategyRegistry;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Webhook payloads are capped at 1 MiB.
pub const MAX_WEBHOOK_PAYLOAD_BYTES: usize = 1024 * 1024;

/// Other endpoints allow up to 2 MiB.
pub const MAX_PAYLOAD_BYTES: usize = 2 * 1024 * 1024;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application persistence.
    pub repository: ApplicationRepository,
    /// Webhook event persistence.
    pub webhook_events: WebhookEventStore,
    /// Country strategies (document validation at intake).
    pub strategies: Arc<StrategyRegistry>,
    /// Realtime update sink.
    pub publisher: Arc<dyn UpdatePublisher>,
    /// WebSocket session registry.
    pub ws_manager: Arc<ConnectionManager>,
    /// PII cipher.
    pub cipher: PiiCipher,
    /// Webhook HMAC verifier.
    pub webhook_signature: WebhookSignature,
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/applications", post(applications::create_application))
        .route(
            "/webhooks/bank-confirmation",
            post(webhooks::bank_confirmation),
        )
        .route("/ws", get(websocket::websocket_endpoint))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_PAYLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
