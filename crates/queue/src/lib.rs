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

//! # CreditCore Work Queue
//!
//! ## Purpose
//! Carries `process_credit_application` tasks from the queue bridge to the
//! worker pool. The Redis Streams backend gives cross-process, persistent,
//! consumer-group delivery; the in-memory backend keeps unit tests fast.
//!
//! ## Architecture Context
//! ```text
//! applications INSERT ──trigger──> pending_jobs (status=pending)
//!                                      │  QueueBridge tick (60s)
//!                                      │  FOR UPDATE SKIP LOCKED
//!                                      ▼
//!                              TaskQueue::push (XADD)
//!                                      │  mark_enqueued + commit
//!                                      ▼
//!                           worker pool XREADGROUP / ack
//! ```
//! The bridge transaction is the at-least-once hinge: a crash between the
//! queue push and the commit leaves the row `pending`, so the next tick
//! pushes it again. Workers deduplicate via the per-application lock and
//! idempotent status checks.
//!
//! ## Key Components
//! - [`TaskEnvelope`]: wire format `{task_name, args, kwargs, trace_context?}`
//! - [`TaskQueue`]: push/pop/ack backend trait
//! - [`RedisTaskQueue`]: Redis Streams with a `workers` consumer group
//! - [`InMemoryTaskQueue`]: test backend
//! - [`QueueBridge`]: the pending-jobs poller

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bridge;
pub mod envelope;
pub mod in_memory;
pub mod redis_backend;

pub use bridge::{BridgeStats, QueueBridge, QueueBridgeConfig};
pub use envelope::{TaskEnvelope, TraceContext};
pub use in_memory::InMemoryTaskQueue;
pub use redis_backend::RedisTaskQueue;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors from the queue layer.
#[derive(Error, Debug)]
pub enum QueueError {
    /// Backend failure (Redis connectivity, protocol).
    #[error("queue backend error: {0}")]
    Backend(String),

    /// Envelope could not be encoded or decoded.
    #[error("queue serialization error: {0}")]
    Serialization(String),
}

impl From<redis::RedisError> for QueueError {
    fn from(err: redis::RedisError) -> Self {
        QueueError::Backend(format!("redis error: {err}"))
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        QueueError::Serialization(err.to_string())
    }
}

/// A task delivered to a worker.
#[derive(Clone, Debug)]
pub struct QueuedTask {
    /// Backend message id; used for ack and as the job id in diagnostics.
    pub message_id: String,
    /// The task payload.
    pub envelope: TaskEnvelope,
}

/// Work queue backend.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Push a task; returns the queue handle (message id).
    async fn push(&self, envelope: &TaskEnvelope) -> QueueResult<String>;

    /// Pop up to `max` tasks, blocking up to `timeout` when empty.
    async fn pop(&self, max: usize, timeout: Duration) -> QueueResult<Vec<QueuedTask>>;

    /// Acknowledge a processed task.
    async fn ack(&self, message_id: &str) -> QueueResult<()>;

    /// Return an unfinished task to the queue for redelivery.
    async fn requeue(&self, message_id: &str) -> QueueResult<()>;
}
