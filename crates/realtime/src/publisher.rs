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

//! Producer side of the update channel.

use crate::messages::{ServerMessage, UpdatePayload, BROADCAST_CHANNEL};
use crate::RealtimeResult;
use async_trait::async_trait;
use redis::aio::ConnectionManager as RedisConnectionManager;
use tokio::sync::Mutex;

/// Publishes application updates for fan-out.
///
/// Callers treat failures as advisory: log and continue, never block the
/// state transition that produced the update.
#[async_trait]
pub trait UpdatePublisher: Send + Sync {
    /// Publish one update.
    async fn publish_update(&self, update: &UpdatePayload) -> RealtimeResult<()>;
}

/// Redis pub/sub publisher used in production.
#[derive(Clone)]
pub struct RedisUpdatePublisher {
    conn: RedisConnectionManager,
}

impl RedisUpdatePublisher {
    /// Connect to Redis.
    pub async fn new(redis_url: &str) -> RealtimeResult<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| crate::RealtimeError::Backend(format!("failed to create client: {e}")))?;
        let conn = client
            .get_tokio_connection_manager()
            .await
            .map_err(|e| crate::RealtimeError::Backend(format!("failed to connect: {e}")))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl UpdatePublisher for RedisUpdatePublisher {
    async fn publish_update(&self, update: &UpdatePayload) -> RealtimeResult<()> {
        let frame = ServerMessage::ApplicationUpdate {
            data: update.clone(),
        }
        .to_json();
        let mut conn = self.conn.clone();
        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(BROADCAST_CHANNEL)
            .arg(&frame)
            .query_async(&mut conn)
            .await?;
        tracing::debug!(
            application_id = %update.id,
            status = %update.status,
            receivers,
            "application update published"
        );
        Ok(())
    }
}

/// Test publisher that records every update it is handed.
#[derive(Default)]
pub struct RecordingPublisher {
    updates: Mutex<Vec<UpdatePayload>>,
}

impl RecordingPublisher {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates published so far, in order.
    pub async fn updates(&self) -> Vec<UpdatePayload> {
        self.updates.lock().await.clone()
    }
}

#[async_trait]
impl UpdatePublisher for RecordingPublisher {
    async fn publish_update(&self, update: &UpdatePayload) -> RealtimeResult<()> {
        self.updates.lock().await.push(update.clone());
        Ok(())
    }
}
