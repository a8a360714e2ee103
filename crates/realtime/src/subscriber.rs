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

//! Per-process subscriber bridging the Redis channel to local sessions.

use crate::manager::ConnectionManager;
use crate::messages::BROADCAST_CHANNEL;
use crate::RealtimeResult;
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

/// Reconnect policy for the subscriber loop.
#[derive(Clone, Copy, Debug)]
pub struct SubscriberConfig {
    /// First reconnect delay.
    pub initial_backoff: Duration,
    /// Backoff ceiling.
    pub max_backoff: Duration,
    /// Consecutive failures before giving up.
    pub max_retries: u32,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(300),
            max_retries: 10,
        }
    }
}

/// Run the subscriber until shutdown.
///
/// Listens on the broadcast channel and forwards each message to the local
/// [`ConnectionManager`]. Connection failures reconnect with exponential
/// backoff; a successful (re)subscription resets the failure counter. After
/// `max_retries` consecutive failures the task exits — realtime updates are
/// advisory, so this never takes the process down.
pub async fn run_subscriber(
    redis_url: String,
    manager: Arc<ConnectionManager>,
    config: SubscriberConfig,
    shutdown: Arc<Notify>,
) {
    let mut retries = 0u32;
    let mut backoff = config.initial_backoff;

    loop {
        match subscribe_and_forward(&redis_url, &manager, &shutdown).await {
            Ok(SubscriberExit::Shutdown) => {
                info!("realtime subscriber stopping");
                return;
            }
            Ok(SubscriberExit::StreamEnded) | Err(_) if retries + 1 >= config.max_retries => {
                error!(
                    retries = retries + 1,
                    "realtime subscriber failed too many times, giving up"
                );
                return;
            }
            Ok(SubscriberExit::StreamEnded) => {
                retries += 1;
                warn!(retries, "realtime subscriber stream ended, reconnecting");
            }
            Err(err) => {
                retries += 1;
                warn!(retries, error = %err, "realtime subscriber error, reconnecting");
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(backoff) => {}
            _ = shutdown.notified() => {
                info!("realtime subscriber stopping during backoff");
                return;
            }
        }
        backoff = (backoff * 2).min(config.max_backoff);
    }
}

enum SubscriberExit {
    Shutdown,
    StreamEnded,
}

async fn subscribe_and_forward(
    redis_url: &str,
    manager: &ConnectionManager,
    shutdown: &Notify,
) -> RealtimeResult<SubscriberExit> {
    let client = redis::Client::open(redis_url)
        .map_err(|e| crate::RealtimeError::Backend(format!("failed to create client: {e}")))?;
    let conn = client.get_async_connection().await?;
    let mut pubsub = conn.into_pubsub();
    pubsub.subscribe(BROADCAST_CHANNEL).await?;
    info!(channel = BROADCAST_CHANNEL, "realtime subscriber connected");

    let mut stream = pubsub.on_message();
    loop {
        tokio::select! {
            message = stream.next() => {
                let Some(message) = message else {
                    return Ok(SubscriberExit::StreamEnded);
                };
                let payload: String = match message.get_payload() {
                    Ok(payload) => payload,
                    Err(err) => {
                        warn!(error = %err, "undecodable pub/sub payload");
                        continue;
                    }
                };
                forward(manager, &payload).await;
            }
            _ = shutdown.notified() => {
                return Ok(SubscriberExit::Shutdown);
            }
        }
    }
}

/// Route one raw frame. Application updates go through subscription
/// filtering; everything else is a global event.
async fn forward(manager: &ConnectionManager, frame: &str) {
    let parsed: Value = match serde_json::from_str(frame) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "dropping malformed pub/sub message");
            return;
        }
    };

    if parsed["type"] == "application_update" {
        if let Some(application_id) = parsed["data"]["id"].as_str() {
            debug!(application_id, "forwarding application update");
            manager.dispatch_update(application_id, frame).await;
            return;
        }
    }
    manager.broadcast_all(frame).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_forward_routes_updates_by_subscription() {
        let manager = ConnectionManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.register("ws-1", tx).await;
        manager.subscribe("ws-1", "app-1").await;

        forward(
            &manager,
            r#"{"type":"application_update","data":{"id":"app-2","status":"APPROVED"}}"#,
        )
        .await;
        forward(
            &manager,
            r#"{"type":"application_update","data":{"id":"app-1","status":"APPROVED"}}"#,
        )
        .await;

        let frame = rx.recv().await.unwrap();
        assert!(frame.contains("app-1"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_forward_broadcasts_global_events() {
        let manager = ConnectionManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.register("ws-1", tx).await;
        manager.subscribe("ws-1", "app-1").await;

        forward(&manager, r#"{"type":"maintenance","data":{}}"#).await;
        assert!(rx.recv().await.unwrap().contains("maintenance"));
    }

    #[tokio::test]
    async fn test_forward_drops_malformed() {
        let manager = ConnectionManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.register("ws-1", tx).await;

        forward(&manager, "not json").await;
        assert!(rx.try_recv().is_err());
    }
}
