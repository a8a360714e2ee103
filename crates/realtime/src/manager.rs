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

//! WebSocket session registry and subscription routing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use tracing::debug;

struct Session {
    sender: mpsc::UnboundedSender<String>,
    subscriptions: HashSet<String>,
}

/// Tracks connected WebSocket sessions and their application subscriptions.
///
/// Routing rule: a session with no subscriptions receives every update; a
/// session with subscriptions receives only matching updates plus global
/// events. Sends are fire-and-forget; a closed receiver evicts the session.
#[derive(Default)]
pub struct ConnectionManager {
    sessions: RwLock<HashMap<String, Session>>,
}

impl ConnectionManager {
    /// Create an empty manager.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a session. The manager writes outgoing frames into
    /// `sender`; the WebSocket task owns the receiving half.
    pub async fn register(&self, connection_id: &str, sender: mpsc::UnboundedSender<String>) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(
            connection_id.to_string(),
            Session {
                sender,
                subscriptions: HashSet::new(),
            },
        );
        debug!(connection_id, total = sessions.len(), "websocket connected");
    }

    /// Drop a session and its subscriptions.
    pub async fn unregister(&self, connection_id: &str) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(connection_id).is_some() {
            debug!(connection_id, total = sessions.len(), "websocket disconnected");
        }
    }

    /// Subscribe a session to one application's updates.
    pub async fn subscribe(&self, connection_id: &str, application_id: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(connection_id) {
            session.subscriptions.insert(application_id.to_string());
            debug!(connection_id, application_id, "subscribed");
        }
    }

    /// Remove one subscription.
    pub async fn unsubscribe(&self, connection_id: &str, application_id: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(connection_id) {
            session.subscriptions.remove(application_id);
            debug!(connection_id, application_id, "unsubscribed");
        }
    }

    /// Send one frame to one session. Returns false when the session is
    /// gone (and evicts it).
    pub async fn send_to(&self, connection_id: &str, frame: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get(connection_id) {
            Some(session) if session.sender.send(frame.to_string()).is_ok() => true,
            Some(_) => {
                sessions.remove(connection_id);
                false
            }
            None => false,
        }
    }

    /// Route an application update: unfiltered sessions and matching
    /// subscribers receive it; dead sessions are evicted.
    pub async fn dispatch_update(&self, application_id: &str, frame: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|connection_id, session| {
            let interested = session.subscriptions.is_empty()
                || session.subscriptions.contains(application_id);
            if !interested {
                return true;
            }
            if session.sender.send(frame.to_string()).is_err() {
                debug!(connection_id, "evicting dead websocket session");
                return false;
            }
            true
        });
    }

    /// Send a global event to every session.
    pub async fn broadcast_all(&self, frame: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|connection_id, session| {
            if session.sender.send(frame.to_string()).is_err() {
                debug!(connection_id, "evicting dead websocket session");
                return false;
            }
            true
        });
    }

    /// Connected session count.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn connect(
        manager: &ConnectionManager,
        id: &str,
    ) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        manager.register(id, tx).await;
        rx
    }

    #[tokio::test]
    async fn test_unfiltered_session_gets_all_updates() {
        let manager = ConnectionManager::new();
        let mut rx = connect(&manager, "ws-1").await;

        manager.dispatch_update("app-1", "frame-1").await;
        manager.dispatch_update("app-2", "frame-2").await;

        assert_eq!(rx.recv().await.unwrap(), "frame-1");
        assert_eq!(rx.recv().await.unwrap(), "frame-2");
    }

    #[tokio::test]
    async fn test_subscribed_session_is_filtered() {
        let manager = ConnectionManager::new();
        let mut rx = connect(&manager, "ws-1").await;
        manager.subscribe("ws-1", "app-1").await;

        manager.dispatch_update("app-2", "other").await;
        manager.dispatch_update("app-1", "mine").await;

        assert_eq!(rx.recv().await.unwrap(), "mine");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsubscribe_returns_to_firehose() {
        let manager = ConnectionManager::new();
        let mut rx = connect(&manager, "ws-1").await;
        manager.subscribe("ws-1", "app-1").await;
        manager.unsubscribe("ws-1", "app-1").await;

        manager.dispatch_update("app-2", "frame").await;
        assert_eq!(rx.recv().await.unwrap(), "frame");
    }

    #[tokio::test]
    async fn test_broadcast_reaches_subscribed_sessions() {
        let manager = ConnectionManager::new();
        let mut rx = connect(&manager, "ws-1").await;
        manager.subscribe("ws-1", "app-1").await;

        manager.broadcast_all("global").await;
        assert_eq!(rx.recv().await.unwrap(), "global");
    }

    #[tokio::test]
    async fn test_dead_session_evicted_on_send() {
        let manager = ConnectionManager::new();
        let rx = connect(&manager, "ws-1").await;
        drop(rx);

        assert_eq!(manager.session_count().await, 1);
        manager.dispatch_update("app-1", "frame").await;
        assert_eq!(manager.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_unregister_cleans_up() {
        let manager = ConnectionManager::new();
        let _rx = connect(&manager, "ws-1").await;
        manager.unregister("ws-1").await;
        assert_eq!(manager.session_count().await, 0);
        assert!(!manager.send_to("ws-1", "frame").await);
    }
}
