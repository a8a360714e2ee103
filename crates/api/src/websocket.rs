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

//! `GET /ws`: the realtime session endpoint.
//!
//! Protocol: the server sends a welcome on accept; clients may subscribe /
//! unsubscribe per application and must ping within the idle window (the
//! server answers pong). Sessions silent for 60 seconds are closed.
//! Delivery is best-effort; there are no per-message acks.

use crate::AppState;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use creditcore_realtime::{ClientAction, ServerMessage};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use ulid::Ulid;

/// Sessions without inbound traffic for this long are closed.
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Handler for `GET /ws`.
pub async fn websocket_endpoint(
    State(state): State<AppState>,
    upgrade: WebSocketUpgrade,
) -> impl IntoResponse {
    upgrade.on_upgrade(move |socket| session_loop(state, socket))
}

async fn session_loop(state: AppState, mut socket: WebSocket) {
    let connection_id = format!("WS-{}", Ulid::new());
    let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<String>();
    state.ws_manager.register(&connection_id, outgoing_tx).await;
    info!(connection_id, "websocket session opened");

    let welcome = ServerMessage::Welcome {
        connection_id: connection_id.clone(),
        message: "Connected to CreditCore".to_string(),
    };
    if socket.send(Message::Text(welcome.to_json())).await.is_err() {
        state.ws_manager.unregister(&connection_id).await;
        return;
    }

    loop {
        tokio::select! {
            // Fan-out frames routed to this session by the manager.
            frame = outgoing_rx.recv() => {
                let Some(frame) = frame else { break };
                if socket.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
            // Client traffic, bounded by the idle timeout.
            incoming = tokio::time::timeout(IDLE_TIMEOUT, socket.recv()) => {
                match incoming {
                    Err(_) => {
                        debug!(connection_id, "closing idle websocket session");
                        let _ = socket.send(Message::Close(None)).await;
                        break;
                    }
                    Ok(None) => break,
                    Ok(Some(Err(err))) => {
                        debug!(connection_id, error = %err, "websocket receive error");
                        break;
                    }
                    Ok(Some(Ok(Message::Text(text)))) => {
                        if let Some(reply) = handle_action(&state, &connection_id, &text).await {
                            if socket.send(Message::Text(reply.to_json())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(Some(Ok(Message::Close(_)))) => break,
                    // Pings/pongs/binary: ignored, but they reset the idle clock.
                    Ok(Some(Ok(_))) => {}
                }
            }
        }
    }

    state.ws_manager.unregister(&connection_id).await;
    info!(connection_id, "websocket session closed");
}

async fn handle_action(
    state: &AppState,
    connection_id: &str,
    text: &str,
) -> Option<ServerMessage> {
    match serde_json::from_str::<ClientAction>(text) {
        Ok(ClientAction::Subscribe { application_id }) => {
            state
                .ws_manager
                .subscribe(connection_id, &application_id)
                .await;
            Some(ServerMessage::Subscribed { application_id })
        }
        Ok(ClientAction::Unsubscribe { application_id }) => {
            state
                .ws_manager
                .unsubscribe(connection_id, &application_id)
                .await;
            None
        }
        Ok(ClientAction::Ping) => Some(ServerMessage::Pong),
        Err(err) => {
            warn!(connection_id, error = %err, "unrecognized websocket action");
            Some(ServerMessage::Error {
                message: "unrecognized action".to_string(),
            })
        }
    }
}
