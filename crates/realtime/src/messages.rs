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

//! WebSocket and pub/sub wire messages.

use serde::{Deserialize, Serialize};

/// Redis channel every update is published on.
pub const BROADCAST_CHANNEL: &str = "websocket:broadcast";

/// The `data` document of an `application_update` message.
///
/// `risk_score` travels as a string to keep decimal precision exact on the
/// wire; `updated_at` is RFC 3339.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePayload {
    /// Application id.
    pub id: String,
    /// New status label.
    pub status: String,
    /// Risk score, when evaluated.
    pub risk_score: Option<String>,
    /// Last-update timestamp.
    pub updated_at: Option<String>,
}

/// Server -> client messages: `{type, ...}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// An application changed state.
    ApplicationUpdate {
        /// The update document.
        data: UpdatePayload,
    },
    /// Sent once on connection accept.
    Welcome {
        /// Session id assigned by the server.
        connection_id: String,
        /// Greeting line.
        message: String,
    },
    /// Keepalive reply.
    Pong,
    /// Subscription confirmation.
    Subscribed {
        /// Application the session subscribed to.
        application_id: String,
    },
    /// Protocol error back to the client.
    Error {
        /// What went wrong.
        message: String,
    },
}

impl ServerMessage {
    /// Serialize for a WebSocket text frame or pub/sub payload.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("server messages always serialize")
    }
}

/// Client -> server actions: `{action, ...}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAction {
    /// Receive only updates for this application (plus global events).
    Subscribe {
        /// Application id to follow.
        application_id: String,
    },
    /// Stop following an application.
    Unsubscribe {
        /// Application id to drop.
        application_id: String,
    },
    /// Keepalive; the server answers with `pong`.
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_update_wire_shape() {
        let message = ServerMessage::ApplicationUpdate {
            data: UpdatePayload {
                id: "8f14e45f-ceea-4e6f-b7fe-d87b1b2c3d4e".into(),
                status: "APPROVED".into(),
                risk_score: Some("12.50".into()),
                updated_at: Some("2025-06-01T12:00:00Z".into()),
            },
        };
        let value: serde_json::Value = serde_json::from_str(&message.to_json()).unwrap();
        assert_eq!(value["type"], "application_update");
        assert_eq!(value["data"]["status"], "APPROVED");
        assert_eq!(value["data"]["risk_score"], "12.50");
    }

    #[test]
    fn test_pong_is_bare() {
        assert_eq!(ServerMessage::Pong.to_json(), r#"{"type":"pong"}"#);
    }

    #[test]
    fn test_client_actions_parse() {
        let subscribe: ClientAction =
            serde_json::from_str(r#"{"action":"subscribe","application_id":"abc"}"#).unwrap();
        assert_eq!(
            subscribe,
            ClientAction::Subscribe {
                application_id: "abc".into()
            }
        );
        let ping: ClientAction = serde_json::from_str(r#"{"action":"ping"}"#).unwrap();
        assert_eq!(ping, ClientAction::Ping);
    }

    #[test]
    fn test_unknown_action_rejected() {
        assert!(serde_json::from_str::<ClientAction>(r#"{"action":"shout"}"#).is_err());
    }
}
