//! Wire frames exchanged with clients and events exchanged between groups.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use cropwatch_core::types::UserId;
use cropwatch_entity::notification::DeliveryPayload;

/// Frames sent by the client.
///
/// Anything that parses as JSON but does not match a variant here is
/// ignored by the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Application-level keepalive.
    Ping {
        /// Client-chosen value echoed back in the pong.
        #[serde(default)]
        timestamp: Option<Value>,
    },
}

/// Frames sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// First frame after a successful handshake.
    ConnectionEstablished {
        /// Greeting text.
        message: String,
        /// Authenticated user.
        user_id: UserId,
        /// Authenticated username.
        username: String,
    },
    /// Reply to an inbound ping.
    Pong {
        /// The ping's timestamp, or `null` when it had none.
        timestamp: Value,
    },
    /// A pushed notification.
    Notification {
        /// The delivery payload, unchanged.
        notification: DeliveryPayload,
    },
    /// The last inbound frame could not be handled.
    Error {
        /// Human-readable reason.
        message: String,
    },
}

impl OutboundMessage {
    /// Greeting for a freshly opened connection.
    pub fn connection_established(user_id: UserId, username: impl Into<String>) -> Self {
        let username = username.into();
        Self::ConnectionEstablished {
            message: format!("Connected as {username}"),
            user_id,
            username,
        }
    }

    /// Serializes to a JSON text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Events addressed to a group and fanned out to its member connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GroupEvent {
    /// Push a notification to every member.
    SendNotification {
        /// Payload forwarded verbatim in the `notification` frame.
        notification: DeliveryPayload,
    },
}
