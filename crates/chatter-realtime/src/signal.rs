//! Client/server signal definitions for the realtime event channel.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chatter_entity::message::Message;

/// Signals sent by the client to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientSignal {
    /// Claim a user identity for this connection and register presence.
    Join {
        /// The joining user.
        user_id: Uuid,
    },
    /// Persist and route a chat message.
    SendMessage {
        /// The sending user.
        sender_id: Uuid,
        /// Receiving user, for direct messages.
        receiver_id: Option<Uuid>,
        /// Target group, for group messages.
        group_id: Option<Uuid>,
        /// Message text.
        text: String,
    },
    /// The sender started typing.
    TypingStart {
        /// The typing user.
        sender_id: Uuid,
        /// Addressed user, for direct chats.
        receiver_id: Option<Uuid>,
        /// Target group, for group chats.
        group_id: Option<Uuid>,
    },
    /// The sender stopped typing.
    TypingStop {
        /// The typing user.
        sender_id: Uuid,
        /// Addressed user, for direct chats.
        receiver_id: Option<Uuid>,
        /// Target group, for group chats.
        group_id: Option<Uuid>,
    },
    /// Opt in to a group's live fan-out.
    JoinGroup {
        /// Group to join.
        group_id: Uuid,
    },
    /// Opt out of a group's live fan-out.
    LeaveGroup {
        /// Group to leave.
        group_id: Uuid,
    },
}

/// Signals sent by the server to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerSignal {
    /// Full online-user list, sent once on connect.
    PresenceSnapshot {
        /// Currently online user IDs.
        online: Vec<Uuid>,
    },
    /// Full online-user list, broadcast on any join or disconnect.
    PresenceUpdate {
        /// Currently online user IDs.
        online: Vec<Uuid>,
    },
    /// A persisted message delivered to a relevant connection.
    ReceiveMessage {
        /// The message as saved, with stable id and timestamp.
        message: Message,
    },
    /// Another user started typing.
    UserTyping {
        /// The typing user.
        user_id: Uuid,
        /// Group scope, absent for direct chats.
        group_id: Option<Uuid>,
    },
    /// Another user stopped typing.
    UserStopTyping {
        /// The typing user.
        user_id: Uuid,
        /// Group scope, absent for direct chats.
        group_id: Option<Uuid>,
    },
    /// Group channel join confirmed.
    GroupJoined {
        /// The joined group.
        group_id: Uuid,
    },
    /// Group channel join refused.
    ChannelDenied {
        /// The refused group.
        group_id: Uuid,
        /// Human-readable reason.
        reason: String,
    },
    /// A send-message could not be persisted; sent to the sender only.
    SendFailed {
        /// Human-readable reason.
        reason: String,
    },
    /// A newer connection joined as the same user; this one is being closed.
    SessionReplaced {
        /// The user whose presence moved to the newer connection.
        user_id: Uuid,
    },
    /// Protocol-level error.
    Error {
        /// Error code.
        code: String,
        /// Error description.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_signal_wire_format() {
        let raw = r#"{"type":"join","user_id":"8f14e45f-ceea-4672-a6f8-8f2f4b1a3c01"}"#;
        let signal: ClientSignal = serde_json::from_str(raw).unwrap();
        assert!(matches!(signal, ClientSignal::Join { .. }));
    }

    #[test]
    fn server_signal_tags_are_snake_case() {
        let signal = ServerSignal::PresenceSnapshot { online: vec![] };
        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json["type"], "presence_snapshot");

        let signal = ServerSignal::SendFailed {
            reason: "store down".into(),
        };
        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json["type"], "send_failed");
    }
}
