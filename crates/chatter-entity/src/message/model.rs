//! Message entity model.
//!
//! A message is addressed to exactly one of a receiver (direct chat) or a
//! group. The invariant is enforced at construction via [`NewMessage::new`]
//! and again by a database CHECK constraint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use chatter_core::error::AppError;

/// A persisted chat message.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    /// Unique message identifier, assigned by the store on save.
    pub id: Uuid,
    /// The sending user.
    pub sender_id: Uuid,
    /// The receiving user (direct messages only).
    pub receiver_id: Option<Uuid>,
    /// The target group (group messages only).
    pub group_id: Option<Uuid>,
    /// Message text.
    pub text: String,
    /// Whether the receiver has read the message (direct messages).
    pub read: bool,
    /// Users that have hidden this message from their own view.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub hidden_for: Vec<Uuid>,
    /// When the message was created, assigned by the store.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Returns the routing target of this message.
    pub fn target(&self) -> MessageTarget {
        match (self.receiver_id, self.group_id) {
            (Some(user), None) => MessageTarget::Direct(user),
            (None, Some(group)) => MessageTarget::Group(group),
            // Unreachable for rows that passed the CHECK constraint.
            _ => MessageTarget::Invalid,
        }
    }

    /// Whether the given user has hidden this message.
    pub fn is_hidden_for(&self, user_id: Uuid) -> bool {
        self.hidden_for.contains(&user_id)
    }
}

/// Where a message is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTarget {
    /// Deliver to a single user.
    Direct(Uuid),
    /// Fan out to a group channel.
    Group(Uuid),
    /// Neither or both targets set; rejected before persistence.
    Invalid,
}

/// An unsaved message, validated at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    /// The sending user.
    pub sender_id: Uuid,
    /// The receiving user (direct messages only).
    pub receiver_id: Option<Uuid>,
    /// The target group (group messages only).
    pub group_id: Option<Uuid>,
    /// Message text.
    pub text: String,
}

impl NewMessage {
    /// Builds a new message, rejecting drafts that do not name exactly one
    /// of receiver or group.
    pub fn new(
        sender_id: Uuid,
        receiver_id: Option<Uuid>,
        group_id: Option<Uuid>,
        text: impl Into<String>,
    ) -> Result<Self, AppError> {
        match (receiver_id, group_id) {
            (Some(_), None) | (None, Some(_)) => Ok(Self {
                sender_id,
                receiver_id,
                group_id,
                text: text.into(),
            }),
            (None, None) => Err(AppError::validation(
                "Message must have either a receiver or a group",
            )),
            (Some(_), Some(_)) => Err(AppError::validation(
                "Message cannot have both a receiver and a group",
            )),
        }
    }

    /// Returns the routing target of this draft.
    pub fn target(&self) -> MessageTarget {
        match (self.receiver_id, self.group_id) {
            (Some(user), None) => MessageTarget::Direct(user),
            (None, Some(group)) => MessageTarget::Group(group),
            _ => MessageTarget::Invalid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_draft_is_valid() {
        let draft = NewMessage::new(Uuid::new_v4(), Some(Uuid::new_v4()), None, "hi").unwrap();
        assert!(matches!(draft.target(), MessageTarget::Direct(_)));
    }

    #[test]
    fn group_draft_is_valid() {
        let draft = NewMessage::new(Uuid::new_v4(), None, Some(Uuid::new_v4()), "hi").unwrap();
        assert!(matches!(draft.target(), MessageTarget::Group(_)));
    }

    #[test]
    fn draft_without_target_is_rejected() {
        assert!(NewMessage::new(Uuid::new_v4(), None, None, "hi").is_err());
    }

    #[test]
    fn draft_with_both_targets_is_rejected() {
        let err = NewMessage::new(
            Uuid::new_v4(),
            Some(Uuid::new_v4()),
            Some(Uuid::new_v4()),
            "hi",
        );
        assert!(err.is_err());
    }
}
