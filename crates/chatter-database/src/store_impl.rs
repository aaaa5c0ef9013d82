//! `IdentityStore` / `MessageStore` implementations backed by the
//! repositories, so the realtime core stays free of sqlx.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use chatter_core::result::AppResult;
use chatter_entity::message::{Message, NewMessage};
use chatter_entity::store::{IdentityStore, MessageStore};

use crate::repositories::{GroupRepository, MessageRepository, UserRepository};

/// Identity-store facade over the user and group repositories.
#[derive(Debug, Clone)]
pub struct PgIdentityStore {
    users: UserRepository,
    groups: GroupRepository,
}

impl PgIdentityStore {
    /// Create a new identity store over the given repositories.
    pub fn new(users: UserRepository, groups: GroupRepository) -> Self {
        Self { users, groups }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn set_online(&self, user_id: Uuid) -> AppResult<()> {
        self.users.set_online(user_id, true).await
    }

    async fn set_offline(&self, user_id: Uuid, last_seen: DateTime<Utc>) -> AppResult<()> {
        self.users.set_offline(user_id, last_seen).await
    }

    async fn is_group_member(&self, group_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        self.groups.is_member(group_id, user_id).await
    }
}

/// Message-store facade over the message repository.
#[derive(Debug, Clone)]
pub struct PgMessageStore {
    messages: MessageRepository,
}

impl PgMessageStore {
    /// Create a new message store over the given repository.
    pub fn new(messages: MessageRepository) -> Self {
        Self { messages }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn save(&self, draft: NewMessage) -> AppResult<Message> {
        self.messages.create(&draft).await
    }
}
