//! Store traits consumed by the realtime core.
//!
//! The presence/delivery core treats persistence as an external
//! collaborator. These traits are its only view of it, so the core can be
//! exercised against in-memory fakes and the backing store swapped without
//! touching routing logic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use chatter_core::result::AppResult;

use crate::message::{Message, NewMessage};

/// User-identity persistence consulted and updated by the presence core.
#[async_trait]
pub trait IdentityStore: Send + Sync + 'static {
    /// Marks a user online. Called after presence registration.
    async fn set_online(&self, user_id: Uuid) -> AppResult<()>;

    /// Marks a user offline and records when they were last seen.
    async fn set_offline(&self, user_id: Uuid, last_seen: DateTime<Utc>) -> AppResult<()>;

    /// Whether a user belongs to a group's persisted membership.
    async fn is_group_member(&self, group_id: Uuid, user_id: Uuid) -> AppResult<bool>;
}

/// Message persistence invoked before routing.
#[async_trait]
pub trait MessageStore: Send + Sync + 'static {
    /// Persists a draft, assigning its id and creation timestamp.
    async fn save(&self, draft: NewMessage) -> AppResult<Message>;
}
