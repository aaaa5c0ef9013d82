//! Group entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A chat group.
///
/// Persisted membership lives in the `group_members` table and is distinct
/// from the transient channel membership a live connection opts into.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Group {
    /// Unique group identifier.
    pub id: Uuid,
    /// Group display name.
    pub name: String,
    /// Group description.
    pub description: Option<String>,
    /// Group picture URL.
    pub avatar_url: Option<String>,
    /// The user who created the group and administers it.
    pub owner_id: Uuid,
    /// When the group was created.
    pub created_at: DateTime<Utc>,
}

/// Data required to create a new group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroup {
    /// Group display name.
    pub name: String,
    /// Group description (optional).
    pub description: Option<String>,
    /// Group picture URL (optional).
    pub avatar_url: Option<String>,
    /// The creating user, who becomes owner and first member.
    pub owner_id: Uuid,
    /// Initial members besides the owner.
    pub member_ids: Vec<Uuid>,
}

/// Data for updating an existing group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateGroup {
    /// The group ID to update.
    pub id: Uuid,
    /// New display name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New picture URL.
    pub avatar_url: Option<String>,
}
