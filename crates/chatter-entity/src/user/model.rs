//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A registered user in the Chatter system.
///
/// The `is_online`/`last_seen` pair is a persisted cache of the in-memory
/// presence table: routing decisions never consult it, only history and
/// contact-list display do.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Unique login name.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Short profile text.
    pub bio: Option<String>,
    /// Profile picture URL (opaque string, upload handling is external).
    pub avatar_url: Option<String>,
    /// Whether a live connection is currently registered for this user.
    pub is_online: bool,
    /// Last time the user disconnected or logged out.
    pub last_seen: DateTime<Utc>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Data required to create a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Desired username.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Pre-hashed password.
    pub password_hash: String,
    /// Short profile text (optional).
    pub bio: Option<String>,
    /// Profile picture URL (optional).
    pub avatar_url: Option<String>,
}

/// Data for updating an existing user's profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUser {
    /// The user ID to update.
    pub id: Uuid,
    /// New email address.
    pub email: Option<String>,
    /// New bio text.
    pub bio: Option<String>,
    /// New profile picture URL.
    pub avatar_url: Option<String>,
    /// New pre-hashed password.
    pub password_hash: Option<String>,
}
