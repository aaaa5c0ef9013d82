//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Registration request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Username.
    #[validate(length(min = 3, max = 20, message = "Username must be 3-20 characters"))]
    pub username: String,
    /// Email address.
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    /// Plaintext password; the minimum length is also checked against
    /// configuration at the handler.
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    /// Profile bio.
    pub bio: Option<String>,
    /// Avatar URL.
    pub avatar_url: Option<String>,
}

/// Login request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address.
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    /// Password.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Profile update request; absent fields are left unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    /// New email address.
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    /// New bio.
    pub bio: Option<String>,
    /// New avatar URL.
    pub avatar_url: Option<String>,
    /// New password.
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
}

/// Group creation request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateGroupRequest {
    /// Group name.
    #[validate(length(min = 1, max = 100, message = "Group name is required"))]
    pub name: String,
    /// Group description.
    pub description: Option<String>,
    /// Avatar URL.
    pub avatar_url: Option<String>,
    /// Initial members besides the creator.
    #[serde(default)]
    pub member_ids: Vec<Uuid>,
}

/// Group update request; absent fields are left unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateGroupRequest {
    /// New name.
    #[validate(length(min = 1, max = 100, message = "Group name cannot be empty"))]
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New avatar URL.
    pub avatar_url: Option<String>,
}

/// Query string for user search.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    /// Substring matched against usernames.
    pub q: String,
}
