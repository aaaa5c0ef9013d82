//! Application state shared across all handlers.

use std::sync::Arc;

use sqlx::PgPool;

use chatter_auth::jwt::decoder::JwtDecoder;
use chatter_auth::jwt::encoder::JwtEncoder;
use chatter_auth::password::hasher::PasswordHasher;
use chatter_core::config::AppConfig;
use chatter_database::repositories::group::GroupRepository;
use chatter_database::repositories::message::MessageRepository;
use chatter_database::repositories::user::UserRepository;
use chatter_realtime::engine::ChatEngine;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. All fields are
/// `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// PostgreSQL connection pool.
    pub db_pool: PgPool,

    /// JWT token encoder.
    pub jwt_encoder: Arc<JwtEncoder>,
    /// JWT token decoder and validator.
    pub jwt_decoder: Arc<JwtDecoder>,
    /// Password hasher (Argon2).
    pub password_hasher: Arc<PasswordHasher>,

    /// Presence-and-delivery engine.
    pub engine: Arc<ChatEngine>,

    /// User repository.
    pub user_repo: Arc<UserRepository>,
    /// Group repository.
    pub group_repo: Arc<GroupRepository>,
    /// Message repository.
    pub message_repo: Arc<MessageRepository>,
}
