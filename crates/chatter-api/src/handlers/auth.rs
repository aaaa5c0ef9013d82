//! Auth handlers: register, login, logout, me.

use axum::Json;
use axum::extract::State;
use chrono::Utc;
use validator::Validate;

use chatter_core::error::AppError;
use chatter_entity::user::CreateUser;

use crate::dto::request::{LoginRequest, RegisterRequest};
use crate::dto::response::{ApiResponse, AuthResponse, MessageResponse, UserResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, ApiError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let min_length = state.config.auth.password_min_length;
    if req.password.len() < min_length {
        return Err(AppError::validation(format!(
            "Password must be at least {min_length} characters"
        ))
        .into());
    }

    let password_hash = state.password_hasher.hash_password(&req.password)?;
    let user = state
        .user_repo
        .create(&CreateUser {
            username: req.username,
            email: req.email,
            password_hash,
            bio: req.bio,
            avatar_url: req.avatar_url,
        })
        .await?;

    let (token, expires_at) = state.jwt_encoder.generate_token(user.id, &user.username)?;
    tracing::info!(user_id = %user.id, "user registered");

    Ok(Json(ApiResponse::ok(AuthResponse {
        token,
        expires_at,
        user: user.into(),
    })))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, ApiError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let user = state
        .user_repo
        .find_by_email(&req.email)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid email or password"))?;

    let verified = state
        .password_hasher
        .verify_password(&req.password, &user.password_hash)?;
    if !verified {
        return Err(AppError::unauthorized("Invalid email or password").into());
    }

    let (token, expires_at) = state.jwt_encoder.generate_token(user.id, &user.username)?;
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(ApiResponse::ok(AuthResponse {
        token,
        expires_at,
        user: user.into(),
    })))
}

/// POST /api/auth/logout
///
/// Stateless tokens cannot be revoked; this records the user as offline
/// for clients that consult the persisted flag between connections.
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .user_repo
        .set_offline(auth.user_id, Utc::now())
        .await?;

    Ok(Json(ApiResponse::ok(MessageResponse {
        message: "Logged out successfully".to_string(),
    })))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = state
        .user_repo
        .find_by_id(auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(ApiResponse::ok(user.into())))
}
