//! User and contact handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use uuid::Uuid;
use validator::Validate;

use chatter_core::error::AppError;
use chatter_entity::user::UpdateUser;

use crate::dto::request::{SearchQuery, UpdateProfileRequest};
use crate::dto::response::{ApiResponse, MessageResponse, UserResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, ApiError> {
    let users = state.user_repo.find_all_except(auth.user_id).await?;
    Ok(Json(ApiResponse::ok(
        users.into_iter().map(UserResponse::from).collect(),
    )))
}

/// GET /api/users/search?q=
pub async fn search_users(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, ApiError> {
    let users = state.user_repo.search(&query.q, auth.user_id).await?;
    Ok(Json(ApiResponse::ok(
        users.into_iter().map(UserResponse::from).collect(),
    )))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = state
        .user_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(ApiResponse::ok(user.into())))
}

/// PUT /api/users/me
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let password_hash = match &req.password {
        Some(password) => Some(state.password_hasher.hash_password(password)?),
        None => None,
    };

    let user = state
        .user_repo
        .update(&UpdateUser {
            id: auth.user_id,
            email: req.email,
            bio: req.bio,
            avatar_url: req.avatar_url,
            password_hash,
        })
        .await?;

    Ok(Json(ApiResponse::ok(user.into())))
}

/// GET /api/users/contacts
pub async fn list_contacts(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, ApiError> {
    let contacts = state.user_repo.find_contacts(auth.user_id).await?;
    Ok(Json(ApiResponse::ok(
        contacts.into_iter().map(UserResponse::from).collect(),
    )))
}

/// POST /api/users/contacts/{id}
///
/// Contact links are mutual: adding someone also adds the caller to their
/// contact list.
pub async fn add_contact(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(contact_id): Path<Uuid>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .user_repo
        .find_by_id(contact_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    state.user_repo.add_contact(auth.user_id, contact_id).await?;

    Ok(Json(ApiResponse::ok(MessageResponse {
        message: "Contact added".to_string(),
    })))
}
