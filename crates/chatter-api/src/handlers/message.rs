//! Message history and read-state handlers.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use chatter_core::error::AppError;
use chatter_database::repositories::message::UnreadCount;
use chatter_entity::message::Message;

use crate::dto::response::{ApiResponse, MessageResponse, UpdatedCountResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/messages/direct/{user_id}
///
/// Conversation with another user, creation time ascending, excluding
/// messages the caller has hidden.
pub async fn direct_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(other_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Message>>>, ApiError> {
    let messages = state
        .message_repo
        .direct_history(auth.user_id, other_id)
        .await?;
    Ok(Json(ApiResponse::ok(messages)))
}

/// GET /api/messages/group/{group_id}
pub async fn group_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Message>>>, ApiError> {
    if !state.group_repo.is_member(group_id, auth.user_id).await? {
        return Err(AppError::forbidden("Not a member of this group").into());
    }

    let messages = state
        .message_repo
        .group_history(auth.user_id, group_id)
        .await?;
    Ok(Json(ApiResponse::ok(messages)))
}

/// PUT /api/messages/read/{sender_id}
///
/// Marks every unread direct message from the sender as read.
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(sender_id): Path<Uuid>,
) -> Result<Json<ApiResponse<UpdatedCountResponse>>, ApiError> {
    let updated = state.message_repo.mark_read(auth.user_id, sender_id).await?;
    Ok(Json(ApiResponse::ok(UpdatedCountResponse { updated })))
}

/// GET /api/messages/unread
pub async fn unread_counts(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<UnreadCount>>>, ApiError> {
    let counts = state.message_repo.unread_counts(auth.user_id).await?;
    Ok(Json(ApiResponse::ok(counts)))
}

/// PUT /api/messages/{id}/hide
///
/// Hides the message from the caller's own history only.
pub async fn hide_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(message_id): Path<Uuid>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.message_repo.hide_for(message_id, auth.user_id).await?;
    Ok(Json(ApiResponse::ok(MessageResponse {
        message: "Message hidden".to_string(),
    })))
}

/// DELETE /api/messages/{id}
///
/// Deletes the message for everyone; only the original sender may do this.
pub async fn delete_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(message_id): Path<Uuid>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .message_repo
        .delete_for_everyone(message_id, auth.user_id)
        .await?;
    Ok(Json(ApiResponse::ok(MessageResponse {
        message: "Message deleted".to_string(),
    })))
}
