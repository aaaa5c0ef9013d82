//! Group handlers.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;
use validator::Validate;

use chatter_core::error::AppError;
use chatter_entity::group::{CreateGroup, Group, UpdateGroup};

use crate::dto::request::{CreateGroupRequest, UpdateGroupRequest};
use crate::dto::response::{ApiResponse, MessageResponse, UserResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/groups
pub async fn create_group(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateGroupRequest>,
) -> Result<Json<ApiResponse<Group>>, ApiError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let group = state
        .group_repo
        .create(&CreateGroup {
            name: req.name,
            description: req.description,
            avatar_url: req.avatar_url,
            owner_id: auth.user_id,
            member_ids: req.member_ids,
        })
        .await?;

    tracing::info!(group_id = %group.id, owner_id = %auth.user_id, "group created");
    Ok(Json(ApiResponse::ok(group)))
}

/// GET /api/groups
pub async fn my_groups(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<Group>>>, ApiError> {
    let groups = state.group_repo.find_by_member(auth.user_id).await?;
    Ok(Json(ApiResponse::ok(groups)))
}

/// GET /api/groups/{id}
pub async fn get_group(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Group>>, ApiError> {
    require_member(&state, group_id, auth.user_id).await?;

    let group = state
        .group_repo
        .find_by_id(group_id)
        .await?
        .ok_or_else(|| AppError::not_found("Group not found"))?;
    Ok(Json(ApiResponse::ok(group)))
}

/// PUT /api/groups/{id}
pub async fn update_group(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<Uuid>,
    Json(req): Json<UpdateGroupRequest>,
) -> Result<Json<ApiResponse<Group>>, ApiError> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;
    require_owner(&state, group_id, auth.user_id).await?;

    let group = state
        .group_repo
        .update(&UpdateGroup {
            id: group_id,
            name: req.name,
            description: req.description,
            avatar_url: req.avatar_url,
        })
        .await?;
    Ok(Json(ApiResponse::ok(group)))
}

/// GET /api/groups/{id}/members
pub async fn list_members(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, ApiError> {
    require_member(&state, group_id, auth.user_id).await?;

    let members = state.group_repo.find_members(group_id).await?;
    Ok(Json(ApiResponse::ok(
        members.into_iter().map(UserResponse::from).collect(),
    )))
}

/// POST /api/groups/{id}/members/{user_id}
pub async fn add_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    require_owner(&state, group_id, auth.user_id).await?;

    state
        .user_repo
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    state.group_repo.add_member(group_id, user_id).await?;

    Ok(Json(ApiResponse::ok(MessageResponse {
        message: "Member added".to_string(),
    })))
}

/// DELETE /api/groups/{id}/members/{user_id}
///
/// The owner can remove anyone; members can remove themselves (leave).
pub async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if user_id != auth.user_id {
        require_owner(&state, group_id, auth.user_id).await?;
    }

    let removed = state.group_repo.remove_member(group_id, user_id).await?;
    if !removed {
        return Err(AppError::not_found("User is not a member of this group").into());
    }

    Ok(Json(ApiResponse::ok(MessageResponse {
        message: "Member removed".to_string(),
    })))
}

async fn require_member(state: &AppState, group_id: Uuid, user_id: Uuid) -> Result<(), ApiError> {
    if state.group_repo.is_member(group_id, user_id).await? {
        Ok(())
    } else {
        Err(AppError::forbidden("Not a member of this group").into())
    }
}

async fn require_owner(state: &AppState, group_id: Uuid, user_id: Uuid) -> Result<(), ApiError> {
    let group = state
        .group_repo
        .find_by_id(group_id)
        .await?
        .ok_or_else(|| AppError::not_found("Group not found"))?;
    if group.owner_id == user_id {
        Ok(())
    } else {
        Err(AppError::forbidden("Only the group owner can do this").into())
    }
}
