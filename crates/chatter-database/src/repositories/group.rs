//! Group repository implementation.

use sqlx::PgPool;
use uuid::Uuid;

use chatter_core::error::{AppError, ErrorKind};
use chatter_core::result::AppResult;
use chatter_entity::group::{CreateGroup, Group, UpdateGroup};
use chatter_entity::user::User;

/// Repository for group CRUD and membership operations.
#[derive(Debug, Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    /// Create a new group repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a group by primary key.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Group>> {
        sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find group", e))
    }

    /// List all groups a user belongs to.
    pub async fn find_by_member(&self, user_id: Uuid) -> AppResult<Vec<Group>> {
        sqlx::query_as::<_, Group>(
            "SELECT g.* FROM groups g \
             JOIN group_members m ON m.group_id = g.id \
             WHERE m.user_id = $1 \
             ORDER BY g.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list groups", e))
    }

    /// Create a group; the owner and all listed members are enrolled.
    pub async fn create(&self, data: &CreateGroup) -> AppResult<Group> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let group = sqlx::query_as::<_, Group>(
            "INSERT INTO groups (name, description, avatar_url, owner_id) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.avatar_url)
        .bind(data.owner_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create group", e))?;

        let mut members = data.member_ids.clone();
        members.push(data.owner_id);
        members.sort_unstable();
        members.dedup();

        for member in &members {
            sqlx::query(
                "INSERT INTO group_members (group_id, user_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(group.id)
            .bind(member)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to enroll group member", e)
            })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit group creation", e)
        })?;

        Ok(group)
    }

    /// Update a group's profile fields.
    pub async fn update(&self, data: &UpdateGroup) -> AppResult<Group> {
        sqlx::query_as::<_, Group>(
            "UPDATE groups SET name = COALESCE($2, name), \
                               description = COALESCE($3, description), \
                               avatar_url = COALESCE($4, avatar_url) \
             WHERE id = $1 RETURNING *",
        )
        .bind(data.id)
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.avatar_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update group", e))?
        .ok_or_else(|| AppError::not_found(format!("Group {} not found", data.id)))
    }

    /// Whether a user is a persisted member of a group.
    pub async fn is_member(&self, group_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM group_members WHERE group_id = $1 AND user_id = $2",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to check membership", e))?;
        Ok(count > 0)
    }

    /// List a group's members.
    pub async fn find_members(&self, group_id: Uuid) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, User>(
            "SELECT u.* FROM users u \
             JOIN group_members m ON m.user_id = u.id \
             WHERE m.group_id = $1 \
             ORDER BY u.username ASC",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list members", e))
    }

    /// Add a member to a group.
    pub async fn add_member(&self, group_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "INSERT INTO group_members (group_id, user_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(group_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to add member", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::conflict("User is already a member"));
        }
        Ok(())
    }

    /// Remove a member from a group.
    pub async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM group_members WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to remove member", e)
            })?;
        Ok(result.rows_affected() > 0)
    }
}
