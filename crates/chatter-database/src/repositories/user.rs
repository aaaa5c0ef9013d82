//! User repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use chatter_core::error::{AppError, ErrorKind};
use chatter_core::result::AppResult;
use chatter_entity::user::{CreateUser, UpdateUser, User};

/// Repository for user CRUD, contact, and presence-cache operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a user by primary key.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user by id", e))
    }

    /// Find a user by email (case-insensitive).
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find user by email", e)
            })
    }

    /// List all users except the given one.
    pub async fn find_all_except(&self, user_id: Uuid) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id <> $1 ORDER BY username ASC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list users", e))
    }

    /// Search users by username substring (case-insensitive), excluding the
    /// searching user.
    pub async fn search(&self, query: &str, requester: Uuid) -> AppResult<Vec<User>> {
        let pattern = format!("%{query}%");
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE username ILIKE $1 AND id <> $2 ORDER BY username ASC",
        )
        .bind(&pattern)
        .bind(requester)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to search users", e))
    }

    /// Create a new user.
    pub async fn create(&self, data: &CreateUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email, password_hash, bio, avatar_url) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING *",
        )
        .bind(&data.username)
        .bind(&data.email)
        .bind(&data.password_hash)
        .bind(&data.bio)
        .bind(&data.avatar_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some("users_username_key") =>
            {
                AppError::conflict(format!("Username '{}' already taken", data.username))
            }
            sqlx::Error::Database(ref db_err) if db_err.constraint() == Some("users_email_key") => {
                AppError::conflict("Email already in use".to_string())
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create user", e),
        })
    }

    /// Update a user's profile fields.
    pub async fn update(&self, data: &UpdateUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET email = COALESCE($2, email), \
                              bio = COALESCE($3, bio), \
                              avatar_url = COALESCE($4, avatar_url), \
                              password_hash = COALESCE($5, password_hash), \
                              updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(data.id)
        .bind(&data.email)
        .bind(&data.bio)
        .bind(&data.avatar_url)
        .bind(&data.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update user", e))?
        .ok_or_else(|| AppError::not_found(format!("User {} not found", data.id)))
    }

    /// Set the persisted online flag.
    pub async fn set_online(&self, user_id: Uuid, online: bool) -> AppResult<()> {
        sqlx::query("UPDATE users SET is_online = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(online)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update online flag", e)
            })?;
        Ok(())
    }

    /// Mark a user offline and record when they were last seen.
    pub async fn set_offline(&self, user_id: Uuid, last_seen: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "UPDATE users SET is_online = FALSE, last_seen = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(last_seen)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark user offline", e))?;
        Ok(())
    }

    /// Add a mutual contact link between two users.
    pub async fn add_contact(&self, user_id: Uuid, contact_id: Uuid) -> AppResult<()> {
        if user_id == contact_id {
            return Err(AppError::validation(
                "You cannot add yourself as a contact",
            ));
        }

        let result = sqlx::query(
            "INSERT INTO contacts (user_id, contact_id) \
             VALUES ($1, $2), ($2, $1) \
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(contact_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to add contact", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::conflict("User already in contacts"));
        }
        Ok(())
    }

    /// List a user's contacts.
    pub async fn find_contacts(&self, user_id: Uuid) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, User>(
            "SELECT u.* FROM users u \
             JOIN contacts c ON c.contact_id = u.id \
             WHERE c.user_id = $1 \
             ORDER BY u.username ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list contacts", e))
    }
}
