//! Message repository implementation.
//!
//! History queries exclude rows the requesting user has hidden and are
//! always ordered by creation time ascending.

use sqlx::PgPool;
use uuid::Uuid;

use chatter_core::error::{AppError, ErrorKind};
use chatter_core::result::AppResult;
use chatter_entity::message::{Message, NewMessage};

/// Per-sender unread message count.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct UnreadCount {
    /// The sending user.
    pub sender_id: Uuid,
    /// Number of unread messages from that sender.
    pub count: i64,
}

/// Repository for message persistence, history, and per-user hiding.
#[derive(Debug, Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    /// Create a new message repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist a draft, letting the database assign id and timestamp.
    pub async fn create(&self, draft: &NewMessage) -> AppResult<Message> {
        sqlx::query_as::<_, Message>(
            "INSERT INTO messages (sender_id, receiver_id, group_id, text) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(draft.sender_id)
        .bind(draft.receiver_id)
        .bind(draft.group_id)
        .bind(&draft.text)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_check_violation() => {
                AppError::validation("Message must have either a receiver or a group")
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to save message", e),
        })
    }

    /// Find a message by primary key.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Message>> {
        sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find message", e))
    }

    /// Direct history between two users, oldest first, excluding messages
    /// the requester has hidden.
    pub async fn direct_history(&self, requester: Uuid, other: Uuid) -> AppResult<Vec<Message>> {
        sqlx::query_as::<_, Message>(
            "SELECT * FROM messages \
             WHERE ((sender_id = $1 AND receiver_id = $2) \
                 OR (sender_id = $2 AND receiver_id = $1)) \
               AND NOT (hidden_for @> ARRAY[$1]::uuid[]) \
             ORDER BY created_at ASC",
        )
        .bind(requester)
        .bind(other)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load direct history", e)
        })
    }

    /// Group history, oldest first, excluding messages the requester has
    /// hidden.
    pub async fn group_history(&self, requester: Uuid, group_id: Uuid) -> AppResult<Vec<Message>> {
        sqlx::query_as::<_, Message>(
            "SELECT * FROM messages \
             WHERE group_id = $2 \
               AND NOT (hidden_for @> ARRAY[$1]::uuid[]) \
             ORDER BY created_at ASC",
        )
        .bind(requester)
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load group history", e))
    }

    /// Mark all unread messages from one sender to the requester as read.
    pub async fn mark_read(&self, requester: Uuid, sender_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE messages SET read = TRUE \
             WHERE sender_id = $2 AND receiver_id = $1 AND NOT read",
        )
        .bind(requester)
        .bind(sender_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark read", e))?;
        Ok(result.rows_affected())
    }

    /// Per-sender unread counts for the requester's direct messages.
    pub async fn unread_counts(&self, requester: Uuid) -> AppResult<Vec<UnreadCount>> {
        sqlx::query_as::<_, UnreadCount>(
            "SELECT sender_id, COUNT(*) AS count FROM messages \
             WHERE receiver_id = $1 AND NOT read \
             GROUP BY sender_id",
        )
        .bind(requester)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count unread", e))
    }

    /// Hide a message from one user's view. Idempotent.
    pub async fn hide_for(&self, message_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE messages SET hidden_for = array_append(hidden_for, $2) \
             WHERE id = $1 AND NOT (hidden_for @> ARRAY[$2]::uuid[])",
        )
        .bind(message_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to hide message", e))?;

        // Zero rows means already hidden or missing; verify existence so a
        // bad id still surfaces as not-found.
        if result.rows_affected() == 0 && self.find_by_id(message_id).await?.is_none() {
            return Err(AppError::not_found(format!(
                "Message {message_id} not found"
            )));
        }
        Ok(())
    }

    /// Delete a message for everyone. Only the original sender may do this.
    pub async fn delete_for_everyone(&self, message_id: Uuid, sender_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1 AND sender_id = $2")
            .bind(message_id)
            .bind(sender_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete message", e)
            })?;

        if result.rows_affected() == 0 {
            return match self.find_by_id(message_id).await? {
                Some(_) => Err(AppError::forbidden(
                    "Only the sender can delete a message for everyone",
                )),
                None => Err(AppError::not_found(format!(
                    "Message {message_id} not found"
                ))),
            };
        }
        Ok(())
    }
}
