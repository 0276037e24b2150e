//! Direct and group chats
//!
//! Membership changes on group chats are admin-only. Sending a message
//! updates the chat's latest-message pointer and emits a realtime fact for
//! the websocket gateway; the store remains the source of truth.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::domain::{Chat, Message};
use crate::error::{AppError, Result};
use crate::pagination::{PageParams, Paginated};
use crate::services::events::EventPublisher;

/// Message annotated with sender identity
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MessageView {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub sender_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Clone)]
pub struct ChatService {
    pool: PgPool,
    events: EventPublisher,
}

impl ChatService {
    pub fn new(pool: PgPool, events: EventPublisher) -> Self {
        Self { pool, events }
    }

    async fn user_exists(&self, user_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn get_chat(&self, chat_id: Uuid) -> Result<Chat> {
        sqlx::query_as::<_, Chat>(
            r#"
            SELECT id, name, is_group, admin_id, latest_message_id, created_at
            FROM chats
            WHERE id = $1
            "#,
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("chat not found".to_string()))
    }

    async fn is_member(&self, chat_id: Uuid, user_id: Uuid) -> Result<bool> {
        let member: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM chat_members WHERE chat_id = $1 AND user_id = $2)",
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(member)
    }

    /// Find the existing 1:1 chat between two users, or create it
    pub async fn open_direct_chat(&self, caller_id: Uuid, other_user_id: Uuid) -> Result<Chat> {
        if !self.user_exists(other_user_id).await? {
            return Err(AppError::NotFound("user not found".to_string()));
        }

        let existing = sqlx::query_as::<_, Chat>(
            r#"
            SELECT c.id, c.name, c.is_group, c.admin_id, c.latest_message_id, c.created_at
            FROM chats c
            JOIN chat_members a ON a.chat_id = c.id AND a.user_id = $1
            JOIN chat_members b ON b.chat_id = c.id AND b.user_id = $2
            WHERE c.is_group = FALSE
            LIMIT 1
            "#,
        )
        .bind(caller_id)
        .bind(other_user_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(chat) = existing {
            return Ok(chat);
        }

        let mut tx = self.pool.begin().await?;

        let chat = sqlx::query_as::<_, Chat>(
            r#"
            INSERT INTO chats (is_group)
            VALUES (FALSE)
            RETURNING id, name, is_group, admin_id, latest_message_id, created_at
            "#,
        )
        .fetch_one(&mut *tx)
        .await?;

        for user_id in [caller_id, other_user_id] {
            sqlx::query("INSERT INTO chat_members (chat_id, user_id) VALUES ($1, $2)")
                .bind(chat.id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(chat)
    }

    /// Create a group chat; the caller becomes its admin
    pub async fn create_group(
        &self,
        admin_id: Uuid,
        name: &str,
        member_ids: &[Uuid],
    ) -> Result<Chat> {
        let name = name.trim();
        if name.is_empty() || member_ids.len() < 2 {
            return Err(AppError::BadRequest(
                "group name and at least two members are required".to_string(),
            ));
        }

        let mut unique_members: Vec<Uuid> = member_ids.to_vec();
        unique_members.sort_unstable();
        unique_members.dedup();

        // Check all members up front so a bad id reads as NotFound, not as
        // a foreign-key violation surfacing from the inserts below
        let known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ANY($1)")
            .bind(&unique_members)
            .fetch_one(&self.pool)
            .await?;
        if known as usize != unique_members.len() {
            return Err(AppError::NotFound(
                "one or more members do not exist".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let chat = sqlx::query_as::<_, Chat>(
            r#"
            INSERT INTO chats (name, is_group, admin_id)
            VALUES ($1, TRUE, $2)
            RETURNING id, name, is_group, admin_id, latest_message_id, created_at
            "#,
        )
        .bind(name)
        .bind(admin_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO chat_members (chat_id, user_id) VALUES ($1, $2)")
            .bind(chat.id)
            .bind(admin_id)
            .execute(&mut *tx)
            .await?;

        for member_id in &unique_members {
            sqlx::query(
                r#"
                INSERT INTO chat_members (chat_id, user_id)
                VALUES ($1, $2)
                ON CONFLICT (chat_id, user_id) DO NOTHING
                "#,
            )
            .bind(chat.id)
            .bind(member_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(chat = %chat.id, admin = %admin_id, "Group chat created");
        Ok(chat)
    }

    pub async fn rename_group(&self, chat_id: Uuid, name: &str) -> Result<Chat> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("group name is required".to_string()));
        }

        let chat = self.get_chat(chat_id).await?;
        if !chat.is_group {
            return Err(AppError::BadRequest(
                "only group chats can be renamed".to_string(),
            ));
        }

        let chat = sqlx::query_as::<_, Chat>(
            r#"
            UPDATE chats
            SET name = $2
            WHERE id = $1
            RETURNING id, name, is_group, admin_id, latest_message_id, created_at
            "#,
        )
        .bind(chat_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(chat)
    }

    /// Add a member to a group chat; admin only, idempotent membership
    pub async fn add_member(&self, caller_id: Uuid, chat_id: Uuid, user_id: Uuid) -> Result<()> {
        let chat = self.get_chat(chat_id).await?;

        if !chat.is_group {
            return Err(AppError::BadRequest(
                "users can only be added to group chats".to_string(),
            ));
        }
        if chat.admin_id != Some(caller_id) {
            return Err(AppError::Unauthorized(
                "only the group admin can add new members".to_string(),
            ));
        }
        if !self.user_exists(user_id).await? {
            return Err(AppError::NotFound("user not found".to_string()));
        }

        sqlx::query(
            r#"
            INSERT INTO chat_members (chat_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (chat_id, user_id) DO NOTHING
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove a member from a group chat; admin only
    pub async fn remove_member(&self, caller_id: Uuid, chat_id: Uuid, user_id: Uuid) -> Result<()> {
        let chat = self.get_chat(chat_id).await?;

        if !chat.is_group {
            return Err(AppError::BadRequest(
                "users can only be removed from group chats".to_string(),
            ));
        }
        if chat.admin_id != Some(caller_id) {
            return Err(AppError::Unauthorized(
                "only the group admin can remove members".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM chat_members WHERE chat_id = $1 AND user_id = $2")
            .bind(chat_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::BadRequest(
                "user is not a member of this group".to_string(),
            ));
        }

        Ok(())
    }

    /// Delete a group chat and its messages; admin only
    pub async fn delete_group(&self, caller_id: Uuid, chat_id: Uuid) -> Result<()> {
        let chat = self.get_chat(chat_id).await?;

        if !chat.is_group {
            return Err(AppError::BadRequest("chat is not a group".to_string()));
        }
        if chat.admin_id != Some(caller_id) {
            return Err(AppError::Unauthorized(
                "only the group admin can delete the group".to_string(),
            ));
        }

        sqlx::query("DELETE FROM chats WHERE id = $1")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// All chats the user belongs to, most recently created first
    pub async fn chats_of_user(&self, user_id: Uuid) -> Result<Vec<Chat>> {
        let chats = sqlx::query_as::<_, Chat>(
            r#"
            SELECT c.id, c.name, c.is_group, c.admin_id, c.latest_message_id, c.created_at
            FROM chats c
            JOIN chat_members m ON m.chat_id = c.id
            WHERE m.user_id = $1
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(chats)
    }

    /// Append a message; the sender must be a member of the chat
    pub async fn send_message(
        &self,
        sender_id: Uuid,
        chat_id: Uuid,
        content: &str,
    ) -> Result<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::BadRequest("content is missing".to_string()));
        }

        // NotFound before membership so a bogus chat id never reads as a
        // permissions problem
        self.get_chat(chat_id).await?;

        if !self.is_member(chat_id, sender_id).await? {
            return Err(AppError::Unauthorized(
                "sender is not a member of this chat".to_string(),
            ));
        }

        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (chat_id, sender_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, chat_id, sender_id, content, created_at
            "#,
        )
        .bind(chat_id)
        .bind(sender_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        sqlx::query("UPDATE chats SET latest_message_id = $2 WHERE id = $1")
            .bind(chat_id)
            .bind(message.id)
            .execute(&self.pool)
            .await?;

        self.events
            .message_created(sender_id, chat_id, message.id)
            .await;

        Ok(message)
    }

    /// Chronological page of a chat's messages with sender identity
    pub async fn chat_messages(
        &self,
        chat_id: Uuid,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Paginated<MessageView>> {
        self.get_chat(chat_id).await?;
        let params = PageParams::or_default(page, limit);

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE chat_id = $1")
            .bind(chat_id)
            .fetch_one(&self.pool)
            .await?;

        let messages = sqlx::query_as::<_, MessageView>(
            r#"
            SELECT m.id, m.chat_id, m.content, m.created_at,
                   u.id AS sender_id, u.username, u.full_name, u.avatar_url
            FROM messages m
            JOIN users u ON u.id = m.sender_id
            WHERE m.chat_id = $1
            ORDER BY m.created_at ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(chat_id)
        .bind(params.limit)
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Paginated::new(messages, total, params))
    }
}
