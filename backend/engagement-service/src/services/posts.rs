//! Short-form posts ("lynks")
//!
//! Post likes use the shared likes table (target_kind = 'post'), the same
//! representation as videos and comments, instead of an embedded like list.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::Post;
use crate::error::{AppError, Result};
use crate::pagination::{PageParams, Paginated};

/// Post annotated with counts and author identity
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PostView {
    pub id: Uuid,
    pub content: String,
    pub media: serde_json::Value,
    pub parent_post_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub likes: i64,
    pub replies: i64,
    pub author_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Clone)]
pub struct PostService {
    pool: PgPool,
}

impl PostService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a post; a non-null parent makes it a reply
    pub async fn create_post(
        &self,
        author_id: Uuid,
        content: &str,
        media: Vec<String>,
        parent_post_id: Option<Uuid>,
    ) -> Result<Post> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::BadRequest("content is missing".to_string()));
        }

        if let Some(parent_id) = parent_post_id {
            let parent_exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
                    .bind(parent_id)
                    .fetch_one(&self.pool)
                    .await?;
            if !parent_exists {
                return Err(AppError::NotFound("parent post not found".to_string()));
            }
        }

        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (author_id, content, media, parent_post_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, author_id, content, media, parent_post_id, created_at
            "#,
        )
        .bind(author_id)
        .bind(content)
        .bind(serde_json::json!(media))
        .bind(parent_post_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(post)
    }

    /// Single post with counts and author identity
    pub async fn post_by_id(&self, post_id: Uuid) -> Result<PostView> {
        sqlx::query_as::<_, PostView>(
            r#"
            SELECT p.id, p.content, p.media, p.parent_post_id, p.created_at,
                   (SELECT COUNT(*) FROM likes l
                     WHERE l.target_id = p.id AND l.target_kind = 'post') AS likes,
                   (SELECT COUNT(*) FROM posts r WHERE r.parent_post_id = p.id) AS replies,
                   u.id AS author_id, u.username, u.full_name, u.avatar_url
            FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.id = $1
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("post not found".to_string()))
    }

    /// Global feed of top-level posts, newest first
    pub async fn feed(&self, page: Option<i64>, limit: Option<i64>) -> Result<Paginated<PostView>> {
        let params = PageParams::or_default(page, limit);

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE parent_post_id IS NULL")
                .fetch_one(&self.pool)
                .await?;

        let posts = sqlx::query_as::<_, PostView>(
            r#"
            SELECT p.id, p.content, p.media, p.parent_post_id, p.created_at,
                   (SELECT COUNT(*) FROM likes l
                     WHERE l.target_id = p.id AND l.target_kind = 'post') AS likes,
                   (SELECT COUNT(*) FROM posts r WHERE r.parent_post_id = p.id) AS replies,
                   u.id AS author_id, u.username, u.full_name, u.avatar_url
            FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.parent_post_id IS NULL
            ORDER BY p.created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(params.limit)
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Paginated::new(posts, total, params))
    }

    /// All top-level posts of a user, newest first, with like/reply counts
    pub async fn posts_of_user(&self, author_id: Uuid) -> Result<Vec<PostView>> {
        let posts = sqlx::query_as::<_, PostView>(
            r#"
            SELECT p.id, p.content, p.media, p.parent_post_id, p.created_at,
                   (SELECT COUNT(*) FROM likes l
                     WHERE l.target_id = p.id AND l.target_kind = 'post') AS likes,
                   (SELECT COUNT(*) FROM posts r WHERE r.parent_post_id = p.id) AS replies,
                   u.id AS author_id, u.username, u.full_name, u.avatar_url
            FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.author_id = $1 AND p.parent_post_id IS NULL
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    /// Replies to a post, oldest first
    pub async fn replies(&self, post_id: Uuid) -> Result<Vec<PostView>> {
        let post_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
                .bind(post_id)
                .fetch_one(&self.pool)
                .await?;
        if !post_exists {
            return Err(AppError::NotFound("post not found".to_string()));
        }

        let replies = sqlx::query_as::<_, PostView>(
            r#"
            SELECT p.id, p.content, p.media, p.parent_post_id, p.created_at,
                   (SELECT COUNT(*) FROM likes l
                     WHERE l.target_id = p.id AND l.target_kind = 'post') AS likes,
                   (SELECT COUNT(*) FROM posts r WHERE r.parent_post_id = p.id) AS replies,
                   u.id AS author_id, u.username, u.full_name, u.avatar_url
            FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.parent_post_id = $1
            ORDER BY p.created_at ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(replies)
    }

    /// Rewrite a post's content; must belong to the caller
    pub async fn update_post(&self, author_id: Uuid, post_id: Uuid, content: &str) -> Result<Post> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::BadRequest("content is missing".to_string()));
        }

        sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
            SET content = $3
            WHERE id = $1 AND author_id = $2
            RETURNING id, author_id, content, media, parent_post_id, created_at
            "#,
        )
        .bind(post_id)
        .bind(author_id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("post not found for this user".to_string()))
    }

    /// Delete a post; must belong to the caller
    pub async fn delete_post(&self, author_id: Uuid, post_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND author_id = $2")
            .bind(post_id)
            .bind(author_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("post not found for this user".to_string()));
        }

        Ok(())
    }
}
