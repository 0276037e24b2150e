//! Comment threads with like annotations
//!
//! Listing joins each comment against the likes table (kind = comment) and
//! the commenter's identity. An empty thread is a valid page; a missing
//! video is NotFound.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::Comment;
use crate::error::{AppError, Result};
use crate::pagination::{PageParams, Paginated};
use crate::sorting::{CommentSortField, SortDirection};

/// Comment annotated for a particular viewer
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CommentView {
    pub id: Uuid,
    pub content: String,
    pub video_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub likes: i64,
    pub is_liked: bool,
    pub owner_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Clone)]
pub struct CommentService {
    pool: PgPool,
}

impl CommentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn video_exists(&self, video_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM videos WHERE id = $1)")
            .bind(video_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Paginated comments for a video, viewer-relative
    pub async fn comments_for_video(
        &self,
        video_id: Uuid,
        sort_field: Option<&str>,
        sort_direction: Option<&str>,
        page: Option<i64>,
        limit: Option<i64>,
        viewer_id: Uuid,
    ) -> Result<Paginated<CommentView>> {
        let field = CommentSortField::parse_required(sort_field)?;
        let direction = SortDirection::parse_required(sort_direction)?;
        let params = PageParams::required(page, limit)?;

        if !self.video_exists(video_id).await? {
            return Err(AppError::NotFound("video not found".to_string()));
        }

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE video_id = $1")
            .bind(video_id)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            r#"
            SELECT c.id, c.content, c.video_id, c.created_at,
                   (SELECT COUNT(*) FROM likes l
                     WHERE l.target_id = c.id AND l.target_kind = 'comment') AS likes,
                   EXISTS(
                       SELECT 1 FROM likes l
                       WHERE l.target_id = c.id AND l.target_kind = 'comment'
                         AND l.user_id = $2
                   ) AS is_liked,
                   u.id AS owner_id, u.username, u.full_name, u.avatar_url
            FROM comments c
            JOIN users u ON u.id = c.owner_id
            WHERE c.video_id = $1
            ORDER BY {} {}
            LIMIT $3 OFFSET $4
            "#,
            field.as_sql(),
            direction.as_sql()
        );

        let comments = sqlx::query_as::<_, CommentView>(&sql)
            .bind(video_id)
            .bind(viewer_id)
            .bind(params.limit)
            .bind(params.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Paginated::new(comments, total, params))
    }

    /// Create a comment on a video
    pub async fn add_comment(
        &self,
        video_id: Uuid,
        owner_id: Uuid,
        content: &str,
    ) -> Result<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::BadRequest("content is missing".to_string()));
        }

        if !self.video_exists(video_id).await? {
            return Err(AppError::NotFound("video not found".to_string()));
        }

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (content, video_id, owner_id)
            VALUES ($1, $2, $3)
            RETURNING id, content, video_id, owner_id, created_at
            "#,
        )
        .bind(content)
        .bind(video_id)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment)
    }

    /// Update a comment's content; the comment must belong to the caller
    pub async fn update_comment(
        &self,
        comment_id: Uuid,
        owner_id: Uuid,
        content: &str,
    ) -> Result<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::BadRequest("content is missing".to_string()));
        }

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            UPDATE comments
            SET content = $3
            WHERE id = $1 AND owner_id = $2
            RETURNING id, content, video_id, owner_id, created_at
            "#,
        )
        .bind(comment_id)
        .bind(owner_id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("comment not found for this user".to_string()))?;

        Ok(comment)
    }

    /// Delete a comment; the comment must belong to the caller
    pub async fn delete_comment(&self, comment_id: Uuid, owner_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM comments
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(comment_id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("comment not found for this user".to_string()));
        }

        Ok(())
    }
}
