//! Video projections and lifecycle
//!
//! The detail view is viewer-relative: it counts views and likes, answers
//! isLiked/isSubscribed for the asking user, and as a side effect records
//! the watch (one view row per viewer, watch-history bookmark always).
//! Deletion cascades to likes, views and comments in one transaction;
//! media cleanup happens outside it, best-effort.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{Video, VideoSummary};
use crate::error::{AppError, Result};
use crate::pagination::{PageParams, Paginated};
use crate::services::watch_history::WatchHistoryService;
use crate::sorting::{SortDirection, VideoSortField};
use crate::storage::MediaStorage;

/// Owner sub-projection inside the detail view
#[derive(Debug, Clone, Serialize)]
pub struct VideoOwner {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub subscribers_count: i64,
    pub is_subscribed: bool,
}

/// Full viewer-relative video projection
#[derive(Debug, Clone, Serialize)]
pub struct VideoDetail {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub thumbnail_url: String,
    pub duration: f64,
    pub created_at: DateTime<Utc>,
    pub views: i64,
    pub likes: i64,
    pub is_liked: bool,
    pub owner: VideoOwner,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct VideoDetailRow {
    id: Uuid,
    title: String,
    description: String,
    video_url: String,
    thumbnail_url: String,
    duration: f64,
    created_at: DateTime<Utc>,
    views: i64,
    likes: i64,
    is_liked: bool,
    owner_id: Uuid,
    owner_username: String,
    owner_full_name: String,
    owner_avatar_url: Option<String>,
    owner_subscribers_count: i64,
    owner_is_subscribed: bool,
}

impl From<VideoDetailRow> for VideoDetail {
    fn from(row: VideoDetailRow) -> Self {
        VideoDetail {
            id: row.id,
            title: row.title,
            description: row.description,
            video_url: row.video_url,
            thumbnail_url: row.thumbnail_url,
            duration: row.duration,
            created_at: row.created_at,
            views: row.views,
            likes: row.likes,
            is_liked: row.is_liked,
            owner: VideoOwner {
                id: row.owner_id,
                username: row.owner_username,
                full_name: row.owner_full_name,
                avatar_url: row.owner_avatar_url,
                subscribers_count: row.owner_subscribers_count,
                is_subscribed: row.owner_is_subscribed,
            },
        }
    }
}

/// Metadata recorded once media and thumbnail are both persisted upstream
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub video_url: String,
    pub thumbnail_url: String,
    pub title: String,
    pub description: String,
    pub duration: f64,
}

#[derive(Debug, Clone, Default)]
pub struct VideoUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LikedVideos {
    pub videos: Vec<VideoSummary>,
    pub total: i64,
}

fn validate_metadata(title: &str, description: &str) -> Result<()> {
    let title = title.trim();
    let description = description.trim();

    if title.len() < 3 || title.len() > 100 {
        return Err(AppError::BadRequest(
            "title must be between 3 and 100 characters".to_string(),
        ));
    }
    if description.len() < 10 || description.len() > 500 {
        return Err(AppError::BadRequest(
            "description must be between 10 and 500 characters".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct VideoService {
    pool: PgPool,
    storage: Arc<dyn MediaStorage>,
    watch_history: WatchHistoryService,
}

impl VideoService {
    pub fn new(pool: PgPool, storage: Arc<dyn MediaStorage>) -> Self {
        let watch_history = WatchHistoryService::new(pool.clone());
        Self {
            pool,
            storage,
            watch_history,
        }
    }

    /// Record a view for (video, viewer) unless one exists. Uniqueness is
    /// app-level by design: query first, insert only when absent.
    async fn record_view(&self, video_id: Uuid, viewer_id: Uuid) -> Result<()> {
        let already_viewed: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM views
                WHERE video_id = $1 AND viewer_id = $2
            )
            "#,
        )
        .bind(video_id)
        .bind(viewer_id)
        .fetch_one(&self.pool)
        .await?;

        if !already_viewed {
            sqlx::query(
                r#"
                INSERT INTO views (video_id, viewer_id)
                VALUES ($1, $2)
                "#,
            )
            .bind(video_id)
            .bind(viewer_id)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    /// Viewer-relative detail view. Side effects first: view upsert and
    /// watch-history membership.
    pub async fn video_detail(&self, video_id: Uuid, viewer_id: Uuid) -> Result<VideoDetail> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM videos WHERE id = $1)")
            .bind(video_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(AppError::NotFound("video not found".to_string()));
        }

        self.record_view(video_id, viewer_id).await?;
        self.watch_history.record_watch(viewer_id, video_id).await?;

        let row = sqlx::query_as::<_, VideoDetailRow>(
            r#"
            SELECT v.id, v.title, v.description, v.video_url, v.thumbnail_url,
                   v.duration, v.created_at,
                   (SELECT COUNT(*) FROM views vw WHERE vw.video_id = v.id) AS views,
                   (SELECT COUNT(*) FROM likes l
                     WHERE l.target_id = v.id AND l.target_kind = 'video') AS likes,
                   EXISTS(
                       SELECT 1 FROM likes l
                       WHERE l.target_id = v.id AND l.target_kind = 'video'
                         AND l.user_id = $2
                   ) AS is_liked,
                   u.id AS owner_id,
                   u.username AS owner_username,
                   u.full_name AS owner_full_name,
                   u.avatar_url AS owner_avatar_url,
                   (SELECT COUNT(*) FROM subscriptions s
                     WHERE s.channel_id = u.id) AS owner_subscribers_count,
                   EXISTS(
                       SELECT 1 FROM subscriptions s
                       WHERE s.channel_id = u.id AND s.subscriber_id = $2
                   ) AS owner_is_subscribed
            FROM videos v
            JOIN users u ON u.id = v.owner_id
            WHERE v.id = $1
            "#,
        )
        .bind(video_id)
        .bind(viewer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    /// Paginated listing across all videos. Sort field and direction are
    /// required; both come from typed whitelists.
    pub async fn list_videos(
        &self,
        sort_field: Option<&str>,
        sort_direction: Option<&str>,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Paginated<VideoSummary>> {
        let field = VideoSortField::parse_required(sort_field)?;
        let direction = SortDirection::parse_required(sort_direction)?;
        let params = PageParams::or_default(page, limit);

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM videos")
            .fetch_one(&self.pool)
            .await?;

        // Sort identifiers are fixed strings from the whitelist, never
        // caller input.
        let sql = format!(
            r#"
            SELECT v.id, v.owner_id, v.title, v.thumbnail_url, v.duration,
                   (SELECT COUNT(*) FROM views vw WHERE vw.video_id = v.id) AS views,
                   v.created_at,
                   u.username, u.full_name, u.avatar_url
            FROM videos v
            JOIN users u ON u.id = v.owner_id
            ORDER BY {} {}
            LIMIT $1 OFFSET $2
            "#,
            field.as_sql(),
            direction.as_sql()
        );

        let videos = sqlx::query_as::<_, VideoSummary>(&sql)
            .bind(params.limit)
            .bind(params.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Paginated::new(videos, total, params))
    }

    /// Every video a channel (by username) owns, with view counts
    pub async fn videos_of_channel(&self, username: &str) -> Result<Vec<VideoSummary>> {
        let owner_id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM users WHERE username = LOWER($1)")
                .bind(username.trim())
                .fetch_optional(&self.pool)
                .await?;

        let owner_id = owner_id
            .ok_or_else(|| AppError::NotFound(format!("channel '{}' does not exist", username)))?;

        let videos = sqlx::query_as::<_, VideoSummary>(
            r#"
            SELECT v.id, v.owner_id, v.title, v.thumbnail_url, v.duration,
                   (SELECT COUNT(*) FROM views vw WHERE vw.video_id = v.id) AS views,
                   v.created_at,
                   u.username, u.full_name, u.avatar_url
            FROM videos v
            JOIN users u ON u.id = v.owner_id
            WHERE v.owner_id = $1
            ORDER BY v.created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(videos)
    }

    /// All videos the viewer has liked, with a total count
    pub async fn liked_videos(&self, viewer_id: Uuid) -> Result<LikedVideos> {
        let videos = sqlx::query_as::<_, VideoSummary>(
            r#"
            SELECT v.id, v.owner_id, v.title, v.thumbnail_url, v.duration,
                   (SELECT COUNT(*) FROM views vw WHERE vw.video_id = v.id) AS views,
                   v.created_at,
                   u.username, u.full_name, u.avatar_url
            FROM likes l
            JOIN videos v ON v.id = l.target_id
            JOIN users u ON u.id = v.owner_id
            WHERE l.user_id = $1 AND l.target_kind = 'video'
            ORDER BY l.created_at DESC
            "#,
        )
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await?;

        let total = videos.len() as i64;
        Ok(LikedVideos { videos, total })
    }

    /// Record video metadata after the upload pipeline persisted both files
    pub async fn create_video(&self, owner_id: Uuid, new_video: NewVideo) -> Result<Video> {
        validate_metadata(&new_video.title, &new_video.description)?;

        if new_video.video_url.is_empty() || new_video.thumbnail_url.is_empty() {
            return Err(AppError::BadRequest(
                "both video and thumbnail are required".to_string(),
            ));
        }

        let video = sqlx::query_as::<_, Video>(
            r#"
            INSERT INTO videos (owner_id, video_url, thumbnail_url, title, description, duration)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, owner_id, video_url, thumbnail_url, title, description,
                      duration, is_published, created_at
            "#,
        )
        .bind(owner_id)
        .bind(&new_video.video_url)
        .bind(&new_video.thumbnail_url)
        .bind(new_video.title.trim())
        .bind(new_video.description.trim())
        .bind(new_video.duration)
        .fetch_one(&self.pool)
        .await?;

        info!(video = %video.id, owner = %owner_id, "Video created");
        Ok(video)
    }

    /// Update title/description/thumbnail; the video must belong to the caller
    pub async fn update_video(
        &self,
        owner_id: Uuid,
        video_id: Uuid,
        update: VideoUpdate,
    ) -> Result<Video> {
        if update.title.is_none() && update.description.is_none() && update.thumbnail_url.is_none()
        {
            return Err(AppError::BadRequest(
                "title, description or thumbnail is required".to_string(),
            ));
        }

        let video = sqlx::query_as::<_, Video>(
            r#"
            UPDATE videos
            SET title = COALESCE($3, title),
                description = COALESCE($4, description),
                thumbnail_url = COALESCE($5, thumbnail_url)
            WHERE id = $1 AND owner_id = $2
            RETURNING id, owner_id, video_url, thumbnail_url, title, description,
                      duration, is_published, created_at
            "#,
        )
        .bind(video_id)
        .bind(owner_id)
        .bind(update.title.as_deref().map(str::trim))
        .bind(update.description.as_deref().map(str::trim))
        .bind(update.thumbnail_url.as_deref())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("video not found for this id or user".to_string()))?;

        Ok(video)
    }

    /// Flip the publish flag; the video must belong to the caller
    pub async fn toggle_publish(&self, owner_id: Uuid, video_id: Uuid) -> Result<bool> {
        let is_published: Option<bool> = sqlx::query_scalar(
            r#"
            UPDATE videos
            SET is_published = NOT is_published
            WHERE id = $1 AND owner_id = $2
            RETURNING is_published
            "#,
        )
        .bind(video_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        is_published.ok_or_else(|| AppError::NotFound("video not found on this id".to_string()))
    }

    /// Delete a video with its likes, views and comments in one transaction.
    /// Playlist memberships and watch-history rows go with it via their
    /// ON DELETE CASCADE foreign keys. Media is dropped from object storage
    /// afterwards, best-effort, never rolled back.
    pub async fn delete_video(&self, owner_id: Uuid, video_id: Uuid) -> Result<()> {
        let video = sqlx::query_as::<_, Video>(
            r#"
            SELECT id, owner_id, video_url, thumbnail_url, title, description,
                   duration, is_published, created_at
            FROM videos
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(video_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("video not found in this id".to_string()))?;

        let mut tx = self.pool.begin().await?;

        let cascade = async {
            sqlx::query("DELETE FROM likes WHERE target_id = $1 AND target_kind = 'video'")
                .bind(video_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM views WHERE video_id = $1")
                .bind(video_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM comments WHERE video_id = $1")
                .bind(video_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM videos WHERE id = $1")
                .bind(video_id)
                .execute(&mut *tx)
                .await?;
            Ok::<(), sqlx::Error>(())
        }
        .await;

        match cascade {
            Ok(()) => {
                tx.commit().await?;
            }
            Err(e) => {
                // Explicit for clarity; dropping the tx would roll back too
                tx.rollback().await.ok();
                return Err(AppError::Internal(format!(
                    "failed to delete video and related data: {}",
                    e
                )));
            }
        }

        // Media is addressed by URL, not referential integrity; a failed
        // storage delete leaves the record deletion in place.
        for url in [&video.video_url, &video.thumbnail_url] {
            if let Err(e) = self.storage.delete(url).await {
                warn!(video = %video_id, url = %url, error = %e, "Media deletion failed");
            }
        }

        info!(video = %video_id, owner = %owner_id, "Video deleted with cascades");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_bounds_are_enforced() {
        assert!(validate_metadata("ab", "a description long enough").is_err());
        assert!(validate_metadata("a valid title", "too short").is_err());
        assert!(validate_metadata("a valid title", "a description long enough").is_ok());

        let long_title = "t".repeat(101);
        assert!(validate_metadata(&long_title, "a description long enough").is_err());

        let long_description = "d".repeat(501);
        assert!(validate_metadata("a valid title", &long_description).is_err());
    }
}
