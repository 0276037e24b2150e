//! Watch-history bookmark list
//!
//! Maintains the viewer's ordered, deduplicated list of watched videos.
//! Independent of the `views` table: removing a bookmark never deletes the
//! view record, and a re-watch never reorders existing entries.

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::VideoSummary;
use crate::error::Result;

#[derive(Clone)]
pub struct WatchHistoryService {
    pool: PgPool,
}

impl WatchHistoryService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Add a video to the viewer's history. Set semantics: a repeat watch
    /// leaves the existing entry (and its position) untouched.
    pub async fn record_watch(&self, viewer_id: Uuid, video_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO watch_history (user_id, video_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, video_id) DO NOTHING
            "#,
        )
        .bind(viewer_id)
        .bind(video_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove a video from the history; absent entries are a successful no-op
    pub async fn remove_from_history(&self, viewer_id: Uuid, video_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM watch_history
            WHERE user_id = $1 AND video_id = $2
            "#,
        )
        .bind(viewer_id)
        .bind(video_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The viewer's history in insertion order, each video carrying its
    /// owner identity and view count
    pub async fn watch_history(&self, viewer_id: Uuid) -> Result<Vec<VideoSummary>> {
        let videos = sqlx::query_as::<_, VideoSummary>(
            r#"
            SELECT v.id, v.owner_id, v.title, v.thumbnail_url, v.duration,
                   (SELECT COUNT(*) FROM views vw WHERE vw.video_id = v.id) AS views,
                   v.created_at,
                   u.username, u.full_name, u.avatar_url
            FROM watch_history wh
            JOIN videos v ON v.id = wh.video_id
            JOIN users u ON u.id = v.owner_id
            WHERE wh.user_id = $1
            ORDER BY wh.added_at ASC
            "#,
        )
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(videos)
    }
}
