//! Playlist management and detail projection
//!
//! Membership is an ordered set: adding a video that is already present is
//! a Conflict, removal is idempotent. Mutations are owner-scoped; a
//! playlist that exists but belongs to someone else reads as NotFound.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Playlist, VideoSummary};
use crate::error::{AppError, Result};

/// Playlist with owner identity and fully annotated videos
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistDetail {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub privacy: String,
    pub owner_username: String,
    pub owner_full_name: String,
    pub owner_avatar_url: Option<String>,
    pub videos: Vec<VideoSummary>,
}

#[derive(Clone)]
pub struct PlaylistService {
    pool: PgPool,
}

impl PlaylistService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_playlist(
        &self,
        owner_id: Uuid,
        name: &str,
        description: &str,
        privacy: &str,
    ) -> Result<Playlist> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest(
                "playlist name field is required".to_string(),
            ));
        }

        let privacy = match privacy {
            "public" | "private" | "unlisted" => privacy,
            other => {
                return Err(AppError::BadRequest(format!(
                    "unknown privacy type: {}",
                    other
                )))
            }
        };

        let playlist = sqlx::query_as::<_, Playlist>(
            r#"
            INSERT INTO playlists (name, description, privacy, owner_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, privacy, owner_id, created_at
            "#,
        )
        .bind(name)
        .bind(description.trim())
        .bind(privacy)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(playlist)
    }

    /// All playlists owned by a user; an empty list is a valid result
    pub async fn user_playlists(&self, owner_id: Uuid) -> Result<Vec<Playlist>> {
        let playlists = sqlx::query_as::<_, Playlist>(
            r#"
            SELECT id, name, description, privacy, owner_id, created_at
            FROM playlists
            WHERE owner_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(playlists)
    }

    /// Playlist with owner identity and each video annotated with its own
    /// owner identity and view count, in membership order
    pub async fn playlist_detail(&self, playlist_id: Uuid) -> Result<PlaylistDetail> {
        let header = sqlx::query_as::<_, (Uuid, String, String, String, String, String, Option<String>)>(
            r#"
            SELECT p.id, p.name, p.description, p.privacy,
                   u.username, u.full_name, u.avatar_url
            FROM playlists p
            JOIN users u ON u.id = p.owner_id
            WHERE p.id = $1
            "#,
        )
        .bind(playlist_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("playlist not found".to_string()))?;

        let videos = sqlx::query_as::<_, VideoSummary>(
            r#"
            SELECT v.id, v.owner_id, v.title, v.thumbnail_url, v.duration,
                   (SELECT COUNT(*) FROM views vw WHERE vw.video_id = v.id) AS views,
                   v.created_at,
                   u.username, u.full_name, u.avatar_url
            FROM playlist_videos pv
            JOIN videos v ON v.id = pv.video_id
            JOIN users u ON u.id = v.owner_id
            WHERE pv.playlist_id = $1
            ORDER BY pv.position ASC
            "#,
        )
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(PlaylistDetail {
            id: header.0,
            name: header.1,
            description: header.2,
            privacy: header.3,
            owner_username: header.4,
            owner_full_name: header.5,
            owner_avatar_url: header.6,
            videos,
        })
    }

    async fn owned_playlist_exists(&self, playlist_id: Uuid, owner_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM playlists WHERE id = $1 AND owner_id = $2)",
        )
        .bind(playlist_id)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Append a video; Conflict if it is already a member
    pub async fn add_video(
        &self,
        owner_id: Uuid,
        playlist_id: Uuid,
        video_id: Uuid,
    ) -> Result<()> {
        let video_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM videos WHERE id = $1)")
                .bind(video_id)
                .fetch_one(&self.pool)
                .await?;
        if !video_exists {
            return Err(AppError::NotFound("video not found".to_string()));
        }

        if !self.owned_playlist_exists(playlist_id, owner_id).await? {
            return Err(AppError::NotFound(
                "playlist not found for this user".to_string(),
            ));
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO playlist_videos (playlist_id, video_id, position)
            VALUES (
                $1, $2,
                (SELECT COALESCE(MAX(position) + 1, 0)
                   FROM playlist_videos WHERE playlist_id = $1)
            )
            ON CONFLICT (playlist_id, video_id) DO NOTHING
            "#,
        )
        .bind(playlist_id)
        .bind(video_id)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(AppError::Conflict(
                "this video already exists in the playlist".to_string(),
            ));
        }

        Ok(())
    }

    /// Remove a video from the playlist; absent membership is a no-op
    pub async fn remove_video(
        &self,
        owner_id: Uuid,
        playlist_id: Uuid,
        video_id: Uuid,
    ) -> Result<()> {
        if !self.owned_playlist_exists(playlist_id, owner_id).await? {
            return Err(AppError::NotFound(
                "playlist not found for this user".to_string(),
            ));
        }

        sqlx::query(
            r#"
            DELETE FROM playlist_videos
            WHERE playlist_id = $1 AND video_id = $2
            "#,
        )
        .bind(playlist_id)
        .bind(video_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn update_playlist(
        &self,
        owner_id: Uuid,
        playlist_id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Playlist> {
        let playlist = sqlx::query_as::<_, Playlist>(
            r#"
            UPDATE playlists
            SET name = COALESCE($3, name),
                description = COALESCE($4, description)
            WHERE id = $1 AND owner_id = $2
            RETURNING id, name, description, privacy, owner_id, created_at
            "#,
        )
        .bind(playlist_id)
        .bind(owner_id)
        .bind(name.map(str::trim))
        .bind(description.map(str::trim))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("playlist not found for this user".to_string()))?;

        Ok(playlist)
    }

    pub async fn delete_playlist(&self, owner_id: Uuid, playlist_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM playlists
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(playlist_id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(
                "playlist not found for this user".to_string(),
            ));
        }

        Ok(())
    }
}
