//! Channel-side viewer-relative projections
//!
//! Joins users against videos and subscriptions to answer "what does this
//! channel look like to this viewer". Counts are scalar subqueries against
//! the relation tables, so a channel with zero videos or subscribers is a
//! valid result, not an error.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Subscription, UserSummary};
use crate::error::{AppError, Result};

/// Channel profile as seen by a particular viewer
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChannelProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub cover_image_url: Option<String>,
    pub total_videos: i64,
    pub subscribers_count: i64,
    pub channel_subscribed_to: i64,
    pub is_subscribed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscribedChannels {
    pub channels: Vec<UserSummary>,
    pub total: i64,
}

/// Admin/analytics view: channel identity plus its raw subscription rows
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSubscribers {
    pub channel_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub cover_image_url: Option<String>,
    pub subscribers_count: i64,
    pub subscribers: Vec<Subscription>,
}

#[derive(Clone)]
pub struct ChannelService {
    pool: PgPool,
}

impl ChannelService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Channel profile by username (matched lowercase), relative to a viewer
    pub async fn channel_profile(
        &self,
        username: &str,
        viewer_id: Uuid,
    ) -> Result<ChannelProfile> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::BadRequest("username is required".to_string()));
        }

        let profile = sqlx::query_as::<_, ChannelProfile>(
            r#"
            SELECT u.id, u.username, u.email, u.full_name, u.avatar_url, u.cover_image_url,
                   (SELECT COUNT(*) FROM videos v WHERE v.owner_id = u.id) AS total_videos,
                   (SELECT COUNT(*) FROM subscriptions s WHERE s.channel_id = u.id) AS subscribers_count,
                   (SELECT COUNT(*) FROM subscriptions s WHERE s.subscriber_id = u.id) AS channel_subscribed_to,
                   EXISTS(
                       SELECT 1 FROM subscriptions s
                       WHERE s.channel_id = u.id AND s.subscriber_id = $2
                   ) AS is_subscribed
            FROM users u
            WHERE u.username = LOWER($1)
            "#,
        )
        .bind(username)
        .bind(viewer_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("channel '{}' does not exist", username)))?;

        Ok(profile)
    }

    /// Every channel the viewer subscribes to, with a total count
    pub async fn subscribed_channels(&self, viewer_id: Uuid) -> Result<SubscribedChannels> {
        let channels = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.username, u.full_name, u.avatar_url
            FROM subscriptions s
            JOIN users u ON u.id = s.channel_id
            WHERE s.subscriber_id = $1
            ORDER BY s.created_at ASC
            "#,
        )
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await?;

        let total = channels.len() as i64;
        Ok(SubscribedChannels { channels, total })
    }

    /// Subscriber roll for a channel owner's analytics page
    pub async fn channel_subscribers(&self, channel_id: Uuid) -> Result<ChannelSubscribers> {
        let channel = sqlx::query_as::<_, (Uuid, String, String, Option<String>, Option<String>)>(
            r#"
            SELECT id, username, full_name, avatar_url, cover_image_url
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("channel not found".to_string()))?;

        let subscribers = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, subscriber_id, channel_id, created_at
            FROM subscriptions
            WHERE channel_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ChannelSubscribers {
            channel_id: channel.0,
            username: channel.1,
            full_name: channel.2,
            avatar_url: channel.3,
            cover_image_url: channel.4,
            subscribers_count: subscribers.len() as i64,
            subscribers,
        })
    }
}
