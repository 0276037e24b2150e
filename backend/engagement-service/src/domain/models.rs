use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Public identity fields embedded in viewer-facing projections
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
}

/// Video entity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Video {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub video_url: String,
    pub thumbnail_url: String,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

/// What a Like points at. The kind tag is an explicit whitelist; target
/// existence is checked against the matching table, never by dynamic
/// collection-name resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeTarget {
    Video,
    Post,
    Comment,
}

impl LikeTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            LikeTarget::Video => "video",
            LikeTarget::Post => "post",
            LikeTarget::Comment => "comment",
        }
    }
}

impl std::str::FromStr for LikeTarget {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "video" => Ok(LikeTarget::Video),
            "post" => Ok(LikeTarget::Post),
            "comment" => Ok(LikeTarget::Comment),
            other => Err(AppError::BadRequest(format!(
                "unknown like target kind: {}",
                other
            ))),
        }
    }
}

/// Like entity - polymorphic over videos, posts and comments
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Like {
    pub id: Uuid,
    pub user_id: Uuid,
    pub target_id: Uuid,
    pub target_kind: String,
    pub created_at: DateTime<Utc>,
}

/// Subscription entity - subscriber follows a channel (both are users)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub subscriber_id: Uuid,
    pub channel_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Comment entity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub video_id: Uuid,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Playlist entity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Playlist {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub privacy: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Chat entity - direct (two members) or group
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Chat {
    pub id: Uuid,
    pub name: Option<String>,
    pub is_group: bool,
    pub admin_id: Option<Uuid>,
    pub latest_message_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Message entity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Per-user playback toggles
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Settings {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub autoplay_on_wifi: bool,
    pub autoplay_on_mobile: bool,
    pub updated_at: DateTime<Utc>,
}

/// Short-form post ("lynk"); a non-null parent makes it a reply
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub media: serde_json::Value,
    pub parent_post_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Video summary annotated with its owner identity and view count, shared by
/// listings, liked-videos, watch history and playlist projections
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VideoSummary {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub thumbnail_url: String,
    pub duration: f64,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub username: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn like_target_round_trips_through_str() {
        for kind in [LikeTarget::Video, LikeTarget::Post, LikeTarget::Comment] {
            assert_eq!(LikeTarget::from_str(kind.as_str()).unwrap(), kind);
        }
        assert!(LikeTarget::from_str("tweetstorm").is_err());
    }

    #[test]
    fn like_target_parse_is_case_insensitive() {
        assert_eq!(LikeTarget::from_str("Video").unwrap(), LikeTarget::Video);
        assert_eq!(LikeTarget::from_str("COMMENT").unwrap(), LikeTarget::Comment);
    }
}
