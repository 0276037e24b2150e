//! Engagement toggles
//!
//! Flips the existence of a symmetric relation row (like, subscription):
//! exactly one of {created, deleted} happens per call, decided at a single
//! point. Concurrent identical toggles from the same actor are best-effort
//! (the unique index nets a tight double-click out to at most one row).

use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::domain::{Like, LikeTarget, Subscription};
use crate::error::{AppError, Result};
use crate::services::events::EventPublisher;

/// Outcome of a toggle call
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum ToggleOutcome<T> {
    Added { record: T },
    Removed,
}

impl<T> ToggleOutcome<T> {
    pub fn was_added(&self) -> bool {
        matches!(self, ToggleOutcome::Added { .. })
    }
}

#[derive(Clone)]
pub struct EngagementService {
    pool: PgPool,
    events: EventPublisher,
}

impl EngagementService {
    pub fn new(pool: PgPool, events: EventPublisher) -> Self {
        Self { pool, events }
    }

    /// Explicit kind -> table mapping for target existence checks
    async fn like_target_exists(&self, kind: LikeTarget, target_id: Uuid) -> Result<bool> {
        let sql = match kind {
            LikeTarget::Video => "SELECT EXISTS(SELECT 1 FROM videos WHERE id = $1)",
            LikeTarget::Post => "SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)",
            LikeTarget::Comment => "SELECT EXISTS(SELECT 1 FROM comments WHERE id = $1)",
        };

        let exists: bool = sqlx::query_scalar(sql)
            .bind(target_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    /// Toggle a like on a video, post or comment
    pub async fn toggle_like(
        &self,
        user_id: Uuid,
        kind: LikeTarget,
        target_id: Uuid,
    ) -> Result<ToggleOutcome<Like>> {
        if !self.like_target_exists(kind, target_id).await? {
            return Err(AppError::NotFound(format!(
                "{} not found for like toggle",
                kind.as_str()
            )));
        }

        let deleted = sqlx::query_scalar::<_, Uuid>(
            r#"
            DELETE FROM likes
            WHERE user_id = $1 AND target_id = $2 AND target_kind = $3
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(target_id)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if deleted.is_some() {
            info!(user = %user_id, target = %target_id, kind = kind.as_str(), "Like removed");
            return Ok(ToggleOutcome::Removed);
        }

        let like = sqlx::query_as::<_, Like>(
            r#"
            INSERT INTO likes (user_id, target_id, target_kind)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, target_id, target_kind, created_at
            "#,
        )
        .bind(user_id)
        .bind(target_id)
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await?;

        info!(user = %user_id, target = %target_id, kind = kind.as_str(), "Like added");
        self.events
            .like_created(user_id, target_id, kind.as_str())
            .await;

        Ok(ToggleOutcome::Added { record: like })
    }

    /// Toggle the caller's subscription to a channel. The channel argument
    /// is validated for existence; subscriber is always the caller.
    pub async fn toggle_subscription(
        &self,
        subscriber_id: Uuid,
        channel_id: Uuid,
    ) -> Result<ToggleOutcome<Subscription>> {
        let channel_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(channel_id)
                .fetch_one(&self.pool)
                .await?;

        if !channel_exists {
            return Err(AppError::NotFound("channel not found".to_string()));
        }

        let deleted = sqlx::query_scalar::<_, Uuid>(
            r#"
            DELETE FROM subscriptions
            WHERE subscriber_id = $1 AND channel_id = $2
            RETURNING id
            "#,
        )
        .bind(subscriber_id)
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?;

        if deleted.is_some() {
            info!(subscriber = %subscriber_id, channel = %channel_id, "Subscription removed");
            return Ok(ToggleOutcome::Removed);
        }

        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (subscriber_id, channel_id)
            VALUES ($1, $2)
            RETURNING id, subscriber_id, channel_id, created_at
            "#,
        )
        .bind(subscriber_id)
        .bind(channel_id)
        .fetch_one(&self.pool)
        .await?;

        info!(subscriber = %subscriber_id, channel = %channel_id, "Subscription added");
        self.events
            .subscription_created(subscriber_id, channel_id)
            .await;

        Ok(ToggleOutcome::Added {
            record: subscription,
        })
    }
}
