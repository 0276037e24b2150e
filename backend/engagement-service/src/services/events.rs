//! Realtime event fan-out
//!
//! Publishes relation-created facts (like, subscription, message) over Redis
//! pub/sub for the websocket gateway to forward to connected viewers. The
//! publisher is optional: without REDIS_URL every publish is a no-op, and a
//! publish failure is logged but never surfaced into the calling operation.

use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Envelope for every published fact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementEvent {
    pub event_type: String,
    pub actor_id: Uuid,
    pub target_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl EngagementEvent {
    pub fn new(event_type: &str, actor_id: Uuid, target_id: Uuid) -> Self {
        Self {
            event_type: event_type.to_string(),
            actor_id,
            target_id,
            occurred_at: Utc::now(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

fn channel_for(event_type: &str, target_id: Uuid) -> String {
    format!("engagement:{}:{}", event_type, target_id)
}

/// Redis-backed publisher for engagement events
#[derive(Clone)]
pub struct EventPublisher {
    client: Option<redis::Client>,
}

impl EventPublisher {
    /// Create a publisher; an unset or empty URL disables publishing
    pub fn new(redis_url: Option<&str>) -> Self {
        let client = match redis_url {
            Some(url) => match redis::Client::open(url) {
                Ok(client) => {
                    info!("Event publisher enabled");
                    Some(client)
                }
                Err(e) => {
                    warn!(error = %e, "Invalid Redis URL; event publishing disabled");
                    None
                }
            },
            None => {
                info!("REDIS_URL not set; event publishing disabled");
                None
            }
        };
        Self { client }
    }

    /// Publisher that drops every event (tests, offline tooling)
    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Publish a fact; failures are logged, never propagated
    pub async fn publish(&self, event: EngagementEvent) {
        let Some(client) = &self.client else {
            return;
        };

        let channel = channel_for(&event.event_type, event.target_id);
        let payload = match serde_json::to_string(&event) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Failed to serialize engagement event");
                return;
            }
        };

        // Pub/sub delivery is fire-and-forget; the store is the source of truth
        let result: redis::RedisResult<()> = async {
            let mut conn = client.get_multiplexed_async_connection().await?;
            conn.publish::<_, _, ()>(&channel, &payload).await
        }
        .await;

        if let Err(e) = result {
            warn!(channel = %channel, error = %e, "Failed to publish engagement event");
        }
    }

    pub async fn like_created(&self, actor_id: Uuid, target_id: Uuid, target_kind: &str) {
        self.publish(
            EngagementEvent::new("like.created", actor_id, target_id)
                .with_data(serde_json::json!({ "target_kind": target_kind })),
        )
        .await;
    }

    pub async fn subscription_created(&self, subscriber_id: Uuid, channel_id: Uuid) {
        self.publish(EngagementEvent::new(
            "subscription.created",
            subscriber_id,
            channel_id,
        ))
        .await;
    }

    pub async fn message_created(&self, sender_id: Uuid, chat_id: Uuid, message_id: Uuid) {
        self.publish(
            EngagementEvent::new("message.created", sender_id, chat_id)
                .with_data(serde_json::json!({ "message_id": message_id })),
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_names_are_namespaced() {
        let id = Uuid::nil();
        assert_eq!(
            channel_for("like.created", id),
            format!("engagement:like.created:{}", id)
        );
    }

    #[test]
    fn event_serializes_without_empty_data() {
        let event = EngagementEvent::new("subscription.created", Uuid::nil(), Uuid::nil());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "subscription.created");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn publisher_follows_configured_url() {
        // Client::open validates the URL without connecting
        assert!(EventPublisher::new(Some("redis://127.0.0.1:6379")).is_enabled());
        assert!(!EventPublisher::new(None).is_enabled());
        assert!(!EventPublisher::new(Some("not a url")).is_enabled());
    }

    #[tokio::test]
    async fn disabled_publisher_drops_events() {
        let publisher = EventPublisher::disabled();
        assert!(!publisher.is_enabled());
        // Must not panic or block
        publisher
            .like_created(Uuid::new_v4(), Uuid::new_v4(), "video")
            .await;
    }
}
