use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use campusmentor_common::{AppError, RedisKeys, RedisService};
use campusmentor_database::Message;

use crate::connection_manager::ConnectionManager;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// What travels over the Redis channel between chat instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubSubMessage {
    pub sender_instance: String,
    pub message: Message,
    pub timestamp: DateTime<Utc>,
}

/// Fans stored messages out to the other chat instances and feeds theirs
/// into the local [`ConnectionManager`].
#[derive(Clone)]
pub struct ChatPubSub {
    redis_service: RedisService,
    connection_manager: ConnectionManager,
    instance_id: String,
}

impl ChatPubSub {
    pub fn new(redis_service: RedisService, connection_manager: ConnectionManager) -> Self {
        Self {
            redis_service,
            connection_manager,
            instance_id: format!("chat-{}", Uuid::new_v4()),
        }
    }

    pub async fn publish(&self, message: &Message) -> Result<(), AppError> {
        let envelope = PubSubMessage {
            sender_instance: self.instance_id.clone(),
            message: message.clone(),
            timestamp: Utc::now(),
        };
        self.redis_service.publish_json(RedisKeys::CHAT_CHANNEL, &envelope).await
    }

    /// Starts the listener task. It resubscribes after connection loss.
    pub fn start(&self) {
        let pubsub = self.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = pubsub.listen().await {
                    tracing::error!("PubSub listener error: {}", e);
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        });
        tracing::info!("Chat PubSub started with instance ID: {}", self.instance_id);
    }

    async fn listen(&self) -> Result<(), AppError> {
        let conn = self.redis_service.client().get_async_connection().await?;
        let mut pubsub = conn.into_pubsub();
        pubsub.subscribe(RedisKeys::CHAT_CHANNEL).await?;

        tracing::info!("Subscribed to PubSub channel {}", RedisKeys::CHAT_CHANNEL);

        let mut stream = pubsub.on_message();
        while let Some(msg) = stream.next().await {
            match msg.get_payload::<String>() {
                Ok(payload) => {
                    handle_payload(&payload, &self.instance_id, &self.connection_manager);
                }
                Err(e) => tracing::warn!("Unreadable PubSub payload: {}", e),
            }
        }

        Err(AppError::Internal("PubSub stream ended".to_string()))
    }
}

/// Delivers a remote instance's message locally. Returns false for
/// unreadable payloads and for this instance's own messages, which were
/// already delivered when they were stored.
fn handle_payload(payload: &str, instance_id: &str, connection_manager: &ConnectionManager) -> bool {
    let envelope: PubSubMessage = match serde_json::from_str(payload) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!("Failed to parse PubSub message: {}", e);
            return false;
        }
    };

    if envelope.sender_instance == instance_id {
        return false;
    }

    connection_manager.deliver(envelope.message);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(sender_instance: &str) -> String {
        serde_json::to_string(&PubSubMessage {
            sender_instance: sender_instance.to_string(),
            message: Message {
                id: Uuid::new_v4(),
                sender_id: Uuid::new_v4(),
                receiver_id: Uuid::new_v4(),
                content: "hi".to_string(),
                created_at: Utc::now(),
            },
            timestamp: Utc::now(),
        })
        .unwrap()
    }

    #[test]
    fn own_messages_are_not_delivered_twice() {
        let manager = ConnectionManager::new(8);
        assert!(!handle_payload(&envelope("chat-local"), "chat-local", &manager));
        assert!(handle_payload(&envelope("chat-remote"), "chat-local", &manager));
        assert!(!handle_payload("not json", "chat-local", &manager));
    }
}
