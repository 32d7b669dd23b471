use std::sync::Arc;

use uuid::Uuid;

use campusmentor_common::{AppError, RedisKeys, RedisService};
use campusmentor_database::{ConversationKey, ConversationSummary, Message, NewMessage, Store};

use crate::{
    config::WebSocketConfig,
    connection_manager::ConnectionManager,
    models::{AdminConversationEntry, ConversationEntry},
    pubsub::ChatPubSub,
    AppState,
};

/// Writes are the source of truth; live delivery happens after the insert
/// commits and is best effort.
pub struct MessageService {
    store: Arc<dyn Store>,
    redis_service: Option<RedisService>,
    connection_manager: ConnectionManager,
    pubsub: Option<ChatPubSub>,
    config: WebSocketConfig,
}

impl MessageService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            redis_service: state.redis_service.clone(),
            connection_manager: state.connection_manager.clone(),
            pubsub: state.pubsub.clone(),
            config: state.config.websocket.clone(),
        }
    }

    pub async fn send_message(&self, sender_id: Uuid, receiver_id: Uuid, content: &str) -> Result<Message, AppError> {
        let content = content.trim();
        if content.chars().count() > self.config.max_message_length {
            return Err(AppError::Validation(format!(
                "Message is longer than {} characters",
                self.config.max_message_length
            )));
        }

        let new_message = NewMessage {
            sender_id,
            receiver_id,
            content: content.to_string(),
        };
        new_message.validate()?;

        self.check_rate_limit(sender_id).await?;

        let message = self.store.insert_message(new_message).await?;
        tracing::debug!(message_id = %message.id, sender_id = %sender_id, receiver_id = %receiver_id, "Message stored");

        self.connection_manager.deliver(message.clone());
        if let Some(pubsub) = &self.pubsub {
            if let Err(e) = pubsub.publish(&message).await {
                tracing::warn!(message_id = %message.id, "Failed to fan out message: {}", e);
            }
        }

        Ok(message)
    }

    async fn check_rate_limit(&self, sender_id: Uuid) -> Result<(), AppError> {
        let Some(redis) = &self.redis_service else {
            return Ok(());
        };

        let key = RedisKeys::rate_limit(&sender_id.to_string(), "chat:send");
        let allowed = match redis
            .check_rate_limit(&key, self.config.rate_limit_messages_per_minute, 60)
            .await
        {
            Ok(allowed) => allowed,
            Err(e) => {
                tracing::warn!("Rate limit check failed: {}", e);
                true
            }
        };

        if allowed {
            Ok(())
        } else {
            Err(AppError::RateLimited("Too many messages, slow down".to_string()))
        }
    }

    pub async fn conversation(&self, user_id: Uuid, other_user_id: Uuid) -> Result<Vec<Message>, AppError> {
        self.store.conversation(user_id, other_user_id).await
    }

    pub async fn conversations_for_user(&self, user_id: Uuid) -> Result<Vec<ConversationEntry>, AppError> {
        let summaries = self.store.conversations_for_user(user_id).await?;

        let mut entries = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let other_user_id = ConversationKey::new(summary.participant_a, summary.participant_b).other(user_id);
            entries.push(ConversationEntry {
                other_user_id,
                other_user_name: self.display_name(other_user_id).await?,
                last_message_at: summary.last_message_at,
                message_count: summary.message_count,
            });
        }
        Ok(entries)
    }

    /// Every conversation, most recent activity first.
    pub async fn all_conversations(&self) -> Result<Vec<AdminConversationEntry>, AppError> {
        let summaries = self.store.conversation_summaries().await?;

        let mut entries = Vec::with_capacity(summaries.len());
        for ConversationSummary {
            participant_a,
            participant_b,
            last_message_at,
            message_count,
        } in summaries
        {
            entries.push(AdminConversationEntry {
                participant_a,
                participant_a_name: self.display_name(participant_a).await?,
                participant_b,
                participant_b_name: self.display_name(participant_b).await?,
                last_message_at,
                message_count,
            });
        }
        Ok(entries)
    }

    async fn display_name(&self, user_id: Uuid) -> Result<Option<String>, AppError> {
        Ok(self.store.get_profile(user_id).await?.and_then(|p| p.full_name))
    }
}
