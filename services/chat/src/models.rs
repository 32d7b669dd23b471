use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use campusmentor_database::Message;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SendMessageRequest {
    pub receiver_id: Uuid,

    #[validate(length(min = 1))]
    pub content: String,
}

/// One of the caller's conversations, seen from their side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub other_user_id: Uuid,
    pub other_user_name: Option<String>,
    pub last_message_at: DateTime<Utc>,
    pub message_count: i64,
}

/// Admin view of a conversation with both display names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConversationEntry {
    pub participant_a: Uuid,
    pub participant_a_name: Option<String>,
    pub participant_b: Uuid,
    pub participant_b_name: Option<String>,
    pub last_message_at: DateTime<Utc>,
    pub message_count: i64,
}

/// Query of the live socket: the bearer token and the other participant.
#[derive(Debug, Deserialize)]
pub struct WebSocketQuery {
    pub token: String,
    pub with: Uuid,
}

// WebSocket frames

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Send { content: String },
    Ping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// The stored conversation, sent once after connecting.
    History { messages: Vec<Message> },
    Message { message: Message },
    Error { code: String, message: String },
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_tagged_by_type() {
        let frame: ClientFrame = serde_json::from_str(r#"{"type":"send","content":"hi"}"#).unwrap();
        assert!(matches!(frame, ClientFrame::Send { content } if content == "hi"));

        let json = serde_json::to_value(ServerFrame::Pong).unwrap();
        assert_eq!(json["type"], "pong");
    }
}
