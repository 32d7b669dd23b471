use campusmentor_common::{env_parse, DatabaseConfig, JwtConfig, RedisConfig, ServerConfig, StorageBackend};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub storage: StorageBackend,
    pub websocket: WebSocketConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketConfig {
    pub max_connections_per_user: usize,
    pub heartbeat_interval_seconds: u64,
    /// Characters, counted after trimming.
    pub max_message_length: usize,
    pub rate_limit_messages_per_minute: u32,
    /// Messages buffered per live subscriber before it starts lagging.
    pub broadcast_capacity: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_connections_per_user: 5,
            heartbeat_interval_seconds: 30,
            max_message_length: 2000,
            rate_limit_messages_per_minute: 30,
            broadcast_capacity: 1024,
        }
    }
}

impl WebSocketConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_connections_per_user: env_parse("CHAT_MAX_CONNECTIONS_PER_USER", defaults.max_connections_per_user),
            heartbeat_interval_seconds: env_parse("CHAT_HEARTBEAT_SECONDS", defaults.heartbeat_interval_seconds),
            max_message_length: env_parse("CHAT_MAX_MESSAGE_LENGTH", defaults.max_message_length),
            rate_limit_messages_per_minute: env_parse("CHAT_RATE_LIMIT_PER_MINUTE", defaults.rate_limit_messages_per_minute),
            broadcast_capacity: env_parse("CHAT_BROADCAST_CAPACITY", defaults.broadcast_capacity),
        }
    }
}

impl ChatConfig {
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(8002),
            database: DatabaseConfig::from_env(),
            redis: RedisConfig::from_env(),
            jwt: JwtConfig::from_env(),
            storage: StorageBackend::from_env(),
            websocket: WebSocketConfig::from_env(),
        }
    }
}
