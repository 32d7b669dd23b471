use redis::aio::ConnectionManager;
use redis::Client;
use serde::{Deserialize, Serialize};

use crate::{AppError, RedisConfig};

/// Shared Redis handle: sessions, rate limits, small caches and the chat
/// fan-out channel. Cloning is cheap; every clone multiplexes the same
/// connection.
#[derive(Clone)]
pub struct RedisService {
    manager: ConnectionManager,
    client: Client,
}

impl RedisService {
    pub async fn new(config: &RedisConfig) -> Result<Self, AppError> {
        let client = Client::open(config.connection_string())?;
        let manager = ConnectionManager::new(client.clone()).await?;

        let service = Self { manager, client };
        service.health_check().await?;

        tracing::info!("Redis connection established");
        Ok(service)
    }

    /// Connects only when Redis is enabled in the configuration.
    pub async fn connect_optional(config: &RedisConfig) -> Result<Option<Self>, AppError> {
        if !config.enabled {
            tracing::info!("Redis disabled; sessions are token-only and chat delivery is local");
            return Ok(None);
        }
        Self::new(config).await.map(Some)
    }

    /// The raw client, used to open dedicated pub/sub connections.
    pub fn client(&self) -> &Client {
        &self.client
    }

    // Session management
    pub async fn set_session(&self, user_id: &str, token: &str, expiry_seconds: u64) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(RedisKeys::session(user_id))
            .arg(token)
            .arg("EX")
            .arg(expiry_seconds)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn get_session(&self, user_id: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.manager.clone();
        let token: Option<String> = redis::cmd("GET")
            .arg(RedisKeys::session(user_id))
            .query_async(&mut conn)
            .await?;
        Ok(token)
    }

    pub async fn delete_session(&self, user_id: &str) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        redis::cmd("DEL")
            .arg(RedisKeys::session(user_id))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    // Fixed window rate limiting
    pub async fn check_rate_limit(&self, key: &str, limit: u32, window_seconds: u64) -> Result<bool, AppError> {
        let mut conn = self.manager.clone();
        let current: u64 = redis::cmd("INCR").arg(key).query_async(&mut conn).await?;

        if current == 1 {
            redis::cmd("EXPIRE")
                .arg(key)
                .arg(window_seconds)
                .query_async::<_, ()>(&mut conn)
                .await?;
        }

        Ok(current <= u64::from(limit))
    }

    // Caching
    pub async fn cache_set<T>(&self, key: &str, value: &T, expiry_seconds: u64) -> Result<(), AppError>
    where
        T: Serialize,
    {
        let serialized = serde_json::to_string(value)
            .map_err(|e| AppError::Internal(format!("Serialization error: {}", e)))?;

        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(serialized)
            .arg("EX")
            .arg(expiry_seconds)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn cache_get<T>(&self, key: &str) -> Result<Option<T>, AppError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut conn = self.manager.clone();
        let result: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;

        match result {
            Some(data) => {
                let value = serde_json::from_str(&data)
                    .map_err(|e| AppError::Internal(format!("Deserialization error: {}", e)))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub async fn cache_delete(&self, key: &str) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        redis::cmd("DEL").arg(key).query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }

    // Pub/Sub for live chat delivery
    pub async fn publish(&self, channel: &str, message: &str) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        redis::cmd("PUBLISH")
            .arg(channel)
            .arg(message)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn publish_json<T>(&self, channel: &str, message: &T) -> Result<(), AppError>
    where
        T: Serialize,
    {
        let serialized = serde_json::to_string(message)
            .map_err(|e| AppError::Internal(format!("Serialization error: {}", e)))?;
        self.publish(channel, &serialized).await
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

// Redis key builders
pub struct RedisKeys;

impl RedisKeys {
    pub const CHAT_CHANNEL: &'static str = "chat:messages";

    pub fn session(user_id: &str) -> String {
        format!("session:{}", user_id)
    }

    pub fn rate_limit(subject: &str, endpoint: &str) -> String {
        format!("rate_limit:{}:{}", subject, endpoint)
    }

    pub fn site_settings() -> String {
        "cache:site_settings".to_string()
    }
}
