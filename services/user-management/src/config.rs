use campusmentor_common::{env_parse, DatabaseConfig, JwtConfig, RedisConfig, ServerConfig, StorageBackend};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub storage: StorageBackend,
    /// Sign-in and sign-up attempts allowed per client per minute.
    pub auth_rate_limit_per_minute: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(8000),
            database: DatabaseConfig::from_env(),
            redis: RedisConfig::from_env(),
            jwt: JwtConfig::from_env(),
            storage: StorageBackend::from_env(),
            auth_rate_limit_per_minute: env_parse("AUTH_RATE_LIMIT_PER_MINUTE", 20),
        }
    }
}
