use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Reads an environment variable, falling back to `default` when unset.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Reads and parses an environment variable. Unset or unparsable values fall
/// back to `default` with a warning.
pub fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value for {}: {:?}, using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_or("DATABASE_HOST", "localhost"),
            port: env_parse("DATABASE_PORT", 5432),
            username: env_or("DATABASE_USERNAME", "campusmentor_user"),
            password: env_or("DATABASE_PASSWORD", "campusmentor_password"),
            database: env_or("DATABASE_NAME", "campusmentor"),
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10),
        }
    }

    pub fn connection_string(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub database: u8,
}

impl RedisConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: env_parse("REDIS_ENABLED", true),
            host: env_or("REDIS_HOST", "localhost"),
            port: env_parse("REDIS_PORT", 6379),
            password: std::env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty()),
            database: env_parse("REDIS_DATABASE", 0),
        }
    }

    pub fn connection_string(&self) -> String {
        match &self.password {
            Some(password) => format!("redis://:{}@{}:{}/{}", password, self.host, self.port, self.database),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.database),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: u64,
    pub issuer: String,
}

impl JwtConfig {
    pub fn from_env() -> Self {
        Self {
            secret: env_or("JWT_SECRET", "dev-secret-key-change-in-production"),
            expiration_hours: env_parse("JWT_EXPIRATION_HOURS", 24),
            issuer: env_or("JWT_ISSUER", "campusmentor"),
        }
    }

    pub fn expiration_seconds(&self) -> u64 {
        self.expiration_hours * 3600
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    pub fn from_env(default_port: u16) -> Self {
        Self {
            host: env_or("SERVER_HOST", "0.0.0.0"),
            port: env_parse("SERVER_PORT", default_port),
            cors_origins: env_or("CORS_ORIGINS", "http://localhost:3000")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where the services keep their rows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    /// Process-local store, for tests and single-service development.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(AppError::Validation(format!("Unknown storage backend: {}", other))),
        }
    }
}

impl StorageBackend {
    pub fn from_env() -> Self {
        env_parse("STORAGE_BACKEND", StorageBackend::Postgres)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redis_connection_string_includes_password_when_set() {
        let config = RedisConfig {
            enabled: true,
            host: "cache".to_string(),
            port: 6380,
            password: Some("s3cret".to_string()),
            database: 2,
        };
        assert_eq!(config.connection_string(), "redis://:s3cret@cache:6380/2");
    }

    #[test]
    fn database_connection_string() {
        let config = DatabaseConfig {
            host: "db".to_string(),
            port: 5433,
            username: "u".to_string(),
            password: "p".to_string(),
            database: "campus".to_string(),
            max_connections: 4,
        };
        assert_eq!(config.connection_string(), "postgresql://u:p@db:5433/campus");
    }

    #[test]
    fn storage_backend_parses_aliases() {
        assert_eq!("Memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert_eq!("postgresql".parse::<StorageBackend>().unwrap(), StorageBackend::Postgres);
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }
}
