use campusmentor_common::{
    env_parse, AppError, DatabaseConfig, JwtConfig, RedisConfig, ServerConfig, StorageBackend,
};
use campusmentor_database::schedule::DEFAULT_DURATION_MINUTES;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub storage: StorageBackend,
    pub booking: BookingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    pub default_duration_minutes: i32,
    /// Offset a calendar date plus clock label is read in.
    pub utc_offset_minutes: i32,
    /// Refuse a second booking for the same mentor and instant.
    pub exclusive_slots: bool,
}

impl BookingConfig {
    pub fn from_env() -> Self {
        Self {
            default_duration_minutes: env_parse("BOOKING_DEFAULT_DURATION_MINUTES", DEFAULT_DURATION_MINUTES),
            utc_offset_minutes: env_parse("BOOKING_UTC_OFFSET_MINUTES", 0),
            exclusive_slots: env_parse("BOOKING_EXCLUSIVE_SLOTS", false),
        }
    }

    pub fn utc_offset(&self) -> Result<FixedOffset, AppError> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            AppError::Internal(format!("Invalid booking UTC offset: {} minutes", self.utc_offset_minutes))
        })
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            default_duration_minutes: DEFAULT_DURATION_MINUTES,
            utc_offset_minutes: 0,
            exclusive_slots: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(8001),
            database: DatabaseConfig::from_env(),
            redis: RedisConfig::from_env(),
            jwt: JwtConfig::from_env(),
            storage: StorageBackend::from_env(),
            booking: BookingConfig::from_env(),
        }
    }
}
