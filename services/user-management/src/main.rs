use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campusmentor_auth::JwtService;
use campusmentor_common::RedisService;
use campusmentor_database::open_store;
use campusmentor_user_management::{build_app, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campusmentor_user_management=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    // Open the store (migrates when backed by PostgreSQL)
    let store = open_store(config.storage, &config.database).await?;

    // Create Redis connection
    let redis_service = RedisService::connect_optional(&config.redis).await?;
    if redis_service.is_none() {
        tracing::warn!("Redis disabled; sessions are not revocable and rate limits are off");
    }

    // Create JWT service
    let jwt_service = JwtService::new(&config.jwt);

    // Build application state
    let app_state = AppState {
        store,
        redis_service,
        jwt_service,
        config: config.clone(),
    };

    let app = build_app(app_state);

    // Start the server
    let listener = tokio::net::TcpListener::bind(config.server.bind_address()).await?;

    tracing::info!("User Management Service listening on {}", config.server.bind_address());

    axum::serve(listener, app).await?;

    Ok(())
}
