use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campusmentor_auth::JwtService;
use campusmentor_common::RedisService;
use campusmentor_database::open_store;
use campusmentor_marketplace::{build_app, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campusmentor_marketplace=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    // Fail fast on a bad booking offset
    config.booking.utc_offset()?;

    let store = open_store(config.storage, &config.database).await?;
    let redis_service = RedisService::connect_optional(&config.redis).await?;
    let jwt_service = JwtService::new(&config.jwt);

    let app_state = AppState {
        store,
        redis_service,
        jwt_service,
        config: config.clone(),
    };

    let app = build_app(app_state);

    // Start the server
    let listener = tokio::net::TcpListener::bind(config.server.bind_address()).await?;

    tracing::info!(
        exclusive_slots = config.booking.exclusive_slots,
        "Marketplace service listening on {}",
        config.server.bind_address()
    );

    axum::serve(listener, app).await?;

    Ok(())
}
