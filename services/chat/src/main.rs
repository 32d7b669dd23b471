use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campusmentor_auth::JwtService;
use campusmentor_chat::{build_app, AppState, ChatConfig};
use campusmentor_common::RedisService;
use campusmentor_database::open_store;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campusmentor_chat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = ChatConfig::from_env();

    let store = open_store(config.storage, &config.database).await?;
    let redis_service = RedisService::connect_optional(&config.redis).await?;
    let jwt_service = JwtService::new(&config.jwt);

    let app_state = AppState::new(store, redis_service, jwt_service, config.clone());

    // Fan-out across chat instances
    match &app_state.pubsub {
        Some(pubsub) => pubsub.start(),
        None => tracing::warn!("Redis disabled; live delivery is local to this instance"),
    }

    let app = build_app(app_state);

    // Start the server
    let listener = tokio::net::TcpListener::bind(config.server.bind_address()).await?;

    tracing::info!("Chat service listening on {}", config.server.bind_address());

    axum::serve(listener, app).await?;

    Ok(())
}
