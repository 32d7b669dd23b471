pub mod config;
pub mod connection_manager;
pub mod handlers;
pub mod message_service;
pub mod models;
pub mod pubsub;
pub mod routes;
pub mod websocket;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    http::{HeaderValue, Method, StatusCode},
    response::Json,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use campusmentor_auth::{AuthState, JwtService};
use campusmentor_common::{ApiResponse, AppError, RedisService, ServerConfig, UserRole};
use campusmentor_database::Store;

pub use crate::config::ChatConfig;
use crate::{connection_manager::ConnectionManager, pubsub::ChatPubSub};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub redis_service: Option<RedisService>,
    pub jwt_service: JwtService,
    pub config: ChatConfig,
    pub connection_manager: ConnectionManager,
    /// Present when Redis is enabled; delivery is process-local otherwise.
    pub pubsub: Option<ChatPubSub>,
}

impl AppState {
    /// Wires live delivery. The pub/sub listener is not started here.
    pub fn new(
        store: Arc<dyn Store>,
        redis_service: Option<RedisService>,
        jwt_service: JwtService,
        config: ChatConfig,
    ) -> Self {
        let connection_manager = ConnectionManager::new(config.websocket.broadcast_capacity);
        let pubsub = redis_service
            .clone()
            .map(|redis| ChatPubSub::new(redis, connection_manager.clone()));

        Self {
            store,
            redis_service,
            jwt_service,
            config,
            connection_manager,
            pubsub,
        }
    }
}

#[async_trait]
impl AuthState for AppState {
    fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }

    fn redis_service(&self) -> Option<&RedisService> {
        self.redis_service.as_ref()
    }

    async fn current_role(&self, user_id: Uuid) -> Result<Option<UserRole>, AppError> {
        self.store.current_role(user_id).await
    }
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origin = if server.cors_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            server
                .cors_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .allow_origin(origin)
}

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server);

    routes::create_routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
        .fallback(handler_404)
}

async fn handler_404() -> (StatusCode, Json<ApiResponse<()>>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::error("Endpoint not found".to_string())),
    )
}
