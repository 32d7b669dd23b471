pub mod access;
pub mod admin;
pub mod applications;
pub mod bookings;
pub mod config;
pub mod directory;
pub mod handlers;
pub mod models;
pub mod routes;

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

pub use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub redis_service: Option<RedisService>,
    pub jwt_service: JwtService,
    pub config: AppConfig,
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
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
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
