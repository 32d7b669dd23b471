use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};

use crate::handlers;
use crate::middleware::rate_limit_middleware;
use crate::services::AppState;

pub fn create_routes(state: AppState) -> Router<AppState> {
    // Credential endpoints are rate limited
    let credential_routes = Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/register-mentor", post(handlers::register_mentor))
        .route("/auth/login", post(handlers::login))
        .route_layer(from_fn_with_state(state, rate_limit_middleware));

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))

        // Session routes
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::get_current_user))
        .route("/auth/setup-admin", post(handlers::setup_admin))

        // Profile management routes
        .route("/profiles/:user_id", get(handlers::get_profile))
        .route("/profiles", put(handlers::update_profile))
        .merge(credential_routes)
}
