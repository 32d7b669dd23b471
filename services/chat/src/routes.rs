use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, websocket::websocket_handler, AppState};

pub fn create_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))

        // WebSocket endpoint (token in the query string)
        .route("/ws", get(websocket_handler))

        // Message endpoints
        .route("/messages", post(handlers::send_message))
        .route("/conversations", get(handlers::list_conversations))
        .route("/conversations/:other_user_id", get(handlers::get_conversation))

        // Admin chat viewer
        .route("/admin/conversations", get(handlers::admin_list_conversations))
        .route("/admin/conversations/:user_a/:user_b", get(handlers::admin_get_conversation))
        .route("/admin/online-users", get(handlers::online_users))
}
