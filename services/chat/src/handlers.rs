use axum::{
    extract::{Path, State},
    response::Json,
};
use uuid::Uuid;
use validator::Validate;

use campusmentor_auth::{AdminUser, AuthUser};
use campusmentor_common::{ApiResponse, AppError};
use campusmentor_database::Message;

use crate::{
    message_service::MessageService,
    models::{AdminConversationEntry, ConversationEntry, SendMessageRequest},
    AppState,
};

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

// Health check
pub async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::success("Chat service is healthy".to_string()))
}

pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<SendMessageRequest>,
) -> ApiResult<Message> {
    request.validate()?;
    let message = MessageService::new(&state)
        .send_message(user.user_id, request.receiver_id, &request.content)
        .await?;
    Ok(Json(ApiResponse::success(message)))
}

pub async fn list_conversations(State(state): State<AppState>, user: AuthUser) -> ApiResult<Vec<ConversationEntry>> {
    let conversations = MessageService::new(&state).conversations_for_user(user.user_id).await?;
    Ok(Json(ApiResponse::success(conversations)))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(other_user_id): Path<Uuid>,
) -> ApiResult<Vec<Message>> {
    let messages = MessageService::new(&state)
        .conversation(user.user_id, other_user_id)
        .await?;
    Ok(Json(ApiResponse::success(messages)))
}

// Admin chat viewer (read-only)
pub async fn admin_list_conversations(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Vec<AdminConversationEntry>> {
    let conversations = MessageService::new(&state).all_conversations().await?;
    Ok(Json(ApiResponse::success(conversations)))
}

pub async fn admin_get_conversation(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path((user_a, user_b)): Path<(Uuid, Uuid)>,
) -> ApiResult<Vec<Message>> {
    let messages = MessageService::new(&state).conversation(user_a, user_b).await?;
    Ok(Json(ApiResponse::success(messages)))
}

pub async fn online_users(State(state): State<AppState>, _admin: AdminUser) -> Json<ApiResponse<Vec<Uuid>>> {
    Json(ApiResponse::success(state.connection_manager.online_users()))
}
