use axum::{
    extract::{Path, State},
    response::Json,
};
use uuid::Uuid;
use validator::Validate;

use campusmentor_auth::AuthUser;
use campusmentor_common::{ApiResponse, AppError};
use campusmentor_database::Profile;

use crate::models::*;
use crate::services::{AppState, UserService};

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

// Health check
pub async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::success("User Management Service is healthy".to_string()))
}

// User Registration
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<AuthResponse> {
    request.validate()?;
    let response = UserService::new(&state).register_user(request).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn register_mentor(
    State(state): State<AppState>,
    Json(request): Json<RegisterMentorRequest>,
) -> ApiResult<MentorRegistrationResponse> {
    request.validate()?;
    let response = UserService::new(&state).register_mentor(request).await?;
    Ok(Json(ApiResponse::success(response)))
}

// User Login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<AuthResponse> {
    request.validate()?;
    let response = UserService::new(&state).login_user(request).await?;
    Ok(Json(ApiResponse::success(response)))
}

// User Logout
pub async fn logout(State(state): State<AppState>, user: AuthUser) -> ApiResult<MessageResponse> {
    UserService::new(&state).logout_user(user.user_id).await?;
    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Logged out successfully".to_string(),
    })))
}

// Get Current User Info
pub async fn get_current_user(State(state): State<AppState>, user: AuthUser) -> ApiResult<CurrentUserResponse> {
    let response = UserService::new(&state)
        .current_user(user.user_id, user.email, user.role)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn setup_admin(State(state): State<AppState>, user: AuthUser) -> ApiResult<RoleResponse> {
    let response = UserService::new(&state).setup_admin(user.user_id).await?;
    Ok(Json(ApiResponse::success(response)))
}

// Profile management
pub async fn get_profile(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Profile> {
    let profile = UserService::new(&state).get_profile(user_id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<Profile> {
    request.validate()?;
    let profile = UserService::new(&state).update_profile(user.user_id, request).await?;
    Ok(Json(ApiResponse::success(profile)))
}
