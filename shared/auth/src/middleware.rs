use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use campusmentor_common::{AppError, RedisService, UserRole};
use serde::Serialize;
use uuid::Uuid;

use crate::jwt::JwtService;

/// What a service state must expose for the identity extractors.
#[async_trait]
pub trait AuthState: Send + Sync {
    fn jwt_service(&self) -> &JwtService;
    fn redis_service(&self) -> Option<&RedisService>;
    /// Live role lookup; tokens only carry the role at sign-in.
    async fn current_role(&self, user_id: Uuid) -> Result<Option<UserRole>, AppError>;
}

/// The caller behind a valid bearer token, with the role as it is now.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    #[serde(skip)]
    pub token: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// An [`AuthUser`] whose live role is `admin`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

/// Validates a raw token against the signature, the server-side session
/// (when Redis is enabled) and the current role.
pub async fn authenticate<S: AuthState>(state: &S, token: &str) -> Result<AuthUser, AppError> {
    let claims = state.jwt_service().validate_token(token)?;

    if let Some(redis) = state.redis_service() {
        match redis.get_session(&claims.sub.to_string()).await? {
            Some(active) if active == token => {}
            _ => return Err(AppError::Authentication("Session expired or signed out".to_string())),
        }
    }

    let role = state
        .current_role(claims.sub)
        .await?
        .ok_or_else(|| AppError::Authentication("Account no longer exists".to_string()))?;

    Ok(AuthUser {
        user_id: claims.sub,
        email: claims.email,
        role,
        token: token.to_string(),
    })
}

/// Extract JWT token from Authorization header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: AuthState,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Authentication("Missing bearer token".to_string()))?
            .to_string();
        authenticate(state, &token).await
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: AuthState,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            tracing::warn!(user_id = %user.user_id, "Admin route denied");
            return Err(AppError::Authorization("Admin privileges required".to_string()));
        }
        Ok(AdminUser(user))
    }
}
