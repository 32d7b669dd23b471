use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use campusmentor_auth::{AuthState, JwtService, PasswordService};
use campusmentor_common::{AppError, RedisService, UserRole};
use campusmentor_database::{MentorSignUp, NewUser, Profile, Store, User, UNSPECIFIED};

use crate::config::AppConfig;
use crate::models::*;

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

pub struct UserService {
    store: Arc<dyn Store>,
    redis_service: Option<RedisService>,
    jwt_service: JwtService,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn new_user(email: &str, password: &str, full_name: &str, phone: Option<String>) -> Result<NewUser, AppError> {
    PasswordService::validate_password_strength(password)?;
    Ok(NewUser {
        email: normalize_email(email),
        password_hash: PasswordService::hash_password(password)?,
        full_name: Some(full_name.to_string()),
        phone: phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
    })
}

impl UserService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            redis_service: state.redis_service.clone(),
            jwt_service: state.jwt_service.clone(),
        }
    }

    // User Registration
    pub async fn register_user(&self, request: RegisterRequest) -> Result<AuthResponse, AppError> {
        let full_name = request.full_name.trim().to_string();
        let user = self
            .store
            .create_user(new_user(&request.email, &request.password, &full_name, request.phone)?)
            .await?;

        tracing::info!(user_id = %user.id, "User registered");
        self.start_session(&user, UserRole::Junior, Some(full_name)).await
    }

    /// Creates the account and files a pending mentor application for it in
    /// one store operation, then signs the new user in.
    pub async fn register_mentor(&self, request: RegisterMentorRequest) -> Result<MentorRegistrationResponse, AppError> {
        let full_name = request.full_name.trim().to_string();
        let phone = Some(request.phone.trim().to_string()).filter(|p| !p.is_empty());

        let (user, application) = self
            .store
            .register_mentor(
                new_user(&request.email, &request.password, &full_name, phone.clone())?,
                MentorSignUp {
                    full_name: full_name.clone(),
                    phone,
                    bio: request.bio,
                    college_name: Some(UNSPECIFIED.to_string()),
                },
            )
            .await?;

        tracing::info!(user_id = %user.id, application_id = application.id, "Mentor application submitted at sign-up");
        let auth = self.start_session(&user, UserRole::Junior, Some(full_name)).await?;
        Ok(MentorRegistrationResponse { auth, application })
    }

    // User Login
    pub async fn login_user(&self, request: LoginRequest) -> Result<AuthResponse, AppError> {
        let invalid = || AppError::Authentication("Invalid email or password".to_string());

        let user = self
            .store
            .find_user_by_email(&normalize_email(&request.email))
            .await?
            .ok_or_else(invalid)?;

        if !PasswordService::verify_password(&request.password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "Failed sign-in attempt");
            return Err(invalid());
        }

        let role = self
            .store
            .current_role(user.id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("User {} has no role", user.id)))?;
        let full_name = self.store.get_profile(user.id).await?.and_then(|p| p.full_name);

        tracing::info!(user_id = %user.id, "User signed in");
        self.start_session(&user, role, full_name).await
    }

    pub async fn logout_user(&self, user_id: Uuid) -> Result<(), AppError> {
        if let Some(redis) = &self.redis_service {
            redis.delete_session(&user_id.to_string()).await?;
        }
        tracing::info!(user_id = %user_id, "User signed out");
        Ok(())
    }

    pub async fn current_user(&self, user_id: Uuid, email: String, role: UserRole) -> Result<CurrentUserResponse, AppError> {
        let profile = self.store.get_profile(user_id).await?;
        Ok(CurrentUserResponse {
            user_id,
            email,
            role,
            profile,
        })
    }

    /// First-admin bootstrap; refused once any admin exists.
    pub async fn setup_admin(&self, user_id: Uuid) -> Result<RoleResponse, AppError> {
        self.store.promote_first_admin(user_id).await?;
        tracing::info!(user_id = %user_id, "First admin promoted");
        Ok(RoleResponse {
            user_id,
            role: UserRole::Admin,
        })
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Profile, AppError> {
        self.store
            .get_profile(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
    }

    pub async fn update_profile(&self, user_id: Uuid, request: UpdateProfileRequest) -> Result<Profile, AppError> {
        self.store.update_profile(user_id, request.into()).await
    }

    async fn start_session(&self, user: &User, role: UserRole, full_name: Option<String>) -> Result<AuthResponse, AppError> {
        let token = self.jwt_service.issue(user.id, &user.email, role)?;
        let ttl = self.jwt_service.expiration_seconds();

        if let Some(redis) = &self.redis_service {
            redis.set_session(&user.id.to_string(), &token, ttl).await?;
        }

        Ok(AuthResponse {
            token,
            user: UserInfo {
                user_id: user.id,
                email: user.email.clone(),
                full_name,
                role,
                created_at: user.created_at,
            },
            expires_at: Utc::now() + Duration::seconds(ttl as i64),
        })
    }
}
