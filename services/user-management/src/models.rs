use campusmentor_common::UserRole;
use campusmentor_database::{MentorApplication, Profile, ProfileUpdate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// Request/Response DTOs
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    #[validate(length(min = 1, max = 100))]
    pub full_name: String,

    #[validate(length(max = 20))]
    pub phone: Option<String>,
}

/// Sign-up that also files a mentor application.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterMentorRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    #[validate(length(min = 1, max = 100))]
    pub full_name: String,

    #[validate(length(min = 1, max = 20))]
    pub phone: String,

    #[validate(length(max = 2000))]
    pub bio: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserInfo {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MentorRegistrationResponse {
    pub auth: AuthResponse,
    pub application: MentorApplication,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentUserResponse {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub profile: Option<Profile>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub full_name: Option<String>,

    #[validate(length(max = 20))]
    pub phone: Option<String>,

    #[validate(length(max = 2000))]
    pub bio: Option<String>,

    #[validate(url)]
    pub avatar_url: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileUpdate {
    fn from(request: UpdateProfileRequest) -> Self {
        ProfileUpdate {
            full_name: request.full_name,
            phone: request.phone,
            bio: request.bio,
            avatar_url: request.avatar_url,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoleResponse {
    pub user_id: Uuid,
    pub role: UserRole,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_validation() {
        let request = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "campus123".to_string(),
            full_name: "Asha".to_string(),
            phone: None,
        };
        assert!(request.validate().is_err());

        let request = RegisterRequest {
            email: "asha@example.com".to_string(),
            password: "campus123".to_string(),
            full_name: String::new(),
            phone: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn profile_update_rejects_bad_avatar_urls() {
        let request = UpdateProfileRequest {
            full_name: None,
            phone: None,
            bio: None,
            avatar_url: Some("not a url".to_string()),
        };
        assert!(request.validate().is_err());
    }
}
