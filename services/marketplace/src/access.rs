use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

use campusmentor_auth::AuthUser;
use campusmentor_common::AppError;
use campusmentor_database::MentorListing;

use crate::AppState;

/// A signed-in caller who owns a mentor row. Checked against the store on
/// every request, the same way roles are.
#[derive(Debug, Clone)]
pub struct MentorUser {
    pub user: AuthUser,
    pub mentor: MentorListing,
}

#[async_trait]
impl FromRequestParts<AppState> for MentorUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;

        match state.store.get_mentor(user.user_id).await? {
            Some(mentor) => Ok(MentorUser { user, mentor }),
            None => {
                tracing::debug!(user_id = %user.user_id, "Mentor area refused: no mentor record");
                Err(AppError::Authorization("Mentor access required".to_string()))
            }
        }
    }
}
