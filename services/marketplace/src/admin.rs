use std::sync::Arc;

use uuid::Uuid;

use campusmentor_common::AppError;
use campusmentor_database::{DashboardCounts, Store};

use crate::models::RoleHistoryResponse;
use crate::AppState;

pub struct AdminService {
    store: Arc<dyn Store>,
}

impl AdminService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    pub async fn dashboard_counts(&self) -> Result<DashboardCounts, AppError> {
        self.store.dashboard_counts().await
    }

    pub async fn role_history(&self, user_id: Uuid) -> Result<RoleHistoryResponse, AppError> {
        if self.store.find_user(user_id).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let current_role = self.store.current_role(user_id).await?;
        let events = self.store.role_history(user_id).await?;
        Ok(RoleHistoryResponse {
            user_id,
            current_role,
            events,
        })
    }
}
