use std::sync::Arc;

use uuid::Uuid;

use campusmentor_common::{AppError, RedisKeys, RedisService};
use campusmentor_database::{
    search::{filter_colleges, filter_mentors},
    College, Mentor, MentorListing, MentorUpdate, SiteSettings, SiteSettingsUpdate, Store,
};

use crate::models::{CollegeRequest, UpdateMentorRequest};
use crate::AppState;

const SITE_SETTINGS_TTL_SECONDS: u64 = 300;

/// Colleges, mentor profiles and the site settings singleton.
pub struct DirectoryService {
    store: Arc<dyn Store>,
    redis_service: Option<RedisService>,
}

impl DirectoryService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            redis_service: state.redis_service.clone(),
        }
    }

    // Colleges
    pub async fn list_colleges(&self, query: Option<&str>) -> Result<Vec<College>, AppError> {
        let colleges = self.store.list_colleges().await?;
        Ok(filter_colleges(colleges, query))
    }

    pub async fn get_college(&self, id: i64) -> Result<College, AppError> {
        self.store
            .get_college(id)
            .await?
            .ok_or_else(|| AppError::NotFound("College not found".to_string()))
    }

    pub async fn create_college(&self, request: CollegeRequest) -> Result<College, AppError> {
        let college = self.store.create_college(request.into()).await?;
        tracing::info!(college_id = college.id, "College created");
        Ok(college)
    }

    pub async fn update_college(&self, id: i64, request: CollegeRequest) -> Result<College, AppError> {
        let college = self.store.update_college(id, request.into()).await?;
        tracing::info!(college_id = id, "College updated");
        Ok(college)
    }

    pub async fn delete_college(&self, id: i64) -> Result<(), AppError> {
        self.store.delete_college(id).await?;
        tracing::info!(college_id = id, "College deleted");
        Ok(())
    }

    // Mentors

    /// Public listing: verified mentors only.
    pub async fn list_mentors(&self, query: Option<&str>) -> Result<Vec<MentorListing>, AppError> {
        let mentors = self.store.list_mentors(true).await?;
        Ok(filter_mentors(mentors, query))
    }

    /// Unverified mentors are hidden from the public profile page.
    pub async fn get_mentor(&self, id: Uuid) -> Result<MentorListing, AppError> {
        self.store
            .get_mentor(id)
            .await?
            .filter(|mentor| mentor.is_verified)
            .ok_or_else(|| AppError::NotFound("Mentor not found".to_string()))
    }

    pub async fn admin_list_mentors(&self, query: Option<&str>) -> Result<Vec<MentorListing>, AppError> {
        let mentors = self.store.list_mentors(false).await?;
        Ok(filter_mentors(mentors, query))
    }

    pub async fn update_mentor(&self, id: Uuid, request: UpdateMentorRequest) -> Result<Mentor, AppError> {
        let update: MentorUpdate = request.into();
        update.validate()?;
        let mentor = self.store.update_mentor(id, update).await?;
        tracing::info!(mentor_id = %id, "Mentor updated");
        Ok(mentor)
    }

    // Site settings
    pub async fn site_settings(&self) -> Result<SiteSettings, AppError> {
        let key = RedisKeys::site_settings();

        if let Some(redis) = &self.redis_service {
            match redis.cache_get::<SiteSettings>(&key).await {
                Ok(Some(settings)) => return Ok(settings),
                Ok(None) => {}
                Err(err) => tracing::warn!("Site settings cache read failed: {}", err),
            }
        }

        let settings = self.store.site_settings().await?;

        if let Some(redis) = &self.redis_service {
            if let Err(err) = redis.cache_set(&key, &settings, SITE_SETTINGS_TTL_SECONDS).await {
                tracing::warn!("Site settings cache write failed: {}", err);
            }
        }

        Ok(settings)
    }

    pub async fn update_site_settings(&self, update: SiteSettingsUpdate) -> Result<SiteSettings, AppError> {
        let settings = self.store.update_site_settings(update).await?;

        if let Some(redis) = &self.redis_service {
            if let Err(err) = redis.cache_delete(&RedisKeys::site_settings()).await {
                tracing::warn!("Site settings cache invalidation failed: {}", err);
            }
        }

        tracing::info!("Site settings updated");
        Ok(settings)
    }
}
