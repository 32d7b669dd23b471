use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use campusmentor_auth::AuthUser;
use campusmentor_common::AppError;
use campusmentor_database::{
    ApplicationSubmission, Approval, ApprovalOutcome, MentorApplication, ReconciliationReport,
    RemovedMentor, Store,
};

use crate::models::ApplicationRequest;
use crate::AppState;

/// The mentor application workflow: submit, approve, reject, and the
/// reverse of approval.
pub struct ApplicationService {
    store: Arc<dyn Store>,
}

impl ApplicationService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    /// Files an application for the caller. A second submission while one is
    /// pending or approved returns the existing application.
    pub async fn submit(&self, user: &AuthUser, request: ApplicationRequest) -> Result<MentorApplication, AppError> {
        let email = request
            .email
            .map(|e| e.trim().to_lowercase())
            .unwrap_or_else(|| user.email.clone());

        let application = self
            .store
            .submit_application(ApplicationSubmission {
                user_id: user.user_id,
                full_name: request.full_name.trim().to_string(),
                email,
                phone: request.phone,
                bio: request.bio,
                college_name: request.college_name.filter(|c| !c.trim().is_empty()),
            })
            .await?;

        tracing::info!(user_id = %user.user_id, application_id = application.id, "Mentor application submitted");
        Ok(application)
    }

    pub async fn applications_for_user(&self, user_id: Uuid) -> Result<Vec<MentorApplication>, AppError> {
        self.store.applications_for_user(user_id).await
    }

    pub async fn list(&self) -> Result<Vec<MentorApplication>, AppError> {
        self.store.list_applications().await
    }

    pub async fn approve(
        &self,
        application_id: i64,
        college_id: i64,
        fee_per_session: Decimal,
        actor_id: Uuid,
    ) -> Result<ApprovalOutcome, AppError> {
        let approval = Approval {
            application_id,
            college_id,
            fee_per_session,
            actor_id: Some(actor_id),
        };
        approval.validate()?;

        let outcome = self.store.approve_application(approval).await?;
        tracing::info!(
            application_id,
            mentor_id = %outcome.mentor.id,
            role_changed = outcome.role_changed,
            "Mentor application approved"
        );
        Ok(outcome)
    }

    pub async fn reject(&self, application_id: i64, actor_id: Uuid) -> Result<MentorApplication, AppError> {
        let application = self.store.reject_application(application_id, Some(actor_id)).await?;
        tracing::info!(application_id, "Mentor application rejected");
        Ok(application)
    }

    pub async fn remove_mentor(&self, mentor_id: Uuid, actor_id: Uuid) -> Result<RemovedMentor, AppError> {
        let removed = self.store.remove_mentor(mentor_id, Some(actor_id)).await?;
        tracing::info!(
            mentor_id = %mentor_id,
            applications_removed = removed.applications_removed,
            "Mentor removed"
        );
        Ok(removed)
    }

    pub async fn reconciliation(&self) -> Result<ReconciliationReport, AppError> {
        let report = self.store.reconciliation_report().await?;
        if !report.is_clean() {
            tracing::warn!(
                approved_without_mentor = report.approved_without_mentor.len(),
                mentors_without_senior_role = report.mentors_without_senior_role.len(),
                seniors_without_mentor = report.seniors_without_mentor.len(),
                "Role reconciliation found drift"
            );
        }
        Ok(report)
    }
}
