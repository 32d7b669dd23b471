use async_trait::async_trait;
use campusmentor_common::{AppError, UserRole};
use uuid::Uuid;

use crate::models::*;

/// Accounts, profiles and the role projection with its event log.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Creates the user, an empty profile and the initial `junior` role.
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, AppError>;
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError>;
    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> Result<Profile, AppError>;
    async fn current_role(&self, user_id: Uuid) -> Result<Option<UserRole>, AppError>;
    async fn role_history(&self, user_id: Uuid) -> Result<Vec<RoleEvent>, AppError>;
    /// Grants `admin` to the user only while nobody holds it yet.
    async fn promote_first_admin(&self, user_id: Uuid) -> Result<(), AppError>;
}

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn list_colleges(&self) -> Result<Vec<College>, AppError>;
    async fn get_college(&self, id: i64) -> Result<Option<College>, AppError>;
    async fn create_college(&self, input: CollegeInput) -> Result<College, AppError>;
    async fn update_college(&self, id: i64, input: CollegeInput) -> Result<College, AppError>;
    async fn delete_college(&self, id: i64) -> Result<(), AppError>;

    async fn list_mentors(&self, verified_only: bool) -> Result<Vec<MentorListing>, AppError>;
    async fn get_mentor(&self, id: Uuid) -> Result<Option<MentorListing>, AppError>;
    async fn update_mentor(&self, id: Uuid, update: MentorUpdate) -> Result<Mentor, AppError>;

    async fn site_settings(&self) -> Result<SiteSettings, AppError>;
    async fn update_site_settings(&self, update: SiteSettingsUpdate) -> Result<SiteSettings, AppError>;
    async fn dashboard_counts(&self) -> Result<DashboardCounts, AppError>;
}

/// Mentor applications and the transitions that create or remove mentors.
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// Returns the caller's existing pending/approved application instead of
    /// inserting a duplicate.
    async fn submit_application(&self, submission: ApplicationSubmission) -> Result<MentorApplication, AppError>;
    /// Creates the account and its pending application as one unit; neither
    /// exists if either step fails.
    async fn register_mentor(&self, user: NewUser, sign_up: MentorSignUp) -> Result<(User, MentorApplication), AppError>;
    async fn get_application(&self, id: i64) -> Result<Option<MentorApplication>, AppError>;
    async fn list_applications(&self) -> Result<Vec<MentorApplication>, AppError>;
    async fn applications_for_user(&self, user_id: Uuid) -> Result<Vec<MentorApplication>, AppError>;
    /// Marks the application approved, upserts the mentor and elevates the
    /// role as one unit.
    async fn approve_application(&self, approval: Approval) -> Result<ApprovalOutcome, AppError>;
    async fn reject_application(&self, id: i64, actor_id: Option<Uuid>) -> Result<MentorApplication, AppError>;
    /// Resets the role to `junior`, then deletes the user's applications and
    /// the mentor row, as one unit.
    async fn remove_mentor(&self, mentor_id: Uuid, actor_id: Option<Uuid>) -> Result<RemovedMentor, AppError>;
    async fn reconciliation_report(&self) -> Result<ReconciliationReport, AppError>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Snapshots the mentor's current price into `amount_paid`.
    async fn create_booking(&self, booking: NewBooking) -> Result<Booking, AppError>;
    async fn bookings_for_mentor(&self, mentor_id: Uuid) -> Result<Vec<BookingView>, AppError>;
    async fn bookings_for_student(&self, student_id: Uuid) -> Result<Vec<BookingView>, AppError>;
    async fn all_bookings(&self) -> Result<Vec<BookingView>, AppError>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Appends the message and bumps the pair's conversation summary.
    async fn insert_message(&self, message: NewMessage) -> Result<Message, AppError>;
    /// Both directions of the pair, ordered by `(created_at, id)`.
    async fn conversation(&self, user_id: Uuid, other_user_id: Uuid) -> Result<Vec<Message>, AppError>;
    /// Every conversation, most recent activity first.
    async fn conversation_summaries(&self) -> Result<Vec<ConversationSummary>, AppError>;
    async fn conversations_for_user(&self, user_id: Uuid) -> Result<Vec<ConversationSummary>, AppError>;
    /// Recomputes every summary from the message log. Returns the number of
    /// conversations written.
    async fn rebuild_conversation_summaries(&self) -> Result<usize, AppError>;
}

pub trait Store: IdentityStore + DirectoryStore + ApplicationStore + BookingStore + MessageStore {}

impl<T> Store for T where T: IdentityStore + DirectoryStore + ApplicationStore + BookingStore + MessageStore {}
