use campusmentor_common::{AppError, ApplicationStatus, UserRole};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const BOOKING_STATUS_CONFIRMED: &str = "confirmed";
pub const DEFAULT_MENTOR_RATING: f64 = 5.0;
pub const UNSPECIFIED: &str = "Not Specified";

/// Largest amount a `NUMERIC(10, 2)` money column holds.
pub const MAX_MONEY: Decimal = Decimal::from_parts(999_999_999, 0, 0, false, 2);

/// Money amounts are stored with two decimal places; anything finer or larger
/// than the column allows is refused rather than rounded.
pub fn validate_money(amount: Decimal, field: &str) -> Result<(), AppError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AppError::Validation(format!("{} cannot be negative", field)));
    }
    if amount.normalize().scale() > 2 {
        return Err(AppError::Validation(format!("{} cannot have more than 2 decimal places", field)));
    }
    if amount > MAX_MONEY {
        return Err(AppError::Validation(format!("{} cannot exceed {}", field, MAX_MONEY)));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub user_id: Uuid,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// One entry of the append-only role log. `user_roles` holds the projection.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoleEvent {
    pub id: i64,
    pub user_id: Uuid,
    pub from_role: Option<UserRole>,
    pub to_role: UserRole,
    pub reason: String,
    pub actor_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct College {
    pub id: i64,
    pub name: String,
    pub location: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MentorApplication {
    pub id: i64,
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub college_name: Option<String>,
    pub status: ApplicationStatus,
    /// Admin who last approved or rejected the application.
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Mentor {
    pub id: Uuid,
    pub college_id: Option<i64>,
    pub branch: Option<String>,
    pub year: Option<String>,
    pub rating: f64,
    pub sessions_count: i32,
    pub price_per_session: Decimal,
    pub expertise: Vec<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mentor row joined with the owner's display name and the assigned college.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MentorListing {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub college_id: Option<i64>,
    pub college_name: Option<String>,
    pub branch: Option<String>,
    pub year: Option<String>,
    pub rating: f64,
    pub sessions_count: i32,
    pub price_per_session: Decimal,
    pub expertise: Vec<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl MentorListing {
    pub fn from_parts(mentor: &Mentor, full_name: Option<String>, college_name: Option<String>) -> Self {
        Self {
            id: mentor.id,
            full_name,
            college_id: mentor.college_id,
            college_name,
            branch: mentor.branch.clone(),
            year: mentor.year.clone(),
            rating: mentor.rating,
            sessions_count: mentor.sessions_count,
            price_per_session: mentor.price_per_session,
            expertise: mentor.expertise.clone(),
            is_verified: mentor.is_verified,
            created_at: mentor.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: i64,
    pub mentor_id: Uuid,
    pub student_id: Uuid,
    pub session_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: String,
    pub amount_paid: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Booking joined with both participants' display names.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BookingView {
    pub id: i64,
    pub mentor_id: Uuid,
    pub mentor_name: Option<String>,
    pub student_id: Uuid,
    pub student_name: Option<String>,
    pub session_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: String,
    pub amount_paid: Decimal,
    pub created_at: DateTime<Utc>,
}

impl BookingView {
    pub fn from_parts(booking: &Booking, mentor_name: Option<String>, student_name: Option<String>) -> Self {
        Self {
            id: booking.id,
            mentor_id: booking.mentor_id,
            mentor_name,
            student_id: booking.student_id,
            student_name,
            session_time: booking.session_time,
            duration_minutes: booking.duration_minutes,
            status: booking.status.clone(),
            amount_paid: booking.amount_paid,
            created_at: booking.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Derived per-pair row kept in step with message inserts.
/// `participant_a` is always the smaller id of the pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ConversationSummary {
    pub participant_a: Uuid,
    pub participant_b: Uuid,
    pub last_message_at: DateTime<Utc>,
    pub message_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SiteSettings {
    pub active_mentors: String,
    pub top_colleges: String,
    pub average_rating: String,
    pub updated_at: DateTime<Utc>,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            active_mentors: "500+".to_string(),
            top_colleges: "50+".to_string(),
            average_rating: "4.9".to_string(),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardCounts {
    pub colleges: i64,
    pub mentors: i64,
    pub pending_applications: i64,
    pub bookings: i64,
}

/// Drift between applications, mentor rows and roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub approved_without_mentor: Vec<Uuid>,
    pub mentors_without_senior_role: Vec<Uuid>,
    pub seniors_without_mentor: Vec<Uuid>,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.approved_without_mentor.is_empty()
            && self.mentors_without_senior_role.is_empty()
            && self.seniors_without_mentor.is_empty()
    }

    pub(crate) fn sorted(mut self) -> Self {
        self.approved_without_mentor.sort();
        self.approved_without_mentor.dedup();
        self.mentors_without_senior_role.sort();
        self.seniors_without_mentor.sort();
        self
    }
}

// Write commands

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    pub(crate) fn apply(self, profile: &mut Profile) {
        if let Some(full_name) = self.full_name {
            profile.full_name = Some(full_name);
        }
        if let Some(phone) = self.phone {
            profile.phone = Some(phone);
        }
        if let Some(bio) = self.bio {
            profile.bio = Some(bio);
        }
        if let Some(avatar_url) = self.avatar_url {
            profile.avatar_url = Some(avatar_url);
        }
        profile.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone)]
pub struct CollegeInput {
    pub name: String,
    pub location: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl CollegeInput {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("College name is required".to_string()));
        }
        Ok(())
    }
}

/// Admin edit of a mentor. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct MentorUpdate {
    pub college_id: Option<i64>,
    pub branch: Option<String>,
    pub year: Option<String>,
    pub rating: Option<f64>,
    pub sessions_count: Option<i32>,
    pub price_per_session: Option<Decimal>,
    pub expertise: Option<Vec<String>>,
    pub is_verified: Option<bool>,
}

impl MentorUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(rating) = self.rating {
            if !(0.0..=5.0).contains(&rating) {
                return Err(AppError::Validation("Rating must be between 0 and 5".to_string()));
            }
        }
        if matches!(self.sessions_count, Some(count) if count < 0) {
            return Err(AppError::Validation("Sessions count cannot be negative".to_string()));
        }
        if let Some(price) = self.price_per_session {
            validate_money(price, "Price per session")?;
        }
        Ok(())
    }

    pub(crate) fn apply(self, mentor: &mut Mentor) {
        if let Some(college_id) = self.college_id {
            mentor.college_id = Some(college_id);
        }
        if let Some(branch) = self.branch {
            mentor.branch = Some(branch);
        }
        if let Some(year) = self.year {
            mentor.year = Some(year);
        }
        if let Some(rating) = self.rating {
            mentor.rating = rating;
        }
        if let Some(count) = self.sessions_count {
            mentor.sessions_count = count;
        }
        if let Some(price) = self.price_per_session {
            mentor.price_per_session = price;
        }
        if let Some(expertise) = self.expertise {
            mentor.expertise = expertise;
        }
        if let Some(verified) = self.is_verified {
            mentor.is_verified = verified;
        }
        mentor.updated_at = Utc::now();
    }
}

/// Splits a comma separated tag list, trimming and dropping blanks.
pub fn parse_expertise(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone)]
pub struct ApplicationSubmission {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub college_name: Option<String>,
}

impl ApplicationSubmission {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.full_name.trim().is_empty() {
            return Err(AppError::Validation("Full name is required".to_string()));
        }
        if self.email.trim().is_empty() {
            return Err(AppError::Validation("Email is required".to_string()));
        }
        Ok(())
    }
}

/// Application details filed together with a new account.
#[derive(Debug, Clone)]
pub struct MentorSignUp {
    pub full_name: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub college_name: Option<String>,
}

impl MentorSignUp {
    pub fn submission(self, user: &User) -> ApplicationSubmission {
        ApplicationSubmission {
            user_id: user.id,
            full_name: self.full_name,
            email: user.email.clone(),
            phone: self.phone,
            bio: self.bio,
            college_name: self.college_name,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.full_name.trim().is_empty() {
            return Err(AppError::Validation("Full name is required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Approval {
    pub application_id: i64,
    pub college_id: i64,
    pub fee_per_session: Decimal,
    pub actor_id: Option<Uuid>,
}

impl Approval {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_money(self.fee_per_session, "Fee per session")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApprovalOutcome {
    pub application: MentorApplication,
    pub mentor: Mentor,
    /// False when the user already held the senior role.
    pub role_changed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemovedMentor {
    pub mentor_id: Uuid,
    pub applications_removed: u64,
    pub previous_role: Option<UserRole>,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub student_id: Uuid,
    pub mentor_id: Uuid,
    pub session_time: DateTime<Utc>,
    pub duration_minutes: i32,
    /// Refuse a second booking for the same mentor and instant.
    pub exclusive_slot: bool,
}

impl NewBooking {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.duration_minutes <= 0 {
            return Err(AppError::Validation("Duration must be positive".to_string()));
        }
        if self.student_id == self.mentor_id {
            return Err(AppError::Validation("Cannot book a session with yourself".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
}

impl NewMessage {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.content.trim().is_empty() {
            return Err(AppError::Validation("Message content cannot be empty".to_string()));
        }
        if self.sender_id == self.receiver_id {
            return Err(AppError::Validation("Cannot send a message to yourself".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteSettingsUpdate {
    pub active_mentors: Option<String>,
    pub top_colleges: Option<String>,
    pub average_rating: Option<String>,
}

impl SiteSettingsUpdate {
    pub(crate) fn apply(self, settings: &mut SiteSettings) {
        if let Some(value) = self.active_mentors {
            settings.active_mentors = value;
        }
        if let Some(value) = self.top_colleges {
            settings.top_colleges = value;
        }
        if let Some(value) = self.average_rating {
            settings.average_rating = value;
        }
        settings.updated_at = Utc::now();
    }
}

/// Why a role changed, recorded on every role event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChangeReason {
    SignUp,
    ApplicationApproved,
    MentorRemoved,
    AdminBootstrap,
}

impl RoleChangeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleChangeReason::SignUp => "sign_up",
            RoleChangeReason::ApplicationApproved => "application_approved",
            RoleChangeReason::MentorRemoved => "mentor_removed",
            RoleChangeReason::AdminBootstrap => "admin_bootstrap",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_is_limited_to_the_stored_precision() {
        assert!(validate_money(Decimal::new(49900, 2), "Fee").is_ok());
        assert!(validate_money(Decimal::new(499000, 3), "Fee").is_ok());
        assert!(validate_money(MAX_MONEY, "Fee").is_ok());
        assert!(validate_money(Decimal::ZERO, "Fee").is_ok());

        assert!(validate_money(Decimal::new(499999, 3), "Fee").is_err());
        assert!(validate_money(Decimal::new(100_000_000, 0), "Fee").is_err());
        assert!(validate_money(Decimal::new(-1, 0), "Fee").is_err());

        let update = MentorUpdate {
            price_per_session: Some(Decimal::new(12345, 3)),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn expertise_is_split_and_trimmed() {
        assert_eq!(
            parse_expertise(" DSA, Web Dev ,, ML "),
            vec!["DSA".to_string(), "Web Dev".to_string(), "ML".to_string()]
        );
        assert!(parse_expertise(" , ").is_empty());
    }

    #[test]
    fn mentor_update_rejects_out_of_range_values() {
        let update = MentorUpdate { rating: Some(5.5), ..Default::default() };
        assert!(matches!(update.validate(), Err(AppError::Validation(_))));

        let update = MentorUpdate { sessions_count: Some(-1), ..Default::default() };
        assert!(update.validate().is_err());

        let update = MentorUpdate { price_per_session: Some(Decimal::new(-100, 2)), ..Default::default() };
        assert!(update.validate().is_err());

        let update = MentorUpdate { rating: Some(0.0), sessions_count: Some(0), ..Default::default() };
        assert!(update.validate().is_ok());
    }

    #[test]
    fn blank_messages_are_rejected() {
        let message = NewMessage {
            sender_id: Uuid::new_v4(),
            receiver_id: Uuid::new_v4(),
            content: "   \n".to_string(),
        };
        assert!(matches!(message.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn reconciliation_report_is_clean_when_empty() {
        assert!(ReconciliationReport::default().is_clean());
        let report = ReconciliationReport {
            seniors_without_mentor: vec![Uuid::new_v4()],
            ..Default::default()
        };
        assert!(!report.is_clean());
    }
}
