use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use campusmentor_common::UserRole;
use campusmentor_database::{
    parse_expertise, BookingStats, BookingView, CollegeInput, Counterpart, MentorApplication,
    MentorListing, MentorUpdate, RoleEvent,
};

/// Free-text filter shared by the college and mentor listings.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

// Directory DTOs
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CollegeRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(length(max = 200))]
    pub location: Option<String>,

    #[validate(length(max = 100))]
    pub category: Option<String>,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    #[validate(url)]
    pub image_url: Option<String>,
}

impl From<CollegeRequest> for CollegeInput {
    fn from(request: CollegeRequest) -> Self {
        CollegeInput {
            name: request.name.trim().to_string(),
            location: request.location,
            category: request.category,
            description: request.description,
            image_url: request.image_url,
        }
    }
}

/// Admin mentor edit. `expertise` is a comma separated tag list.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdateMentorRequest {
    pub college_id: Option<i64>,

    #[validate(length(max = 100))]
    pub branch: Option<String>,

    #[validate(length(max = 50))]
    pub year: Option<String>,

    #[validate(range(min = 0.0, max = 5.0))]
    pub rating: Option<f64>,

    #[validate(range(min = 0))]
    pub sessions_count: Option<i32>,

    pub price_per_session: Option<Decimal>,
    pub expertise: Option<String>,
    pub is_verified: Option<bool>,
}

impl From<UpdateMentorRequest> for MentorUpdate {
    fn from(request: UpdateMentorRequest) -> Self {
        MentorUpdate {
            college_id: request.college_id,
            branch: request.branch,
            year: request.year,
            rating: request.rating,
            sessions_count: request.sessions_count,
            price_per_session: request.price_per_session,
            expertise: request.expertise.as_deref().map(parse_expertise),
            is_verified: request.is_verified,
        }
    }
}

// Application DTOs
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ApplicationRequest {
    #[validate(length(min = 1, max = 100))]
    pub full_name: String,

    /// Defaults to the signed-in account's email.
    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(max = 20))]
    pub phone: Option<String>,

    #[validate(length(max = 2000))]
    pub bio: Option<String>,

    #[validate(length(max = 200))]
    pub college_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApproveRequest {
    pub college_id: i64,
    pub fee_per_session: Decimal,
}

// Booking DTOs

/// Either an absolute `session_time`, or a calendar `date` plus a 12-hour
/// `time_slot` label such as "02:00 PM".
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct BookingRequest {
    pub mentor_id: Uuid,
    pub session_time: Option<DateTime<Utc>>,
    pub date: Option<NaiveDate>,

    #[validate(length(min = 1, max = 16))]
    pub time_slot: Option<String>,

    #[validate(range(min = 1, max = 480))]
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TimeSlotsResponse {
    pub slots: Vec<String>,
    pub default_duration_minutes: i32,
}

#[derive(Debug, Serialize)]
pub struct MentorDashboard {
    pub mentor: MentorListing,
    pub stats: BookingStats,
    pub bookings: Vec<BookingView>,
    pub students: Vec<Counterpart>,
}

#[derive(Debug, Serialize)]
pub struct StudentSessions {
    pub bookings: Vec<BookingView>,
    pub mentors: Vec<Counterpart>,
}

// Admin DTOs
#[derive(Debug, Serialize)]
pub struct RoleHistoryResponse {
    pub user_id: Uuid,
    pub current_role: Option<UserRole>,
    pub events: Vec<RoleEvent>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationList {
    pub applications: Vec<MentorApplication>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mentor_edit_splits_expertise_tags() {
        let request = UpdateMentorRequest {
            expertise: Some("DSA, , System Design ,ML".to_string()),
            ..Default::default()
        };
        let update: MentorUpdate = request.into();
        assert_eq!(
            update.expertise,
            Some(vec!["DSA".to_string(), "System Design".to_string(), "ML".to_string()])
        );
        assert!(update.rating.is_none());
    }

    #[test]
    fn mentor_edit_validates_ranges() {
        let request = UpdateMentorRequest {
            rating: Some(5.5),
            ..Default::default()
        };
        assert!(request.validate().is_err());

        let request = UpdateMentorRequest {
            sessions_count: Some(-1),
            ..Default::default()
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn college_request_requires_a_name() {
        let request = CollegeRequest {
            name: String::new(),
            location: None,
            category: None,
            description: None,
            image_url: None,
        };
        assert!(request.validate().is_err());
    }
}
