use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use campusmentor_common::AppError;
use campusmentor_database::{
    schedule::resolve_session_time,
    stats::{distinct_mentors, distinct_students},
    Booking, BookingStats, BookingView, MentorListing, NewBooking, Store,
};

use crate::config::BookingConfig;
use crate::models::{BookingRequest, MentorDashboard, StudentSessions};
use crate::AppState;

/// The booking ledger. Payment is a mock that always succeeds, so a booking
/// is confirmed as soon as it is written.
pub struct BookingService {
    store: Arc<dyn Store>,
    config: BookingConfig,
}

impl BookingService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            config: state.config.booking.clone(),
        }
    }

    /// An explicit `session_time` wins; otherwise the date and slot label are
    /// read in the configured offset.
    pub fn resolve_time(&self, request: &BookingRequest) -> Result<DateTime<Utc>, AppError> {
        if let Some(session_time) = request.session_time {
            return Ok(session_time);
        }

        match (request.date, request.time_slot.as_deref()) {
            (Some(date), Some(slot)) => resolve_session_time(date, slot, self.config.utc_offset()?),
            _ => Err(AppError::Validation(
                "Either session_time or both date and time_slot are required".to_string(),
            )),
        }
    }

    pub async fn create_booking(&self, student_id: Uuid, request: BookingRequest) -> Result<Booking, AppError> {
        let session_time = self.resolve_time(&request)?;
        if session_time <= Utc::now() {
            return Err(AppError::Validation("Session time must be in the future".to_string()));
        }

        let booking = NewBooking {
            student_id,
            mentor_id: request.mentor_id,
            session_time,
            duration_minutes: request
                .duration_minutes
                .unwrap_or(self.config.default_duration_minutes),
            exclusive_slot: self.config.exclusive_slots,
        };
        booking.validate()?;

        let booking = self.store.create_booking(booking).await?;
        tracing::info!(
            booking_id = booking.id,
            mentor_id = %booking.mentor_id,
            student_id = %booking.student_id,
            amount_paid = %booking.amount_paid,
            "Session booked"
        );
        Ok(booking)
    }

    pub async fn student_sessions(&self, student_id: Uuid) -> Result<StudentSessions, AppError> {
        let bookings = self.store.bookings_for_student(student_id).await?;
        let mentors = distinct_mentors(&bookings);
        Ok(StudentSessions { bookings, mentors })
    }

    pub async fn mentor_bookings(&self, mentor_id: Uuid) -> Result<Vec<BookingView>, AppError> {
        self.store.bookings_for_mentor(mentor_id).await
    }

    pub async fn mentor_dashboard(&self, mentor: MentorListing) -> Result<MentorDashboard, AppError> {
        let bookings = self.store.bookings_for_mentor(mentor.id).await?;
        Ok(MentorDashboard {
            stats: BookingStats::from_bookings(&bookings, Utc::now()),
            students: distinct_students(&bookings),
            mentor,
            bookings,
        })
    }

    /// Every booking, newest first.
    pub async fn all_bookings(&self) -> Result<Vec<BookingView>, AppError> {
        self.store.all_bookings().await
    }
}
