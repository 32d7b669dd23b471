use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::BookingView;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingStats {
    pub total_sessions: usize,
    pub total_earnings: Decimal,
    pub upcoming_sessions: usize,
}

impl BookingStats {
    pub fn from_bookings(bookings: &[BookingView], now: DateTime<Utc>) -> Self {
        Self {
            total_sessions: bookings.len(),
            total_earnings: bookings.iter().map(|b| b.amount_paid).sum(),
            upcoming_sessions: bookings.iter().filter(|b| b.session_time > now).count(),
        }
    }
}

/// Someone the caller has a booking with, used as a chat partner list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Counterpart {
    pub user_id: Uuid,
    pub full_name: Option<String>,
}

/// Distinct students of a mentor's bookings, first booking first.
pub fn distinct_students(bookings: &[BookingView]) -> Vec<Counterpart> {
    distinct(bookings.iter().map(|b| (b.student_id, b.student_name.clone())))
}

/// Distinct mentors of a student's bookings, first booking first.
pub fn distinct_mentors(bookings: &[BookingView]) -> Vec<Counterpart> {
    distinct(bookings.iter().map(|b| (b.mentor_id, b.mentor_name.clone())))
}

fn distinct(pairs: impl Iterator<Item = (Uuid, Option<String>)>) -> Vec<Counterpart> {
    let mut seen = std::collections::HashSet::new();
    pairs
        .filter(|(id, _)| seen.insert(*id))
        .map(|(user_id, full_name)| Counterpart { user_id, full_name })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn booking(student: Uuid, amount: i64, offset_hours: i64) -> BookingView {
        BookingView {
            id: 0,
            mentor_id: Uuid::nil(),
            mentor_name: Some("Mentor".to_string()),
            student_id: student,
            student_name: None,
            session_time: Utc::now() + Duration::hours(offset_hours),
            duration_minutes: 15,
            status: "confirmed".to_string(),
            amount_paid: Decimal::new(amount, 0),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn earnings_sum_all_bookings_and_upcoming_counts_future_only() {
        let student = Uuid::new_v4();
        let bookings = vec![booking(student, 300, -2), booking(student, 500, 3), booking(Uuid::new_v4(), 200, 24)];

        let stats = BookingStats::from_bookings(&bookings, Utc::now());
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.total_earnings, Decimal::new(1000, 0));
        assert_eq!(stats.upcoming_sessions, 2);
    }

    #[test]
    fn counterparts_are_deduplicated_in_first_seen_order() {
        let (first, second) = (Uuid::new_v4(), Uuid::new_v4());
        let bookings = vec![booking(first, 1, 1), booking(second, 1, 2), booking(first, 1, 3)];

        let students: Vec<Uuid> = distinct_students(&bookings).into_iter().map(|c| c.user_id).collect();
        assert_eq!(students, vec![first, second]);
        assert_eq!(distinct_mentors(&bookings).len(), 1);
    }
}
