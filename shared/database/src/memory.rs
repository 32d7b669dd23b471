use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use campusmentor_common::{AppError, ApplicationStatus, UserRole};
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::conversation::{group_conversations, sort_messages, sort_summaries, ConversationKey};
use crate::models::*;
use crate::store::*;

/// Process-local store with the same semantics as the PostgreSQL store.
/// Every multi-step command runs under one write lock, which plays the part
/// of the transaction.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    profiles: HashMap<Uuid, Profile>,
    roles: HashMap<Uuid, UserRole>,
    role_events: Vec<RoleEvent>,
    colleges: BTreeMap<i64, College>,
    applications: BTreeMap<i64, MentorApplication>,
    mentors: HashMap<Uuid, Mentor>,
    bookings: Vec<Booking>,
    messages: Vec<Message>,
    summaries: HashMap<ConversationKey, ConversationSummary>,
    site_settings: SiteSettings,
    last_college_id: i64,
    last_application_id: i64,
    last_booking_id: i64,
    last_role_event_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryState {
    fn insert_user(&mut self, user: NewUser) -> Result<User, AppError> {
        if self.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        self.profiles.insert(
            created.id,
            Profile {
                user_id: created.id,
                full_name: user.full_name,
                phone: user.phone,
                bio: None,
                avatar_url: None,
                updated_at: now,
            },
        );
        self.set_role(created.id, UserRole::Junior, RoleChangeReason::SignUp, None);
        self.users.insert(created.id, created.clone());
        Ok(created)
    }

    /// Returns the user's actionable application if there is one.
    fn insert_application(&mut self, submission: ApplicationSubmission) -> MentorApplication {
        if let Some(existing) = self
            .applications
            .values()
            .find(|a| a.user_id == submission.user_id && a.status.is_actionable())
        {
            return existing.clone();
        }

        self.last_application_id += 1;
        let now = Utc::now();
        let application = MentorApplication {
            id: self.last_application_id,
            user_id: submission.user_id,
            full_name: submission.full_name,
            email: submission.email,
            phone: submission.phone,
            bio: submission.bio,
            college_name: submission.college_name,
            status: ApplicationStatus::Pending,
            reviewed_by: None,
            created_at: now,
            updated_at: now,
        };
        self.applications.insert(application.id, application.clone());
        application
    }

    fn display_name(&self, user_id: Uuid) -> Option<String> {
        self.profiles.get(&user_id).and_then(|p| p.full_name.clone())
    }

    fn listing(&self, mentor: &Mentor) -> MentorListing {
        let college_name = mentor
            .college_id
            .and_then(|id| self.colleges.get(&id))
            .map(|c| c.name.clone());
        MentorListing::from_parts(mentor, self.display_name(mentor.id), college_name)
    }

    fn booking_view(&self, booking: &Booking) -> BookingView {
        BookingView::from_parts(
            booking,
            self.display_name(booking.mentor_id),
            self.display_name(booking.student_id),
        )
    }

    /// Updates the role projection and appends the event. A no-op when the
    /// user already holds `to`.
    fn set_role(&mut self, user_id: Uuid, to: UserRole, reason: RoleChangeReason, actor_id: Option<Uuid>) -> bool {
        let from = self.roles.get(&user_id).copied();
        if from == Some(to) {
            return false;
        }
        self.roles.insert(user_id, to);
        self.last_role_event_id += 1;
        self.role_events.push(RoleEvent {
            id: self.last_role_event_id,
            user_id,
            from_role: from,
            to_role: to,
            reason: reason.as_str().to_string(),
            actor_id,
            created_at: Utc::now(),
        });
        true
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        self.inner.write().await.insert_user(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let state = self.inner.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.inner.read().await.users.get(&user_id).cloned())
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        Ok(self.inner.read().await.profiles.get(&user_id).cloned())
    }

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> Result<Profile, AppError> {
        let mut state = self.inner.write().await;
        let profile = state
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
        update.apply(profile);
        Ok(profile.clone())
    }

    async fn current_role(&self, user_id: Uuid) -> Result<Option<UserRole>, AppError> {
        Ok(self.inner.read().await.roles.get(&user_id).copied())
    }

    async fn role_history(&self, user_id: Uuid) -> Result<Vec<RoleEvent>, AppError> {
        let state = self.inner.read().await;
        Ok(state
            .role_events
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn promote_first_admin(&self, user_id: Uuid) -> Result<(), AppError> {
        let mut state = self.inner.write().await;
        if !state.users.contains_key(&user_id) {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        if state.roles.values().any(|r| *r == UserRole::Admin) {
            return Err(AppError::Conflict("An admin already exists".to_string()));
        }
        state.set_role(user_id, UserRole::Admin, RoleChangeReason::AdminBootstrap, Some(user_id));
        Ok(())
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn list_colleges(&self) -> Result<Vec<College>, AppError> {
        let state = self.inner.read().await;
        let mut colleges: Vec<College> = state.colleges.values().cloned().collect();
        colleges.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(colleges)
    }

    async fn get_college(&self, id: i64) -> Result<Option<College>, AppError> {
        Ok(self.inner.read().await.colleges.get(&id).cloned())
    }

    async fn create_college(&self, input: CollegeInput) -> Result<College, AppError> {
        input.validate()?;
        let mut state = self.inner.write().await;
        state.last_college_id += 1;
        let college = College {
            id: state.last_college_id,
            name: input.name,
            location: input.location,
            category: input.category,
            description: input.description,
            image_url: input.image_url,
            created_at: Utc::now(),
        };
        state.colleges.insert(college.id, college.clone());
        Ok(college)
    }

    async fn update_college(&self, id: i64, input: CollegeInput) -> Result<College, AppError> {
        input.validate()?;
        let mut state = self.inner.write().await;
        let college = state
            .colleges
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("College not found".to_string()))?;
        college.name = input.name;
        college.location = input.location;
        college.category = input.category;
        college.description = input.description;
        college.image_url = input.image_url;
        Ok(college.clone())
    }

    async fn delete_college(&self, id: i64) -> Result<(), AppError> {
        let mut state = self.inner.write().await;
        if state.colleges.remove(&id).is_none() {
            return Err(AppError::NotFound("College not found".to_string()));
        }
        // Mirrors ON DELETE SET NULL.
        for mentor in state.mentors.values_mut() {
            if mentor.college_id == Some(id) {
                mentor.college_id = None;
            }
        }
        Ok(())
    }

    async fn list_mentors(&self, verified_only: bool) -> Result<Vec<MentorListing>, AppError> {
        let state = self.inner.read().await;
        let mut mentors: Vec<MentorListing> = state
            .mentors
            .values()
            .filter(|m| !verified_only || m.is_verified)
            .map(|m| state.listing(m))
            .collect();
        mentors.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(mentors)
    }

    async fn get_mentor(&self, id: Uuid) -> Result<Option<MentorListing>, AppError> {
        let state = self.inner.read().await;
        Ok(state.mentors.get(&id).map(|m| state.listing(m)))
    }

    async fn update_mentor(&self, id: Uuid, update: MentorUpdate) -> Result<Mentor, AppError> {
        update.validate()?;
        let mut state = self.inner.write().await;
        if let Some(college_id) = update.college_id {
            if !state.colleges.contains_key(&college_id) {
                return Err(AppError::NotFound("College not found".to_string()));
            }
        }
        let mentor = state
            .mentors
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Mentor not found".to_string()))?;
        update.apply(mentor);
        Ok(mentor.clone())
    }

    async fn site_settings(&self) -> Result<SiteSettings, AppError> {
        Ok(self.inner.read().await.site_settings.clone())
    }

    async fn update_site_settings(&self, update: SiteSettingsUpdate) -> Result<SiteSettings, AppError> {
        let mut state = self.inner.write().await;
        update.apply(&mut state.site_settings);
        Ok(state.site_settings.clone())
    }

    async fn dashboard_counts(&self) -> Result<DashboardCounts, AppError> {
        let state = self.inner.read().await;
        Ok(DashboardCounts {
            colleges: state.colleges.len() as i64,
            mentors: state.mentors.len() as i64,
            pending_applications: state
                .applications
                .values()
                .filter(|a| a.status == ApplicationStatus::Pending)
                .count() as i64,
            bookings: state.bookings.len() as i64,
        })
    }
}

#[async_trait]
impl ApplicationStore for MemoryStore {
    async fn submit_application(&self, submission: ApplicationSubmission) -> Result<MentorApplication, AppError> {
        submission.validate()?;
        let mut state = self.inner.write().await;
        if !state.users.contains_key(&submission.user_id) {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(state.insert_application(submission))
    }

    async fn register_mentor(&self, user: NewUser, sign_up: MentorSignUp) -> Result<(User, MentorApplication), AppError> {
        sign_up.validate()?;
        let mut state = self.inner.write().await;
        let created = state.insert_user(user)?;
        let application = state.insert_application(sign_up.submission(&created));
        Ok((created, application))
    }

    async fn get_application(&self, id: i64) -> Result<Option<MentorApplication>, AppError> {
        Ok(self.inner.read().await.applications.get(&id).cloned())
    }

    async fn list_applications(&self) -> Result<Vec<MentorApplication>, AppError> {
        let state = self.inner.read().await;
        let mut applications: Vec<MentorApplication> = state.applications.values().cloned().collect();
        applications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(applications)
    }

    async fn applications_for_user(&self, user_id: Uuid) -> Result<Vec<MentorApplication>, AppError> {
        let state = self.inner.read().await;
        let mut applications: Vec<MentorApplication> = state
            .applications
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        applications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(applications)
    }

    async fn approve_application(&self, approval: Approval) -> Result<ApprovalOutcome, AppError> {
        approval.validate()?;
        let mut state = self.inner.write().await;

        let application = state
            .applications
            .get(&approval.application_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;
        let status = application.status.approve()?;
        if !state.colleges.contains_key(&approval.college_id) {
            return Err(AppError::NotFound("College not found".to_string()));
        }

        let now = Utc::now();
        let user_id = application.user_id;
        let mentor = state
            .mentors
            .entry(user_id)
            .and_modify(|m| {
                m.college_id = Some(approval.college_id);
                m.price_per_session = approval.fee_per_session;
                m.is_verified = true;
                m.updated_at = now;
            })
            .or_insert_with(|| Mentor {
                id: user_id,
                college_id: Some(approval.college_id),
                branch: Some(UNSPECIFIED.to_string()),
                year: Some(UNSPECIFIED.to_string()),
                rating: DEFAULT_MENTOR_RATING,
                sessions_count: 0,
                price_per_session: approval.fee_per_session,
                expertise: Vec::new(),
                is_verified: true,
                created_at: now,
                updated_at: now,
            })
            .clone();

        let role_changed = state.set_role(
            user_id,
            UserRole::Senior,
            RoleChangeReason::ApplicationApproved,
            approval.actor_id,
        );

        let application = match state.applications.get_mut(&approval.application_id) {
            Some(stored) => {
                stored.status = status;
                stored.reviewed_by = approval.actor_id;
                stored.updated_at = now;
                stored.clone()
            }
            None => return Err(AppError::Internal("Application vanished during approval".to_string())),
        };

        Ok(ApprovalOutcome {
            application,
            mentor,
            role_changed,
        })
    }

    async fn reject_application(&self, id: i64, actor_id: Option<Uuid>) -> Result<MentorApplication, AppError> {
        let mut state = self.inner.write().await;
        let application = state
            .applications
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Application not found".to_string()))?;
        application.status = application.status.reject()?;
        application.reviewed_by = actor_id;
        application.updated_at = Utc::now();
        Ok(application.clone())
    }

    async fn remove_mentor(&self, mentor_id: Uuid, actor_id: Option<Uuid>) -> Result<RemovedMentor, AppError> {
        let mut state = self.inner.write().await;
        if !state.mentors.contains_key(&mentor_id) {
            return Err(AppError::NotFound("Mentor not found".to_string()));
        }

        let previous_role = state.roles.get(&mentor_id).copied();
        state.set_role(mentor_id, UserRole::Junior, RoleChangeReason::MentorRemoved, actor_id);

        let before = state.applications.len();
        state.applications.retain(|_, a| a.user_id != mentor_id);
        let applications_removed = (before - state.applications.len()) as u64;

        state.mentors.remove(&mentor_id);

        Ok(RemovedMentor {
            mentor_id,
            applications_removed,
            previous_role,
        })
    }

    async fn reconciliation_report(&self) -> Result<ReconciliationReport, AppError> {
        let state = self.inner.read().await;
        let report = ReconciliationReport {
            approved_without_mentor: state
                .applications
                .values()
                .filter(|a| a.status == ApplicationStatus::Approved && !state.mentors.contains_key(&a.user_id))
                .map(|a| a.user_id)
                .collect(),
            mentors_without_senior_role: state
                .mentors
                .keys()
                .filter(|id| state.roles.get(*id) != Some(&UserRole::Senior))
                .copied()
                .collect(),
            seniors_without_mentor: state
                .roles
                .iter()
                .filter(|(id, role)| **role == UserRole::Senior && !state.mentors.contains_key(*id))
                .map(|(id, _)| *id)
                .collect(),
        };
        Ok(report.sorted())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn create_booking(&self, booking: NewBooking) -> Result<Booking, AppError> {
        booking.validate()?;
        let mut state = self.inner.write().await;

        if !state.users.contains_key(&booking.student_id) {
            return Err(AppError::NotFound("Student not found".to_string()));
        }
        let price = match state.mentors.get(&booking.mentor_id) {
            Some(mentor) if mentor.is_verified => mentor.price_per_session,
            Some(_) => return Err(AppError::Validation("Mentor is not verified".to_string())),
            None => return Err(AppError::NotFound("Mentor not found".to_string())),
        };

        if booking.exclusive_slot
            && state
                .bookings
                .iter()
                .any(|b| b.mentor_id == booking.mentor_id && b.session_time == booking.session_time)
        {
            return Err(AppError::Conflict("This slot is already booked".to_string()));
        }

        state.last_booking_id += 1;
        let created = Booking {
            id: state.last_booking_id,
            mentor_id: booking.mentor_id,
            student_id: booking.student_id,
            session_time: booking.session_time,
            duration_minutes: booking.duration_minutes,
            status: BOOKING_STATUS_CONFIRMED.to_string(),
            amount_paid: price,
            created_at: Utc::now(),
        };
        state.bookings.push(created.clone());
        Ok(created)
    }

    async fn bookings_for_mentor(&self, mentor_id: Uuid) -> Result<Vec<BookingView>, AppError> {
        let state = self.inner.read().await;
        let mut views: Vec<BookingView> = state
            .bookings
            .iter()
            .filter(|b| b.mentor_id == mentor_id)
            .map(|b| state.booking_view(b))
            .collect();
        views.sort_by(|a, b| a.session_time.cmp(&b.session_time).then(a.id.cmp(&b.id)));
        Ok(views)
    }

    async fn bookings_for_student(&self, student_id: Uuid) -> Result<Vec<BookingView>, AppError> {
        let state = self.inner.read().await;
        let mut views: Vec<BookingView> = state
            .bookings
            .iter()
            .filter(|b| b.student_id == student_id)
            .map(|b| state.booking_view(b))
            .collect();
        views.sort_by(|a, b| a.session_time.cmp(&b.session_time).then(a.id.cmp(&b.id)));
        Ok(views)
    }

    async fn all_bookings(&self) -> Result<Vec<BookingView>, AppError> {
        let state = self.inner.read().await;
        let mut views: Vec<BookingView> = state.bookings.iter().map(|b| state.booking_view(b)).collect();
        views.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(views)
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn insert_message(&self, message: NewMessage) -> Result<Message, AppError> {
        message.validate()?;
        let mut state = self.inner.write().await;
        if !state.users.contains_key(&message.receiver_id) {
            return Err(AppError::NotFound("Recipient not found".to_string()));
        }

        // Keep the log in append order when the clock does not advance
        let now = Utc::now();
        let created_at = match state.messages.last() {
            Some(last) if last.created_at >= now => last.created_at + chrono::Duration::microseconds(1),
            _ => now,
        };

        let stored = Message {
            id: Uuid::new_v4(),
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content,
            created_at,
        };

        let key = ConversationKey::of(&stored);
        state
            .summaries
            .entry(key)
            .and_modify(|s| {
                s.message_count += 1;
                if stored.created_at > s.last_message_at {
                    s.last_message_at = stored.created_at;
                }
            })
            .or_insert_with(|| ConversationSummary {
                participant_a: key.low,
                participant_b: key.high,
                last_message_at: stored.created_at,
                message_count: 1,
            });
        state.messages.push(stored.clone());
        Ok(stored)
    }

    async fn conversation(&self, user_id: Uuid, other_user_id: Uuid) -> Result<Vec<Message>, AppError> {
        let key = ConversationKey::new(user_id, other_user_id);
        let state = self.inner.read().await;
        let mut messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| ConversationKey::of(m) == key)
            .cloned()
            .collect();
        sort_messages(&mut messages);
        Ok(messages)
    }

    async fn conversation_summaries(&self) -> Result<Vec<ConversationSummary>, AppError> {
        let state = self.inner.read().await;
        let mut summaries: Vec<ConversationSummary> = state.summaries.values().cloned().collect();
        sort_summaries(&mut summaries);
        Ok(summaries)
    }

    async fn conversations_for_user(&self, user_id: Uuid) -> Result<Vec<ConversationSummary>, AppError> {
        let state = self.inner.read().await;
        let mut summaries: Vec<ConversationSummary> = state
            .summaries
            .iter()
            .filter(|(key, _)| key.contains(user_id))
            .map(|(_, s)| s.clone())
            .collect();
        sort_summaries(&mut summaries);
        Ok(summaries)
    }

    async fn rebuild_conversation_summaries(&self) -> Result<usize, AppError> {
        let mut state = self.inner.write().await;
        let rebuilt = group_conversations(&state.messages);
        state.summaries = rebuilt
            .into_iter()
            .map(|s| (ConversationKey::new(s.participant_a, s.participant_b), s))
            .collect();
        Ok(state.summaries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::Decimal;

    async fn user(store: &MemoryStore, name: &str) -> Uuid {
        store
            .create_user(NewUser {
                email: format!("{}@example.com", name.to_lowercase()),
                password_hash: "hash".to_string(),
                full_name: Some(name.to_string()),
                phone: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn college(store: &MemoryStore) -> i64 {
        store
            .create_college(CollegeInput {
                name: "IIT Delhi".to_string(),
                location: Some("Delhi".to_string()),
                category: Some("Engineering".to_string()),
                description: None,
                image_url: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn apply(store: &MemoryStore, user_id: Uuid) -> MentorApplication {
        store
            .submit_application(ApplicationSubmission {
                user_id,
                full_name: "Applicant".to_string(),
                email: "applicant@example.com".to_string(),
                phone: Some("9999999999".to_string()),
                bio: Some("Third year CSE".to_string()),
                college_name: Some("IIT Delhi".to_string()),
            })
            .await
            .unwrap()
    }

    fn approval(application_id: i64, college_id: i64, fee: i64) -> Approval {
        Approval {
            application_id,
            college_id,
            fee_per_session: Decimal::new(fee, 0),
            actor_id: None,
        }
    }

    #[tokio::test]
    async fn approval_lists_a_verified_mentor_with_the_fee() {
        let store = MemoryStore::new();
        let candidate = user(&store, "Ravi").await;
        let college_id = college(&store).await;
        let application = apply(&store, candidate).await;

        let outcome = store.approve_application(approval(application.id, college_id, 499)).await.unwrap();
        assert_eq!(outcome.application.status, ApplicationStatus::Approved);
        assert!(outcome.role_changed);

        let mentors = store.list_mentors(true).await.unwrap();
        let listed = mentors.iter().find(|m| m.id == candidate).unwrap();
        assert!(listed.is_verified);
        assert_eq!(listed.price_per_session, Decimal::new(499, 0));
        assert_eq!(listed.rating, DEFAULT_MENTOR_RATING);
        assert_eq!(listed.college_name.as_deref(), Some("IIT Delhi"));
        assert_eq!(store.current_role(candidate).await.unwrap(), Some(UserRole::Senior));
    }

    #[tokio::test]
    async fn reapproval_updates_attributes_without_a_second_role_event() {
        let store = MemoryStore::new();
        let candidate = user(&store, "Meera").await;
        let college_id = college(&store).await;
        let application = apply(&store, candidate).await;

        store.approve_application(approval(application.id, college_id, 300)).await.unwrap();
        let second = store.approve_application(approval(application.id, college_id, 450)).await.unwrap();

        assert!(!second.role_changed);
        assert_eq!(second.mentor.price_per_session, Decimal::new(450, 0));
        assert_eq!(store.role_history(candidate).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn approval_requires_an_existing_college() {
        let store = MemoryStore::new();
        let candidate = user(&store, "Kabir").await;
        let application = apply(&store, candidate).await;

        let err = store.approve_application(approval(application.id, 42, 100)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(
            store.get_application(application.id).await.unwrap().unwrap().status,
            ApplicationStatus::Pending
        );
        assert!(store.get_mentor(candidate).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejected_applications_cannot_be_approved() {
        let store = MemoryStore::new();
        let candidate = user(&store, "Isha").await;
        let college_id = college(&store).await;
        let application = apply(&store, candidate).await;

        let rejected = store.reject_application(application.id, None).await.unwrap();
        assert_eq!(rejected.status, ApplicationStatus::Rejected);

        let err = store.approve_application(approval(application.id, college_id, 100)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(store.list_mentors(false).await.unwrap().is_empty());
        assert_eq!(store.current_role(candidate).await.unwrap(), Some(UserRole::Junior));

        // A fresh application is allowed after rejection.
        let again = apply(&store, candidate).await;
        assert_ne!(again.id, application.id);
        assert_eq!(again.status, ApplicationStatus::Pending);
    }

    #[tokio::test]
    async fn mentor_sign_up_is_all_or_nothing() {
        let store = MemoryStore::new();
        let new_user = |email: &str| NewUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            full_name: Some("Kiran".to_string()),
            phone: None,
        };
        let sign_up = |full_name: &str| MentorSignUp {
            full_name: full_name.to_string(),
            phone: None,
            bio: None,
            college_name: Some(UNSPECIFIED.to_string()),
        };

        let err = store.register_mentor(new_user("kiran@example.com"), sign_up("  ")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.find_user_by_email("kiran@example.com").await.unwrap().is_none());

        let (user, application) = store
            .register_mentor(new_user("kiran@example.com"), sign_up("Kiran"))
            .await
            .unwrap();
        assert_eq!(application.user_id, user.id);
        assert_eq!(application.email, "kiran@example.com");
        assert_eq!(store.current_role(user.id).await.unwrap(), Some(UserRole::Junior));

        let err = store.register_mentor(new_user("kiran@example.com"), sign_up("Kiran")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.list_applications().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_submission_returns_the_existing_application() {
        let store = MemoryStore::new();
        let candidate = user(&store, "Dev").await;

        let first = apply(&store, candidate).await;
        let second = apply(&store, candidate).await;
        assert_eq!(first.id, second.id);
        assert_eq!(store.applications_for_user(candidate).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn removing_a_mentor_restores_junior_and_clears_rows() {
        let store = MemoryStore::new();
        let candidate = user(&store, "Tara").await;
        let college_id = college(&store).await;
        let application = apply(&store, candidate).await;
        store.approve_application(approval(application.id, college_id, 250)).await.unwrap();

        let removed = store.remove_mentor(candidate, None).await.unwrap();
        assert_eq!(removed.applications_removed, 1);
        assert_eq!(removed.previous_role, Some(UserRole::Senior));
        assert_eq!(store.current_role(candidate).await.unwrap(), Some(UserRole::Junior));
        assert!(store.get_mentor(candidate).await.unwrap().is_none());
        assert!(store.applications_for_user(candidate).await.unwrap().is_empty());
        assert!(store.reconciliation_report().await.unwrap().is_clean());

        let history: Vec<UserRole> = store
            .role_history(candidate)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.to_role)
            .collect();
        assert_eq!(history, vec![UserRole::Junior, UserRole::Senior, UserRole::Junior]);
    }

    #[tokio::test]
    async fn booking_amount_is_a_snapshot_of_the_price() {
        let store = MemoryStore::new();
        let mentor = user(&store, "Anil").await;
        let student = user(&store, "Sana").await;
        let college_id = college(&store).await;
        let application = apply(&store, mentor).await;
        store.approve_application(approval(application.id, college_id, 500)).await.unwrap();

        let booking = store
            .create_booking(NewBooking {
                student_id: student,
                mentor_id: mentor,
                session_time: Utc::now() + Duration::days(1),
                duration_minutes: 15,
                exclusive_slot: false,
            })
            .await
            .unwrap();
        assert_eq!(booking.status, BOOKING_STATUS_CONFIRMED);

        store
            .update_mentor(mentor, MentorUpdate { price_per_session: Some(Decimal::new(900, 0)), ..Default::default() })
            .await
            .unwrap();

        let views = store.bookings_for_student(student).await.unwrap();
        assert_eq!(views[0].amount_paid, Decimal::new(500, 0));
        assert_eq!(views[0].mentor_name.as_deref(), Some("Anil"));
    }

    #[tokio::test]
    async fn exclusive_slots_refuse_a_second_booking() {
        let store = MemoryStore::new();
        let mentor = user(&store, "Nila").await;
        let student = user(&store, "Om").await;
        let college_id = college(&store).await;
        let application = apply(&store, mentor).await;
        store.approve_application(approval(application.id, college_id, 100)).await.unwrap();

        let slot = Utc::now() + Duration::hours(5);
        let request = |exclusive_slot| NewBooking {
            student_id: student,
            mentor_id: mentor,
            session_time: slot,
            duration_minutes: 15,
            exclusive_slot,
        };

        store.create_booking(request(true)).await.unwrap();
        store.create_booking(request(false)).await.unwrap();
        let err = store.create_booking(request(true)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn unverified_mentors_cannot_be_booked() {
        let store = MemoryStore::new();
        let mentor = user(&store, "Ritu").await;
        let student = user(&store, "Jay").await;
        let college_id = college(&store).await;
        let application = apply(&store, mentor).await;
        store.approve_application(approval(application.id, college_id, 100)).await.unwrap();
        store
            .update_mentor(mentor, MentorUpdate { is_verified: Some(false), ..Default::default() })
            .await
            .unwrap();

        let err = store
            .create_booking(NewBooking {
                student_id: student,
                mentor_id: mentor,
                session_time: Utc::now(),
                duration_minutes: 15,
                exclusive_slot: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.list_mentors(true).await.unwrap().is_empty());
        assert_eq!(store.list_mentors(false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn conversations_are_symmetric_and_summarised() {
        let store = MemoryStore::new();
        let a = user(&store, "Alpha").await;
        let b = user(&store, "Beta").await;

        for (sender, receiver, text) in [(a, b, "hi"), (b, a, "hello"), (a, b, "booked you")] {
            store
                .insert_message(NewMessage { sender_id: sender, receiver_id: receiver, content: text.to_string() })
                .await
                .unwrap();
        }

        let forward = store.conversation(a, b).await.unwrap();
        let backward = store.conversation(b, a).await.unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 3);

        let summaries = store.conversations_for_user(b).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].message_count, 3);
        assert_eq!(summaries[0].last_message_at, forward[2].created_at);

        let before = store.conversation_summaries().await.unwrap();
        assert_eq!(store.rebuild_conversation_summaries().await.unwrap(), 1);
        assert_eq!(store.conversation_summaries().await.unwrap(), before);
    }

    #[tokio::test]
    async fn only_the_first_admin_can_bootstrap() {
        let store = MemoryStore::new();
        let first = user(&store, "Root").await;
        let second = user(&store, "Other").await;

        store.promote_first_admin(first).await.unwrap();
        assert_eq!(store.current_role(first).await.unwrap(), Some(UserRole::Admin));

        let err = store.promote_first_admin(second).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn dashboard_counts_track_rows() {
        let store = MemoryStore::new();
        let candidate = user(&store, "Lina").await;
        college(&store).await;
        apply(&store, candidate).await;

        let counts = store.dashboard_counts().await.unwrap();
        assert_eq!(
            counts,
            DashboardCounts { colleges: 1, mentors: 0, pending_applications: 1, bookings: 0 }
        );
    }
}
