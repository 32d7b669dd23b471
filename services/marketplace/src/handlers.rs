use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use uuid::Uuid;
use validator::Validate;

use campusmentor_auth::{AdminUser, AuthUser};
use campusmentor_common::{ApiResponse, AppError};
use campusmentor_database::{
    schedule::TIME_SLOTS, ApprovalOutcome, Booking, BookingView, College, DashboardCounts, Mentor,
    MentorApplication, MentorListing, ReconciliationReport, RemovedMentor, SiteSettings,
    SiteSettingsUpdate,
};

use crate::{
    access::MentorUser,
    admin::AdminService,
    applications::ApplicationService,
    bookings::BookingService,
    directory::DirectoryService,
    models::*,
    AppState,
};

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

// Health check
pub async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::success("Marketplace service is healthy".to_string()))
}

// Directory handlers
pub async fn list_colleges(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<College>> {
    let colleges = DirectoryService::new(&state).list_colleges(query.q.as_deref()).await?;
    Ok(Json(ApiResponse::success(colleges)))
}

pub async fn get_college(State(state): State<AppState>, Path(college_id): Path<i64>) -> ApiResult<College> {
    let college = DirectoryService::new(&state).get_college(college_id).await?;
    Ok(Json(ApiResponse::success(college)))
}

pub async fn list_mentors(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<MentorListing>> {
    let mentors = DirectoryService::new(&state).list_mentors(query.q.as_deref()).await?;
    Ok(Json(ApiResponse::success(mentors)))
}

pub async fn get_mentor(State(state): State<AppState>, Path(mentor_id): Path<Uuid>) -> ApiResult<MentorListing> {
    let mentor = DirectoryService::new(&state).get_mentor(mentor_id).await?;
    Ok(Json(ApiResponse::success(mentor)))
}

pub async fn get_site_settings(State(state): State<AppState>) -> ApiResult<SiteSettings> {
    let settings = DirectoryService::new(&state).site_settings().await?;
    Ok(Json(ApiResponse::success(settings)))
}

pub async fn time_slots(State(state): State<AppState>) -> Json<ApiResponse<TimeSlotsResponse>> {
    Json(ApiResponse::success(TimeSlotsResponse {
        slots: TIME_SLOTS.iter().map(|s| s.to_string()).collect(),
        default_duration_minutes: state.config.booking.default_duration_minutes,
    }))
}

// Application handlers
pub async fn submit_application(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ApplicationRequest>,
) -> ApiResult<MentorApplication> {
    request.validate()?;
    let application = ApplicationService::new(&state).submit(&user, request).await?;
    Ok(Json(ApiResponse::success(application)))
}

pub async fn my_applications(State(state): State<AppState>, user: AuthUser) -> ApiResult<Vec<MentorApplication>> {
    let applications = ApplicationService::new(&state)
        .applications_for_user(user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(applications)))
}

// Booking handlers
pub async fn create_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<BookingRequest>,
) -> ApiResult<Booking> {
    request.validate()?;
    let booking = BookingService::new(&state).create_booking(user.user_id, request).await?;
    Ok(Json(ApiResponse::success(booking)))
}

pub async fn my_sessions(State(state): State<AppState>, user: AuthUser) -> ApiResult<StudentSessions> {
    let sessions = BookingService::new(&state).student_sessions(user.user_id).await?;
    Ok(Json(ApiResponse::success(sessions)))
}

// Mentor area
pub async fn mentor_bookings(State(state): State<AppState>, mentor: MentorUser) -> ApiResult<Vec<BookingView>> {
    let bookings = BookingService::new(&state).mentor_bookings(mentor.user.user_id).await?;
    Ok(Json(ApiResponse::success(bookings)))
}

pub async fn mentor_dashboard(State(state): State<AppState>, mentor: MentorUser) -> ApiResult<MentorDashboard> {
    let dashboard = BookingService::new(&state).mentor_dashboard(mentor.mentor).await?;
    Ok(Json(ApiResponse::success(dashboard)))
}

// Admin handlers
pub async fn admin_dashboard(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<DashboardCounts> {
    let counts = AdminService::new(&state).dashboard_counts().await?;
    Ok(Json(ApiResponse::success(counts)))
}

pub async fn admin_create_college(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<CollegeRequest>,
) -> ApiResult<College> {
    request.validate()?;
    let college = DirectoryService::new(&state).create_college(request).await?;
    Ok(Json(ApiResponse::success(college)))
}

pub async fn admin_update_college(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(college_id): Path<i64>,
    Json(request): Json<CollegeRequest>,
) -> ApiResult<College> {
    request.validate()?;
    let college = DirectoryService::new(&state).update_college(college_id, request).await?;
    Ok(Json(ApiResponse::success(college)))
}

pub async fn admin_delete_college(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(college_id): Path<i64>,
) -> ApiResult<MessageResponse> {
    DirectoryService::new(&state).delete_college(college_id).await?;
    Ok(Json(ApiResponse::success(MessageResponse {
        message: "College deleted".to_string(),
    })))
}

pub async fn admin_list_mentors(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<MentorListing>> {
    let mentors = DirectoryService::new(&state).admin_list_mentors(query.q.as_deref()).await?;
    Ok(Json(ApiResponse::success(mentors)))
}

pub async fn admin_update_mentor(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(mentor_id): Path<Uuid>,
    Json(request): Json<UpdateMentorRequest>,
) -> ApiResult<Mentor> {
    request.validate()?;
    let mentor = DirectoryService::new(&state).update_mentor(mentor_id, request).await?;
    Ok(Json(ApiResponse::success(mentor)))
}

pub async fn admin_remove_mentor(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(mentor_id): Path<Uuid>,
) -> ApiResult<RemovedMentor> {
    let removed = ApplicationService::new(&state)
        .remove_mentor(mentor_id, admin.user_id)
        .await?;
    Ok(Json(ApiResponse::success(removed)))
}

pub async fn admin_list_applications(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<ApplicationList> {
    let applications = ApplicationService::new(&state).list().await?;
    Ok(Json(ApiResponse::success(ApplicationList { applications })))
}

pub async fn admin_approve_application(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(application_id): Path<i64>,
    Json(request): Json<ApproveRequest>,
) -> ApiResult<ApprovalOutcome> {
    let outcome = ApplicationService::new(&state)
        .approve(application_id, request.college_id, request.fee_per_session, admin.user_id)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

pub async fn admin_reject_application(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(application_id): Path<i64>,
) -> ApiResult<MentorApplication> {
    let application = ApplicationService::new(&state)
        .reject(application_id, admin.user_id)
        .await?;
    Ok(Json(ApiResponse::success(application)))
}

pub async fn admin_all_bookings(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Vec<BookingView>> {
    let bookings = BookingService::new(&state).all_bookings().await?;
    Ok(Json(ApiResponse::success(bookings)))
}

pub async fn admin_reconciliation(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<ReconciliationReport> {
    let report = ApplicationService::new(&state).reconciliation().await?;
    Ok(Json(ApiResponse::success(report)))
}

pub async fn admin_role_history(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult<RoleHistoryResponse> {
    let history = AdminService::new(&state).role_history(user_id).await?;
    Ok(Json(ApiResponse::success(history)))
}

pub async fn admin_update_site_settings(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(update): Json<SiteSettingsUpdate>,
) -> ApiResult<SiteSettings> {
    let settings = DirectoryService::new(&state).update_site_settings(update).await?;
    Ok(Json(ApiResponse::success(settings)))
}
