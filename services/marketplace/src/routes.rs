use axum::{
    routing::{get, post, put},
    Router,
};

use crate::{handlers, AppState};

pub fn create_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))

        // Public directory
        .route("/colleges", get(handlers::list_colleges))
        .route("/colleges/:college_id", get(handlers::get_college))
        .route("/mentors", get(handlers::list_mentors))
        .route("/mentors/:mentor_id", get(handlers::get_mentor))
        .route("/site-settings", get(handlers::get_site_settings))
        .route("/time-slots", get(handlers::time_slots))

        // Mentor applications
        .route("/applications", post(handlers::submit_application))
        .route("/applications/mine", get(handlers::my_applications))

        // Bookings
        .route("/bookings", post(handlers::create_booking))
        .route("/bookings/mine", get(handlers::my_sessions))

        // Mentor area
        .route("/mentor/bookings", get(handlers::mentor_bookings))
        .route("/mentor/dashboard", get(handlers::mentor_dashboard))

        // Admin console
        .route("/admin/dashboard", get(handlers::admin_dashboard))
        .route("/admin/colleges", post(handlers::admin_create_college))
        .route(
            "/admin/colleges/:college_id",
            put(handlers::admin_update_college).delete(handlers::admin_delete_college),
        )
        .route("/admin/mentors", get(handlers::admin_list_mentors))
        .route(
            "/admin/mentors/:mentor_id",
            put(handlers::admin_update_mentor).delete(handlers::admin_remove_mentor),
        )
        .route("/admin/applications", get(handlers::admin_list_applications))
        .route("/admin/applications/:application_id/approve", post(handlers::admin_approve_application))
        .route("/admin/applications/:application_id/reject", post(handlers::admin_reject_application))
        .route("/admin/bookings", get(handlers::admin_all_bookings))
        .route("/admin/reconciliation", get(handlers::admin_reconciliation))
        .route("/admin/users/:user_id/roles", get(handlers::admin_role_history))
        .route("/admin/site-settings", put(handlers::admin_update_site_settings))
}
