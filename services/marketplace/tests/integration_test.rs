use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use axum_test::TestServer;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use uuid::Uuid;

use campusmentor_auth::JwtService;
use campusmentor_common::{ApiResponse, StorageBackend, UserRole};
use campusmentor_database::{
    ApplicationStore, Booking, College, IdentityStore, MemoryStore, MentorApplication, MentorListing, NewUser,
};
use campusmentor_marketplace::{build_app, AppConfig, AppState};

struct TestApp {
    server: TestServer,
    store: Arc<MemoryStore>,
    jwt: JwtService,
}

struct Account {
    id: Uuid,
    token: String,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(|_| {})
    }

    fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let mut config = AppConfig::from_env();
        config.storage = StorageBackend::Memory;
        config.redis.enabled = false;
        tweak(&mut config);

        let store = Arc::new(MemoryStore::new());
        let jwt = JwtService::new(&config.jwt);
        let state = AppState {
            store: store.clone(),
            redis_service: None,
            jwt_service: jwt.clone(),
            config,
        };

        Self {
            server: TestServer::new(build_app(state)).unwrap(),
            store,
            jwt,
        }
    }

    async fn account(&self, email: &str, full_name: &str) -> Account {
        let user = self
            .store
            .create_user(NewUser {
                email: email.to_string(),
                password_hash: "not-used".to_string(),
                full_name: Some(full_name.to_string()),
                phone: None,
            })
            .await
            .unwrap();
        let token = self.jwt.issue(user.id, email, UserRole::Junior).unwrap();
        Account { id: user.id, token }
    }

    async fn admin(&self) -> Account {
        let admin = self.account("admin@example.com", "Admin").await;
        self.store.promote_first_admin(admin.id).await.unwrap();
        admin
    }
}

fn bearer(account: &Account) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", account.token)).unwrap()
}

async fn create_college(app: &TestApp, admin: &Account, name: &str, location: &str) -> College {
    let response = app
        .server
        .post("/admin/colleges")
        .add_header(AUTHORIZATION, bearer(admin))
        .json(&json!({ "name": name, "location": location, "category": "Engineering" }))
        .await;
    response.assert_status_ok();
    response.json::<ApiResponse<College>>().data.unwrap()
}

async fn submit_application(app: &TestApp, candidate: &Account) -> MentorApplication {
    let response = app
        .server
        .post("/applications")
        .add_header(AUTHORIZATION, bearer(candidate))
        .json(&json!({ "full_name": "Vikram Senior", "phone": "99999", "college_name": "IIT Delhi" }))
        .await;
    response.assert_status_ok();
    response.json::<ApiResponse<MentorApplication>>().data.unwrap()
}

async fn approve(app: &TestApp, admin: &Account, application_id: i64, college_id: i64, fee: &str) -> StatusCode {
    app.server
        .post(&format!("/admin/applications/{}/approve", application_id))
        .add_header(AUTHORIZATION, bearer(admin))
        .json(&json!({ "college_id": college_id, "fee_per_session": fee }))
        .await
        .status_code()
}

/// Admin, approved mentor and a student, ready to book.
async fn marketplace_with_mentor(app: &TestApp) -> (Account, Account, Account) {
    let admin = app.admin().await;
    let mentor = app.account("mentor@example.com", "Vikram Senior").await;
    let student = app.account("student@example.com", "Asha Junior").await;

    let college = create_college(app, &admin, "IIT Delhi", "New Delhi").await;
    let application = submit_application(app, &mentor).await;
    assert_eq!(approve(app, &admin, application.id, college.id, "499.00").await, StatusCode::OK);

    (admin, mentor, student)
}

#[tokio::test]
async fn test_approved_mentor_is_listed_and_bookable() {
    let app = TestApp::new();
    let (_admin, mentor, student) = marketplace_with_mentor(&app).await;

    let response = app.server.get("/mentors").await;
    response.assert_status_ok();
    let mentors = response.json::<ApiResponse<Vec<MentorListing>>>().data.unwrap();
    assert_eq!(mentors.len(), 1);
    assert_eq!(mentors[0].id, mentor.id);
    assert!(mentors[0].is_verified);
    assert_eq!(mentors[0].price_per_session, Decimal::new(49900, 2));
    assert_eq!(mentors[0].college_name.as_deref(), Some("IIT Delhi"));

    assert_eq!(
        app.store.current_role(mentor.id).await.unwrap(),
        Some(UserRole::Senior)
    );

    let response = app
        .server
        .post("/bookings")
        .add_header(AUTHORIZATION, bearer(&student))
        .json(&json!({ "mentor_id": mentor.id, "date": "2030-03-10", "time_slot": "02:00 PM" }))
        .await;
    response.assert_status_ok();
    let booking = response.json::<ApiResponse<Booking>>().data.unwrap();
    assert_eq!(booking.amount_paid, Decimal::new(49900, 2));
    assert_eq!(booking.status, "confirmed");
    assert_eq!(booking.duration_minutes, 15);
    assert_eq!(booking.session_time.to_rfc3339(), "2030-03-10T14:00:00+00:00");
}

#[tokio::test]
async fn test_booking_keeps_the_price_it_was_made_at() {
    let app = TestApp::new();
    let (admin, mentor, student) = marketplace_with_mentor(&app).await;

    app.server
        .post("/bookings")
        .add_header(AUTHORIZATION, bearer(&student))
        .json(&json!({ "mentor_id": mentor.id, "session_time": "2030-01-01T10:00:00Z", "duration_minutes": 30 }))
        .await
        .assert_status_ok();

    app.server
        .put(&format!("/admin/mentors/{}", mentor.id))
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({ "price_per_session": "999.00", "expertise": "DSA, System Design" }))
        .await
        .assert_status_ok();

    let response = app
        .server
        .get("/bookings/mine")
        .add_header(AUTHORIZATION, bearer(&student))
        .await;
    response.assert_status_ok();
    let sessions = response.json::<ApiResponse<Value>>().data.unwrap();
    assert_eq!(sessions["bookings"][0]["amount_paid"], "499.00");
    assert_eq!(sessions["bookings"][0]["mentor_name"], "Vikram Senior");
    assert_eq!(sessions["mentors"][0]["user_id"], mentor.id.to_string());

    let response = app
        .server
        .get("/mentor/dashboard")
        .add_header(AUTHORIZATION, bearer(&mentor))
        .await;
    response.assert_status_ok();
    let dashboard = response.json::<ApiResponse<Value>>().data.unwrap();
    assert_eq!(dashboard["stats"]["total_sessions"], 1);
    assert_eq!(dashboard["stats"]["total_earnings"], "499.00");
    assert_eq!(dashboard["stats"]["upcoming_sessions"], 1);
    assert_eq!(dashboard["students"][0]["full_name"], "Asha Junior");
    assert_eq!(dashboard["mentor"]["expertise"], json!(["DSA", "System Design"]));
}

#[tokio::test]
async fn test_booking_requires_a_resolvable_time() {
    let app = TestApp::new();
    let (_admin, mentor, student) = marketplace_with_mentor(&app).await;

    let response = app
        .server
        .post("/bookings")
        .add_header(AUTHORIZATION, bearer(&student))
        .json(&json!({ "mentor_id": mentor.id, "date": "2030-03-10" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = app
        .server
        .post("/bookings")
        .add_header(AUTHORIZATION, bearer(&student))
        .json(&json!({ "mentor_id": mentor.id, "date": "2030-03-10", "time_slot": "25:00 PM" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = app
        .server
        .post("/bookings")
        .add_header(AUTHORIZATION, bearer(&student))
        .json(&json!({ "mentor_id": Uuid::new_v4(), "session_time": "2030-01-01T10:00:00Z" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sessions_in_the_past_are_refused() {
    let app = TestApp::new();
    let (_admin, mentor, student) = marketplace_with_mentor(&app).await;

    let response = app
        .server
        .post("/bookings")
        .add_header(AUTHORIZATION, bearer(&student))
        .json(&json!({ "mentor_id": mentor.id, "date": "2001-01-01", "time_slot": "10:00 AM" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = app
        .server
        .post("/bookings")
        .add_header(AUTHORIZATION, bearer(&student))
        .json(&json!({ "mentor_id": mentor.id, "session_time": "2001-01-01T10:00:00Z" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = app
        .server
        .get("/bookings/mine")
        .add_header(AUTHORIZATION, bearer(&student))
        .await;
    response.assert_status_ok();
    let sessions = response.json::<Value>();
    assert_eq!(sessions["data"]["bookings"], json!([]));
}

#[tokio::test]
async fn test_fees_finer_than_cents_are_refused() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let candidate = app.account("mentor@example.com", "Vikram Senior").await;
    let college = create_college(&app, &admin, "IIT Delhi", "New Delhi").await;
    let application = submit_application(&app, &candidate).await;

    assert_eq!(approve(&app, &admin, application.id, college.id, "499.999").await, StatusCode::BAD_REQUEST);
    assert_eq!(approve(&app, &admin, application.id, college.id, "100000000").await, StatusCode::BAD_REQUEST);

    let mentors = app.server.get("/mentors").await.json::<ApiResponse<Vec<MentorListing>>>().data.unwrap();
    assert!(mentors.is_empty());

    assert_eq!(approve(&app, &admin, application.id, college.id, "499.50").await, StatusCode::OK);
    let response = app
        .server
        .put(&format!("/admin/mentors/{}", candidate.id))
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({ "price_per_session": "0.001" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_slot_exclusivity_follows_configuration() {
    let body = |mentor: Uuid| json!({ "mentor_id": mentor, "session_time": "2030-01-01T10:00:00Z" });

    let app = TestApp::new();
    let (_admin, mentor, student) = marketplace_with_mentor(&app).await;
    for _ in 0..2 {
        app.server
            .post("/bookings")
            .add_header(AUTHORIZATION, bearer(&student))
            .json(&body(mentor.id))
            .await
            .assert_status_ok();
    }

    let app = TestApp::with_config(|config| config.booking.exclusive_slots = true);
    let (_admin, mentor, student) = marketplace_with_mentor(&app).await;
    app.server
        .post("/bookings")
        .add_header(AUTHORIZATION, bearer(&student))
        .json(&body(mentor.id))
        .await
        .assert_status_ok();
    let response = app
        .server
        .post("/bookings")
        .add_header(AUTHORIZATION, bearer(&student))
        .json(&body(mentor.id))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_reject_is_terminal() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let candidate = app.account("candidate@example.com", "Candidate").await;
    let college = create_college(&app, &admin, "NIT Trichy", "Tiruchirappalli").await;
    let application = submit_application(&app, &candidate).await;

    let response = app
        .server
        .post(&format!("/admin/applications/{}/reject", application.id))
        .add_header(AUTHORIZATION, bearer(&admin))
        .await;
    response.assert_status_ok();
    let rejected = response.json::<ApiResponse<MentorApplication>>().data.unwrap();
    assert_eq!(rejected.reviewed_by, Some(admin.id));

    assert_eq!(approve(&app, &admin, application.id, college.id, "100").await, StatusCode::CONFLICT);
    assert_eq!(
        app.store.current_role(candidate.id).await.unwrap(),
        Some(UserRole::Junior)
    );

    // A rejected candidate may apply again
    let second = submit_application(&app, &candidate).await;
    assert_ne!(second.id, application.id);
    assert_eq!(approve(&app, &admin, second.id, college.id, "100").await, StatusCode::OK);
    let approved = app.store.get_application(second.id).await.unwrap().unwrap();
    assert_eq!(approved.reviewed_by, Some(admin.id));
}

#[tokio::test]
async fn test_duplicate_submission_returns_the_same_application() {
    let app = TestApp::new();
    let candidate = app.account("candidate@example.com", "Candidate").await;

    let first = submit_application(&app, &candidate).await;
    let second = submit_application(&app, &candidate).await;
    assert_eq!(first.id, second.id);
    assert_eq!(first.email, "candidate@example.com");

    let response = app
        .server
        .get("/applications/mine")
        .add_header(AUTHORIZATION, bearer(&candidate))
        .await;
    let mine = response.json::<ApiResponse<Vec<MentorApplication>>>().data.unwrap();
    assert_eq!(mine.len(), 1);
}

#[tokio::test]
async fn test_remove_mentor_reverts_the_role() {
    let app = TestApp::new();
    let (admin, mentor, _student) = marketplace_with_mentor(&app).await;

    app.server
        .delete(&format!("/admin/mentors/{}", mentor.id))
        .add_header(AUTHORIZATION, bearer(&admin))
        .await
        .assert_status_ok();

    let response = app
        .server
        .get("/mentor/dashboard")
        .add_header(AUTHORIZATION, bearer(&mentor))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = app
        .server
        .get(&format!("/admin/users/{}/roles", mentor.id))
        .add_header(AUTHORIZATION, bearer(&admin))
        .await;
    response.assert_status_ok();
    let history = response.json::<ApiResponse<Value>>().data.unwrap();
    assert_eq!(history["current_role"], "junior");
    let roles: Vec<&str> = history["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["to_role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["junior", "senior", "junior"]);

    let response = app
        .server
        .get("/admin/reconciliation")
        .add_header(AUTHORIZATION, bearer(&admin))
        .await;
    let report = response.json::<ApiResponse<Value>>().data.unwrap();
    assert_eq!(report["approved_without_mentor"], json!([]));
    assert_eq!(report["seniors_without_mentor"], json!([]));
}

#[tokio::test]
async fn test_admin_routes_are_gated() {
    let app = TestApp::new();
    let _admin = app.admin().await;
    let student = app.account("student@example.com", "Asha").await;

    let response = app.server.get("/admin/dashboard").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .get("/admin/dashboard")
        .add_header(AUTHORIZATION, bearer(&student))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = app
        .server
        .get("/mentor/bookings")
        .add_header(AUTHORIZATION, bearer(&student))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_college_search_is_case_insensitive() {
    let app = TestApp::new();
    let admin = app.admin().await;
    create_college(&app, &admin, "IIT Bombay", "Mumbai").await;
    create_college(&app, &admin, "BITS Pilani", "Pilani").await;

    let response = app.server.get("/colleges?q=mUMBAI").await;
    let colleges = response.json::<ApiResponse<Vec<College>>>().data.unwrap();
    assert_eq!(colleges.len(), 1);
    assert_eq!(colleges[0].name, "IIT Bombay");

    let response = app.server.get("/colleges?q=engineering").await;
    let colleges = response.json::<ApiResponse<Vec<College>>>().data.unwrap();
    assert_eq!(colleges.len(), 2);

    let response = app
        .server
        .get("/admin/dashboard")
        .add_header(AUTHORIZATION, bearer(&admin))
        .await;
    let counts = response.json::<ApiResponse<Value>>().data.unwrap();
    assert_eq!(counts["colleges"], 2);
    assert_eq!(counts["pending_applications"], 0);
}

#[tokio::test]
async fn test_site_settings_round_trip() {
    let app = TestApp::new();
    let admin = app.admin().await;

    let response = app.server.get("/site-settings").await;
    let settings = response.json::<ApiResponse<Value>>().data.unwrap();
    assert_eq!(settings["active_mentors"], "500+");

    app.server
        .put("/admin/site-settings")
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({ "active_mentors": "750+" }))
        .await
        .assert_status_ok();

    let response = app.server.get("/site-settings").await;
    let settings = response.json::<ApiResponse<Value>>().data.unwrap();
    assert_eq!(settings["active_mentors"], "750+");
    assert_eq!(settings["top_colleges"], "50+");
}
