use std::sync::Arc;
use std::time::Duration;

use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use axum_test::TestServer;
use futures::StreamExt;
use serde_json::{json, Value};
use uuid::Uuid;

use campusmentor_auth::JwtService;
use campusmentor_chat::{build_app, connection_manager::ConnectionManager, AppState, ChatConfig};
use campusmentor_common::{ApiResponse, StorageBackend, UserRole};
use campusmentor_database::{IdentityStore, MemoryStore, Message, NewUser};

struct TestApp {
    server: TestServer,
    store: Arc<MemoryStore>,
    jwt: JwtService,
    connection_manager: ConnectionManager,
}

struct Account {
    id: Uuid,
    token: HeaderValue,
}

impl TestApp {
    fn new() -> Self {
        let mut config = ChatConfig::from_env();
        config.storage = StorageBackend::Memory;
        config.redis.enabled = false;
        config.websocket.max_message_length = 20;

        let store = Arc::new(MemoryStore::new());
        let jwt = JwtService::new(&config.jwt);
        let state = AppState::new(store.clone(), None, jwt.clone(), config);
        let connection_manager = state.connection_manager.clone();

        Self {
            server: TestServer::new(build_app(state)).unwrap(),
            store,
            jwt,
            connection_manager,
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
        Account {
            id: user.id,
            token: HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        }
    }

    async fn send(&self, from: &Account, to: &Account, content: &str) -> Message {
        let response = self
            .server
            .post("/messages")
            .add_header(AUTHORIZATION, from.token.clone())
            .json(&json!({ "receiver_id": to.id, "content": content }))
            .await;
        response.assert_status_ok();
        response.json::<ApiResponse<Message>>().data.unwrap()
    }

    async fn conversation(&self, viewer: &Account, other: &Account) -> Vec<Message> {
        let response = self
            .server
            .get(&format!("/conversations/{}", other.id))
            .add_header(AUTHORIZATION, viewer.token.clone())
            .await;
        response.assert_status_ok();
        response.json::<ApiResponse<Vec<Message>>>().data.unwrap()
    }
}

#[tokio::test]
async fn test_conversation_is_symmetric() {
    let app = TestApp::new();
    let asha = app.account("asha@example.com", "Asha").await;
    let vikram = app.account("vikram@example.com", "Vikram").await;

    app.send(&asha, &vikram, "Hi Vikram").await;
    app.send(&vikram, &asha, "Hello Asha").await;
    app.send(&asha, &vikram, "  Free at 2?  ").await;

    let from_asha = app.conversation(&asha, &vikram).await;
    let from_vikram = app.conversation(&vikram, &asha).await;
    assert_eq!(from_asha, from_vikram);
    assert_eq!(from_asha.len(), 3);
    assert_eq!(from_asha[2].content, "Free at 2?");
}

#[tokio::test]
async fn test_blank_and_oversized_messages_are_rejected() {
    let app = TestApp::new();
    let asha = app.account("asha@example.com", "Asha").await;
    let vikram = app.account("vikram@example.com", "Vikram").await;

    for content in ["   ", "this message is far longer than twenty characters"] {
        let response = app
            .server
            .post("/messages")
            .add_header(AUTHORIZATION, asha.token.clone())
            .json(&json!({ "receiver_id": vikram.id, "content": content }))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    let response = app
        .server
        .post("/messages")
        .add_header(AUTHORIZATION, asha.token.clone())
        .json(&json!({ "receiver_id": Uuid::new_v4(), "content": "anyone?" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    assert!(app.conversation(&asha, &vikram).await.is_empty());
}

#[tokio::test]
async fn test_sent_messages_reach_live_subscribers() {
    let app = TestApp::new();
    let asha = app.account("asha@example.com", "Asha").await;
    let vikram = app.account("vikram@example.com", "Vikram").await;

    let live = app.connection_manager.subscribe(vikram.id, asha.id);
    tokio::pin!(live);

    let sent = app.send(&asha, &vikram, "Are you there?").await;

    let received = tokio::time::timeout(Duration::from_secs(1), live.next())
        .await
        .unwrap();
    assert_eq!(received, Some(sent));
}

#[tokio::test]
async fn test_conversation_lists() {
    let app = TestApp::new();
    let asha = app.account("asha@example.com", "Asha").await;
    let vikram = app.account("vikram@example.com", "Vikram").await;
    let meera = app.account("meera@example.com", "Meera").await;
    let admin = app.account("admin@example.com", "Admin").await;
    app.store.promote_first_admin(admin.id).await.unwrap();

    app.send(&asha, &vikram, "one").await;
    app.send(&vikram, &asha, "two").await;
    app.send(&meera, &asha, "three").await;

    let response = app
        .server
        .get("/conversations")
        .add_header(AUTHORIZATION, asha.token.clone())
        .await;
    let mine = response.json::<ApiResponse<Vec<Value>>>().data.unwrap();
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0]["other_user_name"], "Meera");
    assert_eq!(mine[1]["other_user_id"], vikram.id.to_string());
    assert_eq!(mine[1]["message_count"], 2);

    let response = app
        .server
        .get("/admin/conversations")
        .add_header(AUTHORIZATION, asha.token.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = app
        .server
        .get("/admin/conversations")
        .add_header(AUTHORIZATION, admin.token.clone())
        .await;
    let all = response.json::<ApiResponse<Vec<Value>>>().data.unwrap();
    assert_eq!(all.len(), 2);

    let response = app
        .server
        .get(&format!("/admin/conversations/{}/{}", vikram.id, asha.id))
        .add_header(AUTHORIZATION, admin.token.clone())
        .await;
    let messages = response.json::<ApiResponse<Vec<Message>>>().data.unwrap();
    let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["one", "two"]);
}

#[tokio::test]
async fn test_messaging_requires_a_token() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/messages")
        .json(&json!({ "receiver_id": Uuid::new_v4(), "content": "hi" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}
