#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use penpal::app::auth::TokenService;
use penpal::app::messages::MessageSettings;
use penpal::config::AppConfig;
use penpal::domain::message::ModerationPolicy;
use penpal::domain::user::{Profile, Role, User};
use penpal::infra::store::{MemoryStore, Stores};
use penpal::AppState;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

// "0123456789abcdef0123456789abcdef" (32 bytes, test-only)
const TEST_PASETO_ACCESS_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";

// ---------------------------------------------------------------------------
// TestApp: a router over a fresh in-memory store per test
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub access_token: String,
}

pub async fn app() -> TestApp {
    TestApp::with_policy("none")
}

impl TestApp {
    /// Builds the state through `AppConfig` like production, on the memory
    /// backend and without Redis.
    pub fn with_policy(policy: &str) -> Self {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("STORE_BACKEND", "memory"),
            ("PASETO_ACCESS_KEY", TEST_PASETO_ACCESS_KEY),
            ("MODERATION_POLICY", policy),
            ("UNREAD_POLL_INTERVAL_SECONDS", "30"),
        ]);
        let config = AppConfig::from_lookup(|key| vars.get(key).map(|value| value.to_string()))
            .expect("failed to build AppConfig");

        let store = Arc::new(MemoryStore::new());
        let state = AppState {
            stores: Stores::memory(store.clone()),
            cache: None,
            tokens: TokenService::new(config.paseto_access_key, config.token_issuer.clone()),
            messaging: MessageSettings {
                policy: config.moderation_policy,
                max_chars: config.message_max_chars,
                max_attachments: config.message_max_attachments,
            },
            rate_limits: config.rate_limits,
            unread_poll_interval_seconds: config.unread_poll_interval_seconds,
            request_body_limit_bytes: config.request_body_limit_bytes,
        };

        let router = penpal::http::router(state.clone());

        TestApp {
            router,
            state,
            store,
        }
    }

    pub fn pre_moderated() -> Self {
        let app = Self::with_policy("pre");
        assert_eq!(
            app.state.messaging.policy,
            ModerationPolicy::PreModerated
        );
        app
    }

    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let request = if let Some(body) = body {
            builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body_bytes,
        }
    }

    // ------------------------------------------------------------------
    // Convenience HTTP helpers
    // ------------------------------------------------------------------
    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, path, None, token).await
    }

    pub async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.request(Method::POST, path, Some(body), token).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::POST, path, None, token).await
    }

    pub async fn patch_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.request(Method::PATCH, path, Some(body), token).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, path, None, token).await
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------

    /// Seeds a user and profile as the identity service would and mints an
    /// access token for them.
    pub fn create_user(&self, role: Role, first_name: &str, last_name: Option<&str>) -> TestUser {
        let id = Uuid::new_v4();
        let email = format!("{}.{}@example.com", first_name.to_lowercase(), &id.simple().to_string()[..8]);
        self.store
            .insert_user(
                User {
                    id,
                    email: email.clone(),
                    role,
                },
                Some(Profile {
                    user_id: id,
                    first_name: Some(first_name.to_string()),
                    last_name: last_name.map(str::to_string),
                    photos: vec![format!("https://img.example.com/{}.jpg", id)],
                }),
            )
            .expect("seed user");

        TestUser {
            id,
            email,
            role,
            access_token: self.token_for(id, role),
        }
    }

    /// A user known to the token issuer but missing from the directory.
    pub fn ghost_user(&self, role: Role) -> TestUser {
        let id = Uuid::new_v4();
        TestUser {
            id,
            email: String::new(),
            role,
            access_token: self.token_for(id, role),
        }
    }

    pub fn token_for(&self, user_id: Uuid, role: Role) -> String {
        self.state
            .tokens
            .issue_access_token(user_id, role, Duration::from_secs(600))
            .expect("issue access token")
    }

    /// Creates a match requested by `requester` and returns its id.
    pub async fn request_match(&self, requester: &TestUser, partner: &TestUser) -> Uuid {
        let resp = self
            .post_json(
                "/matches",
                json!({ "partner_id": partner.id }),
                Some(&requester.access_token),
            )
            .await;
        assert!(
            resp.status == StatusCode::CREATED || resp.status == StatusCode::OK,
            "create match failed: {} {}",
            resp.status,
            resp.error_message()
        );
        Uuid::parse_str(resp.json()["id"].as_str().unwrap()).unwrap()
    }

    /// Creates a match and has `partner` accept it.
    pub async fn accepted_match(&self, requester: &TestUser, partner: &TestUser) -> Uuid {
        let match_id = self.request_match(requester, partner).await;
        let resp = self
            .patch_json(
                &format!("/matches/{}", match_id),
                json!({ "status": "accepted" }),
                Some(&partner.access_token),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "{}", resp.error_message());
        match_id
    }

    pub async fn send(&self, match_id: Uuid, sender: &TestUser, recipient: &TestUser, content: &str) -> Value {
        let resp = self
            .post_json(
                "/messages",
                json!({
                    "match_id": match_id,
                    "recipient_id": recipient.id,
                    "content": content,
                }),
                Some(&sender.access_token),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.error_message());
        resp.json()
    }

    pub async fn unread_count(&self, user: &TestUser) -> i64 {
        let resp = self
            .get("/messages/unread-count", Some(&user.access_token))
            .await;
        assert_eq!(resp.status, StatusCode::OK);
        resp.json()["count"].as_i64().unwrap()
    }
}
