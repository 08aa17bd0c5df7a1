#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use finance_tracker::assistant::{CannedCompletion, ChatResponse};
use finance_tracker::config::Config;
use finance_tracker::mail::RecordingMailer;
use finance_tracker::store::MemoryStore;
use finance_tracker::{AppState, build_router};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const CANNED_REPLY: &str = "Spend less on takeaways. Cook at home more often. Review subscriptions. Save the rest.";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub assistant: Arc<CannedCompletion>,
}

fn test_config() -> Config {
    Config::from_lookup(|key| {
        let value = match key {
            "JWT_SECRET" => "integration-secret",
            "ARGON2_MEMORY_KIB" => "8",
            "ARGON2_ITERATIONS" => "1",
            "ARGON2_PARALLELISM" => "1",
            "CURRENCY_SYMBOL" => "₹",
            _ => return None,
        };
        Some(value.to_string())
    })
    .expect("test config")
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_mailer(RecordingMailer::new())
    }

    pub fn with_mailer(mailer: RecordingMailer) -> Self {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(mailer);
        let assistant = Arc::new(CannedCompletion::new(ChatResponse::with_content(CANNED_REPLY)));
        let state = AppState {
            store: store.clone(),
            mailer: mailer.clone(),
            assistant: assistant.clone(),
            config: Arc::new(test_config()),
        };
        Self {
            router: build_router(state),
            store,
            mailer,
            assistant,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>, Option<String>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");
        (status, bytes.to_vec(), content_type)
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        let (status, bytes, _) = self.send(request).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    /// Signs up a user and returns `(token, user id)`.
    pub async fn signup(&self, name: &str, email: &str) -> (String, String) {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/signup",
                None,
                Some(json!({ "name": name, "email": email, "password": "secret123" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
        (
            body["token"].as_str().expect("token").to_string(),
            body["user"]["id"].as_str().expect("user id").to_string(),
        )
    }

    pub async fn add_transaction(&self, token: &str, body: Value) -> Value {
        let (status, created) = self
            .call(Method::POST, "/api/transactions", Some(token), Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {created}");
        created
    }
}
