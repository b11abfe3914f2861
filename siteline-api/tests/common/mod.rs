/// Common test utilities for integration tests
///
/// Builds the full router on an in-memory store with cheap Argon2
/// parameters and a manual clock, and drives it without a network socket.

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use serde_json::Value;
use siteline_api::app::{build_router, AppState, StoreBackend};
use siteline_api::config::Config;
use siteline_shared::auth::clock::ManualClock;
use siteline_shared::auth::password::{Argon2Hasher, HashParams, PasswordHasher};
use siteline_shared::models::user::{NewUser, User, UserRole};
use siteline_shared::store::{InMemoryUserStore, UserStore};
use std::collections::HashMap;
use std::sync::Arc;
use tower::Service as _;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Response captured for assertions
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Test context containing the router and its collaborators
pub struct TestContext {
    pub app: axum::Router,
    pub store: Arc<InMemoryUserStore>,
    pub clock: ManualClock,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_env(&[])
    }

    /// Builds a context with extra configuration variables
    pub fn with_env(extra: &[(&str, &str)]) -> Self {
        let fast = HashParams::insecure_fast();
        let mut vars: HashMap<String, String> = HashMap::from([
            ("JWT_SECRET".to_string(), JWT_SECRET.to_string()),
            ("ARGON2_MEMORY_KIB".to_string(), fast.memory_kib.to_string()),
            ("ARGON2_ITERATIONS".to_string(), fast.iterations.to_string()),
            ("ARGON2_PARALLELISM".to_string(), fast.parallelism.to_string()),
        ]);
        for (key, value) in extra {
            vars.insert(key.to_string(), value.to_string());
        }

        let config = Config::from_map(&vars).expect("valid test config");
        let store = Arc::new(InMemoryUserStore::new());
        let clock = ManualClock::default();

        let state = AppState::build(
            config,
            StoreBackend::Memory(store.clone()),
            Arc::new(clock.clone()),
        )
        .expect("Failed to build app state");

        Self {
            app: build_router(state),
            store,
            clock,
        }
    }

    /// Sends a request, with an optional JSON body and bearer token
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body), None).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, None, token).await
    }

    /// Inserts a password user directly into the store
    pub async fn seed_user(&self, email: &str, password: &str, role: UserRole) -> User {
        let hasher = Argon2Hasher::new(HashParams::insecure_fast()).unwrap();

        self.store
            .save(User::new(NewUser {
                email: email.to_string(),
                first_name: "Seeded".to_string(),
                last_name: "User".to_string(),
                password_hash: Some(hasher.hash(password).unwrap()),
                role,
                ..Default::default()
            }))
            .await
            .unwrap()
    }

    /// Logs in and returns the access token
    pub async fn login_token(&self, email: &str, password: &str) -> String {
        let response = self
            .post(
                "/v1/auth/login",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);

        response.body["accessToken"].as_str().unwrap().to_string()
    }
}
