#![allow(dead_code)]
//! Common test utilities for integration tests
//!
//! Builds the real router over an in-memory store, so no database is
//! needed. Seeded users:
//!
//! | id | name   | role  | password         |
//! |----|--------|-------|------------------|
//! | 1  | Admin  | ADMIN | `admin-password` |
//! | 2  | Worker | USER  | (not usable)     |
//! | 3  | Other  | USER  | (not usable)     |


use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use serde_json::Value;
use taskdesk_api::app::{build_router, AppState};
use taskdesk_api::config::{ApiConfig, Config, DatabaseConfig, LogFormat, SessionConfig};
use taskdesk_shared::auth::jwt::{create_token, Claims};
use taskdesk_shared::auth::password::hash_password;
use taskdesk_shared::models::user::{CreateUser, Role};
use taskdesk_shared::repository::{MemoryRepository, UserRepository};
use tower::ServiceExt;

pub const SECRET: &str = "api-integration-test-secret-0123456789";
pub const ADMIN_PASSWORD: &str = "admin-password";

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
        },
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 1,
        },
        session: SessionConfig {
            secret: SECRET.to_string(),
            ttl_hours: 24,
            cookie_secure: false,
        },
        seed_admin: None,
        log_format: LogFormat::Pretty,
    }
}

/// Test context containing the router and ready-made session tokens
pub struct TestContext {
    pub app: Router,
    pub repo: MemoryRepository,
    pub admin_token: String,
    pub worker_token: String,
    pub other_token: String,
}

/// Response with the body decoded as JSON when possible
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub text: String,
    pub json: Value,
}

fn token(id: i64, name: &str, role: Role) -> String {
    let claims = Claims::new(
        id,
        name,
        format!("{}@example.com", name.to_lowercase()),
        role,
        Duration::hours(1),
    );
    create_token(&claims, SECRET).unwrap()
}

impl TestContext {
    pub async fn new() -> Self {
        let repo = MemoryRepository::new();

        let admin_hash = hash_password(ADMIN_PASSWORD).unwrap();
        for (name, role, hash) in [
            ("Admin", Role::Admin, admin_hash),
            ("Worker", Role::User, "not-a-real-hash".to_string()),
            ("Other", Role::User, "not-a-real-hash".to_string()),
        ] {
            UserRepository::insert(
                &repo,
                CreateUser {
                    name: name.to_string(),
                    email: format!("{}@example.com", name.to_lowercase()),
                    password_hash: hash,
                    role,
                },
            )
            .await
            .unwrap();
        }

        let app = build_router(AppState::in_memory(test_config(), repo.clone()));

        TestContext {
            app,
            repo,
            admin_token: token(1, "Admin", Role::Admin),
            worker_token: token(2, "Worker", Role::User),
            other_token: token(3, "Other", Role::User),
        }
    }

    /// Sends a request through the router
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.call(request).await
    }

    pub async fn call(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8_lossy(&bytes).to_string();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            text,
            json,
        }
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.send(Method::GET, uri, Some(token), None).await
    }

    /// Creates a task as the admin and returns its JSON
    pub async fn create_task(&self, assigned_to: i64) -> Value {
        let response = self
            .send(
                Method::POST,
                "/api/tasks",
                Some(&self.admin_token),
                Some(serde_json::json!({
                    "title": "Fix bug",
                    "description": "desc",
                    "status": "New Assigned",
                    "assignedTo": assigned_to,
                    "createdBy": 1,
                    "dueDate": "2025-06-01"
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
        response.json
    }
}
