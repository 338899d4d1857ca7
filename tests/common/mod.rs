#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use support_desk_api::access::Role;
use support_desk_api::auth::{generate_jwt, Claims};
use support_desk_api::config::AppConfig;
use support_desk_api::testing::{MemoryStore, RecordingMailer, RecordingPushTransport};
use support_desk_api::{app, AppState};

pub const SECRET: &str = "integration-test-secret";
pub const INTERNAL_KEY: &str = "test-internal-key";

/// Router wired to in-memory fakes. Every request goes through `oneshot`.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub push: Arc<RecordingPushTransport>,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(AppConfig::for_tests(SECRET), RecordingMailer::new())
    }

    pub fn with_mailer(mailer: RecordingMailer) -> Self {
        Self::build(AppConfig::for_tests(SECRET), mailer)
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::build(config, RecordingMailer::new())
    }

    fn build(config: AppConfig, mailer: RecordingMailer) -> Self {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(mailer);
        let push = Arc::new(RecordingPushTransport::new());
        let state = AppState::new(store.clone(), mailer.clone(), push.clone(), config);
        Self {
            store,
            mailer,
            push,
            router: app(state),
        }
    }

    pub fn token(&self, user_id: Uuid, email: &str) -> String {
        generate_jwt(&Claims::new(user_id, email, 1), SECRET).expect("mint token")
    }

    /// Creates an account with a membership and returns `(user_id, token)`.
    pub async fn member(&self, email: &str, customer_id: Uuid, role: Role) -> (Uuid, String) {
        let user_id = self.store.add_user(email).await;
        self.store
            .add_customer_membership(user_id, customer_id, role, None)
            .await;
        (user_id, self.token(user_id, email))
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json)?))?,
            None => builder.body(Body::empty())?,
        };
        self.dispatch(request).await
    }

    pub async fn dispatch(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, body))
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::DELETE, uri, Some(token), Some(body)).await
    }
}
