// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use pricing_grader::config::Config;
use pricing_grader::remote::{MemoryBackend, RemoteService};
use pricing_grader::routes::create_router;
use pricing_grader::AppState;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Test app over the in-memory backend.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (Router, Arc<AppState>) {
    let remote = RemoteService::from_config(&config);
    let state = AppState::build(config, remote);
    (create_router(state.clone()), state)
}

/// The memory backend behind a test app.
#[allow(dead_code)]
pub fn memory(state: &AppState) -> &Arc<MemoryBackend> {
    state
        .remote
        .memory_backend()
        .expect("test app uses the memory backend")
}

/// Response status, headers and JSON body (`Null` when empty or not JSON).
#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

#[allow(dead_code)]
pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    TestResponse {
        status,
        headers,
        body,
    }
}

/// Build a request, optionally authenticated with a bearer token.
#[allow(dead_code)]
pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// A signed-up test user.
#[allow(dead_code)]
pub struct TestUser {
    pub token: String,
    pub id: String,
    pub identity: Value,
}

#[allow(dead_code)]
pub async fn sign_up(app: &Router, email: &str, name: &str) -> TestUser {
    let response = send(
        app,
        request(
            "POST",
            "/auth/signup",
            None,
            Some(serde_json::json!({
                "email": email,
                "password": "password1",
                "name": name,
            })),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK, "sign up failed: {}", response.body);

    TestUser {
        token: response.body["access_token"].as_str().unwrap().to_string(),
        id: response.body["identity"]["id"].as_str().unwrap().to_string(),
        identity: response.body["identity"].clone(),
    }
}

/// Poll until `check` passes (background session re-syncs are asynchronous).
#[allow(dead_code)]
pub async fn eventually<F, Fut>(check: F) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
