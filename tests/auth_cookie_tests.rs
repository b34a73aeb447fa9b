// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth cookie attribute tests.
//!
//! Sign-up sets the session and hint cookies; sign-out removes them with the
//! same attributes they were created with.

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
};
use pricing_grader::config::Config;
use serde_json::json;

mod common;

fn set_cookie_headers(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

fn sign_up_body() -> serde_json::Value {
    json!({ "email": "carla@example.com", "password": "password1", "name": "Carla" })
}

#[tokio::test]
async fn test_sign_up_sets_session_cookies_localhost() {
    let (app, _) = common::create_test_app();

    let response = common::send(
        &app,
        common::request("POST", "/auth/signup", None, Some(sign_up_body())),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    let cookies = set_cookie_headers(&response.headers);
    let token_cookie = find_cookie(&cookies, "pg_session");
    let hint_cookie = find_cookie(&cookies, "pg_logged_in");

    assert!(token_cookie.contains("Path=/"));
    assert!(token_cookie.contains("HttpOnly"));
    assert!(token_cookie.contains("SameSite=Lax"));
    assert!(token_cookie.contains("Max-Age="));
    assert!(!token_cookie.contains("Secure"));

    assert!(hint_cookie.starts_with("pg_logged_in=1"));
    assert!(!hint_cookie.contains("HttpOnly"));
    assert!(!hint_cookie.contains("Secure"));
}

#[tokio::test]
async fn test_sign_up_sets_secure_cookies_on_https() {
    let config = Config {
        frontend_url: "https://grader.example.com".to_string(),
        ..Config::test_default()
    };
    let (app, _) = common::create_test_app_with_config(config);

    let response = common::send(
        &app,
        common::request("POST", "/auth/signup", None, Some(sign_up_body())),
    )
    .await;

    let cookies = set_cookie_headers(&response.headers);
    assert!(find_cookie(&cookies, "pg_session").contains("Secure"));
    assert!(find_cookie(&cookies, "pg_logged_in").contains("Secure"));
}

#[tokio::test]
async fn test_session_cookie_authenticates() {
    let (app, _) = common::create_test_app();
    let user = common::sign_up(&app, "carla@example.com", "Carla").await;

    let response = common::send(
        &app,
        Request::builder()
            .uri("/dashboard")
            .header(header::COOKIE, format!("pg_session={}", user.token))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["identity"]["email"], "carla@example.com");
}

#[tokio::test]
async fn test_sign_out_removes_cookies_and_ends_session() {
    let (app, _) = common::create_test_app();
    let user = common::sign_up(&app, "carla@example.com", "Carla").await;

    let response = common::send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/auth/signout")
            .header(
                header::COOKIE,
                format!("pg_session={}; pg_logged_in=1", user.token),
            )
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let cookies = set_cookie_headers(&response.headers);
    let token_cookie = find_cookie(&cookies, "pg_session");
    let hint_cookie = find_cookie(&cookies, "pg_logged_in");

    assert!(token_cookie.contains("Path=/"));
    assert!(token_cookie.contains("HttpOnly"));
    assert!(token_cookie.contains("SameSite=Lax"));
    assert!(token_cookie.contains("Max-Age=0"));
    assert!(hint_cookie.contains("Path=/"));
    assert!(hint_cookie.contains("Max-Age=0"));
    assert!(!hint_cookie.contains("HttpOnly"));

    // The token is dead even though its signature is still valid
    let response = common::send(
        &app,
        common::request("GET", "/dashboard", Some(&user.token), None),
    )
    .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_sign_in_after_sign_up() {
    let (app, _) = common::create_test_app();
    common::sign_up(&app, "carla@example.com", "Carla").await;

    let response = common::send(
        &app,
        common::request(
            "POST",
            "/auth/signin",
            None,
            Some(json!({ "email": "carla@example.com", "password": "password1" })),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["identity"]["name"], "Carla");
    assert_eq!(response.body["identity"]["plan"], "free");
    assert!(response.body["access_token"].as_str().is_some());
}

#[tokio::test]
async fn test_auth_errors_are_surfaced_verbatim() {
    let (app, _) = common::create_test_app();
    common::sign_up(&app, "carla@example.com", "Carla").await;

    let duplicate = common::send(
        &app,
        common::request("POST", "/auth/signup", None, Some(sign_up_body())),
    )
    .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.body["error"], "auth_error");
    assert_eq!(duplicate.body["details"], "User already registered");

    let wrong_password = common::send(
        &app,
        common::request(
            "POST",
            "/auth/signin",
            None,
            Some(json!({ "email": "carla@example.com", "password": "wrong-password" })),
        ),
    )
    .await;
    assert_eq!(wrong_password.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_password.body["details"], "Invalid login credentials");
}

#[tokio::test]
async fn test_sign_up_input_is_validated() {
    let (app, state) = common::create_test_app();
    let writes = common::memory(&state).write_count();

    let response = common::send(
        &app,
        common::request(
            "POST",
            "/auth/signup",
            None,
            Some(json!({ "email": "not-an-email", "password": "123", "name": "" })),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "bad_request");
    assert_eq!(common::memory(&state).write_count(), writes);
}

#[tokio::test]
async fn test_sign_up_rejects_blank_name() {
    let (app, state) = common::create_test_app();
    let writes = common::memory(&state).write_count();

    let response = common::send(
        &app,
        common::request(
            "POST",
            "/auth/signup",
            None,
            Some(json!({ "email": "carla@example.com", "password": "password1", "name": "   " })),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(common::memory(&state).write_count(), writes);
}
