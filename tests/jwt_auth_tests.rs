// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route guard and access token tests.
//!
//! Every protected page sends signed-out visitors to the landing page, and
//! tokens the auth provider issues are accepted by the guard.

use axum::http::{header, StatusCode};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use pricing_grader::middleware::auth::{decode_access_token, Claims};
use pricing_grader::routes::{LANDING_PATH, PAGES};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

mod common;

const SIGNING_KEY: &[u8] = b"test_jwt_key_32_bytes_minimum!!";

fn page_uri(path: &str) -> String {
    path.replace("{id}", &Uuid::new_v4().to_string())
}

fn forged_token(key: &[u8], aud: &str, exp_offset: i64) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: Uuid::new_v4().to_string(),
        email: "mallory@example.com".to_string(),
        aud: aud.to_string(),
        session_id: Uuid::new_v4().to_string(),
        iat: now as usize,
        exp: (now + exp_offset) as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(key),
    )
    .unwrap()
}

#[tokio::test]
async fn test_protected_pages_redirect_when_signed_out() {
    let (app, _) = common::create_test_app();

    for page in PAGES.iter().filter(|p| p.protected) {
        let response = common::send(
            &app,
            common::request("GET", &page_uri(page.path), None, None),
        )
        .await;

        assert_eq!(
            response.status,
            StatusCode::SEE_OTHER,
            "{} should redirect",
            page.path
        );
        assert_eq!(response.headers.get(header::LOCATION).unwrap(), LANDING_PATH);
    }
}

#[tokio::test]
async fn test_landing_is_public() {
    let (app, _) = common::create_test_app();

    let response = common::send(&app, common::request("GET", "/", None, None)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["app_name"], "Pricing Page Analyzer");
    assert_eq!(response.body["plans"].as_array().unwrap().len(), 3);
    assert_eq!(response.body["plans"][0]["scan_limit"], 3);
}

#[tokio::test]
async fn test_signed_in_user_reaches_protected_pages() {
    let (app, _) = common::create_test_app();
    let user = common::sign_up(&app, "carla@example.com", "Carla").await;

    for uri in ["/dashboard", "/settings", "/compare"] {
        let response = common::send(&app, common::request("GET", uri, Some(&user.token), None)).await;
        assert_eq!(response.status, StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn test_issued_token_decodes_with_audience() {
    let (app, _) = common::create_test_app();
    let user = common::sign_up(&app, "carla@example.com", "Carla").await;

    let claims = decode_access_token(&user.token, SIGNING_KEY).unwrap();
    assert_eq!(claims.sub, user.id);
    assert_eq!(claims.aud, "authenticated");
}

#[tokio::test]
async fn test_unverifiable_tokens_are_signed_out() {
    let (app, _) = common::create_test_app();

    let tokens = [
        forged_token(b"some_other_signing_key_entirely!", "authenticated", 3600),
        forged_token(SIGNING_KEY, "anon", 3600),
        forged_token(SIGNING_KEY, "authenticated", -3600),
        "not-a-jwt".to_string(),
    ];

    for token in tokens {
        let response = common::send(
            &app,
            common::request("GET", "/dashboard", Some(&token), None),
        )
        .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
    }
}

#[tokio::test]
async fn test_valid_signature_for_unknown_session_is_signed_out() {
    let (app, _) = common::create_test_app();
    let token = forged_token(SIGNING_KEY, "authenticated", 3600);

    let response = common::send(&app, common::request("GET", "/dashboard", Some(&token), None)).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _) = common::create_test_app();
    let response = common::send(&app, common::request("GET", "/health", None, None)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.headers.get("cache-control").unwrap(), "no-store");
}
