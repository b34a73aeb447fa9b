// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use pricing_grader::error::AppError;

async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_quota_message_is_user_facing() {
    let (status, body) = body_json(AppError::QuotaExceeded).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "quota_exceeded");
    assert_eq!(
        body["details"],
        "Scan limit reached. Upgrade to Pro for unlimited scans."
    );
}

#[tokio::test]
async fn test_scan_failure_is_generic() {
    let (status, body) = body_json(AppError::ScanFailed).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["details"], "Scan failed - please retry");
}

#[tokio::test]
async fn test_remote_details_are_not_leaked() {
    let (status, body) =
        body_json(AppError::Remote("connection refused to 10.0.0.5".to_string())).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "remote_error");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_auth_message_is_passed_through() {
    let (status, body) = body_json(AppError::Auth("Email not confirmed".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], "Email not confirmed");
}

#[test]
fn test_display_matches_user_messages() {
    assert_eq!(AppError::QuotaExceeded.to_string(), AppError::QUOTA_EXCEEDED);
    assert_eq!(AppError::ScanFailed.to_string(), AppError::SCAN_FAILED);
}
