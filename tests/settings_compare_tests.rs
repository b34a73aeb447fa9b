// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Settings page and competitor comparison tests.

use axum::http::StatusCode;
use pricing_grader::config::{Config, FeatureFlags};
use serde_json::json;

mod common;

#[tokio::test]
async fn test_settings_default_then_saved() {
    let (app, _) = common::create_test_app();
    let user = common::sign_up(&app, "carla@example.com", "Carla").await;

    let defaults = common::send(&app, common::request("GET", "/settings", Some(&user.token), None)).await;
    assert_eq!(defaults.status, StatusCode::OK);
    assert_eq!(defaults.body["schedule_cron"], "0 9 * * 1");
    assert_eq!(defaults.body["email_notifications"], true);

    let saved = common::send(
        &app,
        common::request(
            "PUT",
            "/settings",
            Some(&user.token),
            Some(json!({
                "schedule_cron": "0 6 * * *",
                "competitor_url": "https://rival.example/pricing",
                "email_notifications": false,
                "slack_webhook": "",
            })),
        ),
    )
    .await;
    assert_eq!(saved.status, StatusCode::OK);
    assert!(saved.body["slack_webhook"].is_null());

    let reloaded = common::send(&app, common::request("GET", "/settings", Some(&user.token), None)).await;
    assert_eq!(reloaded.body["schedule_cron"], "0 6 * * *");
    assert_eq!(reloaded.body["email_notifications"], false);

    let compare_page = common::send(&app, common::request("GET", "/compare", Some(&user.token), None)).await;
    assert_eq!(compare_page.body["competitor_url"], "https://rival.example/pricing");
}

#[tokio::test]
async fn test_invalid_settings_are_rejected() {
    let (app, _) = common::create_test_app();
    let user = common::sign_up(&app, "carla@example.com", "Carla").await;

    for body in [
        json!({ "schedule_cron": "every monday" }),
        json!({ "slack_webhook": "https://evil.example/hook" }),
        json!({ "competitor_url": "not a url" }),
        json!({ "competitor_url": "ftp://rival.example/pricing" }),
    ] {
        let response = common::send(&app, common::request("PUT", "/settings", Some(&user.token), Some(body.clone()))).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{body}");
    }
}

#[tokio::test]
async fn test_schedule_change_needs_scheduled_scans() {
    let config = Config {
        features: FeatureFlags {
            scheduled_scans: false,
            ..FeatureFlags::default()
        },
        ..Config::test_default()
    };
    let (app, _) = common::create_test_app_with_config(config);
    let user = common::sign_up(&app, "carla@example.com", "Carla").await;

    let response = common::send(
        &app,
        common::request("PUT", "/settings", Some(&user.token), Some(json!({ "schedule_cron": "0 6 * * *" }))),
    )
    .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["details"], "scheduled_scans");
}

#[tokio::test]
async fn test_compare_two_pages() {
    let (app, state) = common::create_test_app();
    let user = common::sign_up(&app, "carla@example.com", "Carla").await;
    let writes = common::memory(&state).write_count();

    let response = common::send(
        &app,
        common::request(
            "POST",
            "/compare",
            Some(&user.token),
            Some(json!({
                "primary_url": "https://mine.example/pricing",
                "competitor_url": "https://rival.example/pricing",
            })),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["primary"]["url"], "https://mine.example/pricing");
    assert_eq!(response.body["competitor"]["url"], "https://rival.example/pricing");
    assert!(!response.body["insights"].as_array().unwrap().is_empty());
    // Comparisons do not use the scan quota
    assert_eq!(common::memory(&state).write_count(), writes);
}

#[tokio::test]
async fn test_compare_rejects_bad_urls() {
    let (app, _) = common::create_test_app();
    let user = common::sign_up(&app, "carla@example.com", "Carla").await;

    let response = common::send(
        &app,
        common::request(
            "POST",
            "/compare",
            Some(&user.token),
            Some(json!({ "primary_url": "", "competitor_url": "https://rival.example" })),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["details"], "Please enter a URL");
}

#[tokio::test]
async fn test_compare_flag_disables_page() {
    let config = Config {
        features: FeatureFlags {
            competitor_compare: false,
            ..FeatureFlags::default()
        },
        ..Config::test_default()
    };
    let (app, _) = common::create_test_app_with_config(config);
    let user = common::sign_up(&app, "carla@example.com", "Carla").await;

    let response = common::send(&app, common::request("GET", "/compare", Some(&user.token), None)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "feature_disabled");
}
