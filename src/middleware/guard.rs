// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route guard decision for protected pages.

use crate::models::Identity;
use crate::routes::LANDING_PATH;
use crate::services::session::SessionStatus;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

/// Seconds a client should wait before retrying a loading page.
const LOADING_RETRY_SECS: &str = "1";

#[derive(Debug, Clone, PartialEq)]
pub enum GuardDecision {
    Allow(Identity),
    /// Session still initializing: render a placeholder, do not redirect.
    Loading,
    Redirect(&'static str),
}

pub fn evaluate(status: SessionStatus) -> GuardDecision {
    match status {
        SessionStatus::SignedIn(identity) => GuardDecision::Allow(identity),
        SessionStatus::Loading => GuardDecision::Loading,
        SessionStatus::SignedOut => GuardDecision::Redirect(LANDING_PATH),
    }
}

/// Placeholder served while the session is still loading.
pub fn loading_response() -> Response {
    let mut response = (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "status": "loading" })),
    )
        .into_response();
    response.headers_mut().insert(
        header::RETRY_AFTER,
        HeaderValue::from_static(LOADING_RETRY_SECS),
    );
    response
}
