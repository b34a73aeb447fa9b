// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    /// Auth provider rejection, surfaced verbatim to the form.
    #[error("{0}")]
    Auth(String),

    #[error("Scan limit reached. Upgrade to Pro for unlimited scans.")]
    QuotaExceeded,

    #[error("Scan failed - please retry")]
    ScanFailed,

    #[error("Forbidden")]
    Forbidden,

    #[error("Feature disabled: {0}")]
    FeatureDisabled(&'static str),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub const QUOTA_EXCEEDED: &'static str =
        "Scan limit reached. Upgrade to Pro for unlimited scans.";
    pub const SCAN_FAILED: &'static str = "Scan failed - please retry";
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::BadRequest(errors.to_string())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::Auth(msg) => (StatusCode::BAD_REQUEST, "auth_error", Some(msg.clone())),
            AppError::QuotaExceeded => (
                StatusCode::FORBIDDEN,
                "quota_exceeded",
                Some(Self::QUOTA_EXCEEDED.to_string()),
            ),
            AppError::ScanFailed => (
                StatusCode::BAD_GATEWAY,
                "scan_failed",
                Some(Self::SCAN_FAILED.to_string()),
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", None),
            AppError::FeatureDisabled(name) => (
                StatusCode::NOT_FOUND,
                "feature_disabled",
                Some(name.to_string()),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Remote(msg) => {
                tracing::error!(error = %msg, "Remote store error");
                (StatusCode::BAD_GATEWAY, "remote_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
