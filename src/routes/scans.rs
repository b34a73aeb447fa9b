// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scan list, submission and replay.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Identity, Scan};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/scans", get(list_scans).post(submit_scan))
        .route("/scan/{id}/replay", post(replay_scan))
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub url: String,
}

async fn list_scans(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<Scan>>> {
    state.scans.fetch(&identity).await.map(Json)
}

/// Runs the whole grading pipeline; responds once the scan has completed.
async fn submit_scan(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<Scan>)> {
    let scan = state.scans.submit(&identity, &body.url).await?;
    Ok((StatusCode::CREATED, Json(scan)))
}

async fn replay_scan(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(scan_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Scan>)> {
    // Replay looks in the cached list, so make sure it is there
    state.scans.ensure_loaded(&identity).await?;

    match state.scans.replay(&identity, scan_id).await? {
        Some(scan) => Ok((StatusCode::CREATED, Json(scan))),
        None => Err(AppError::NotFound(format!("Scan {} not found", scan_id))),
    }
}
