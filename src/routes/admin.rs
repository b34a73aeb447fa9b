// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin panel routes. Mounted behind `require_identity` and `require_admin`.

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Identity, Plan, Scan};
use crate::services::admin::{AdminOverview, DeleteReport, ReplayReport, UserSummary};
use crate::time_utils::export_file_name;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin", get(overview))
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}", axum::routing::delete(delete_user))
        .route("/admin/users/{id}/plan", put(set_plan))
        .route("/admin/scans/failed", get(failed_scans))
        .route("/admin/scans/failed/replay", post(replay_failed))
        .route("/admin/scans/export", get(export_scans))
}

async fn overview(State(state): State<Arc<AppState>>) -> Result<Json<AdminOverview>> {
    state.admin.overview().await.map(Json)
}

async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<UserSummary>>> {
    state.admin.list_users().await.map(Json)
}

#[derive(Debug, Deserialize)]
pub struct SetPlanRequest {
    pub plan: Plan,
}

async fn set_plan(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<SetPlanRequest>,
) -> Result<Json<Identity>> {
    state.admin.set_plan(user_id, body.plan).await.map(Json)
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<DeleteReport>> {
    state.admin.delete_user(user_id).await.map(Json)
}

async fn failed_scans(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Scan>>> {
    state.admin.failed_scans().await.map(Json)
}

async fn replay_failed(State(state): State<Arc<AppState>>) -> Result<Json<ReplayReport>> {
    state.admin.replay_failed().await.map(Json)
}

/// Scan log as a JSON download.
async fn export_scans(State(state): State<Arc<AppState>>) -> Result<Response> {
    let entries = state.admin.export_scans().await?;
    let file_name = export_file_name("scans", chrono::Utc::now());

    let mut response = Json(entries).into_response();
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\"")) {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}
