// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Page routes: landing, dashboard, scan detail, compare, settings.

use axum::{
    extract::{Path, State},
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::config::{FeatureFlags, PlanConfig, APP_NAME};
use crate::error::{AppError, Result};
use crate::models::{Identity, Plan, ProfilePatch, Scan, UserSettings};
use crate::services::grader::Comparison;
use crate::AppState;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(landing))
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/scan/{id}", get(scan_detail))
        .route("/compare", get(compare_page).post(compare))
        .route("/settings", get(get_settings).put(put_settings))
}

// ─── Landing ─────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct PlanOffer {
    pub id: Plan,
    #[serde(flatten)]
    pub config: PlanConfig,
}

#[derive(Serialize)]
pub struct LandingPage {
    pub app_name: &'static str,
    pub plans: Vec<PlanOffer>,
    pub features: FeatureFlags,
}

async fn landing(State(state): State<Arc<AppState>>) -> Json<LandingPage> {
    let plans = [Plan::Free, Plan::Pro, Plan::Enterprise]
        .into_iter()
        .map(|id| PlanOffer {
            id,
            config: state.config.plans.get(id).clone(),
        })
        .collect();

    Json(LandingPage {
        app_name: APP_NAME,
        plans,
        features: state.config.features,
    })
}

// ─── Dashboard ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct QuotaSummary {
    pub used: u32,
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    pub label: String,
}

impl QuotaSummary {
    pub fn for_identity(identity: &Identity) -> Self {
        let label = match identity.scan_limit {
            Some(limit) => format!("{}/{} scans used", identity.scan_count, limit),
            None => "Unlimited scans available".to_string(),
        };
        Self {
            used: identity.scan_count,
            limit: identity.scan_limit,
            remaining: identity.remaining_scans(),
            label,
        }
    }
}

#[derive(Serialize)]
pub struct DashboardPage {
    pub identity: Identity,
    pub quota: QuotaSummary,
    pub can_scan: bool,
    pub scans: Vec<Scan>,
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<DashboardPage>> {
    let scans = state.scans.fetch(&identity).await?;

    Ok(Json(DashboardPage {
        quota: QuotaSummary::for_identity(&identity),
        can_scan: !identity.quota_exhausted(),
        identity,
        scans,
    }))
}

// ─── Scan detail ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ScanPage {
    pub scan: Scan,
    pub share_url: String,
    pub pdf_export_available: bool,
}

async fn scan_detail(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(scan_id): Path<Uuid>,
) -> Result<Json<ScanPage>> {
    state.scans.ensure_loaded(&identity).await?;
    let scan = state
        .scans
        .get_by_id(&identity, scan_id)
        .ok_or_else(|| AppError::NotFound(format!("Scan {} not found", scan_id)))?;

    Ok(Json(ScanPage {
        share_url: state.config.full_url(&format!("/scan/{}", scan.id)),
        pdf_export_available: state.config.features.export_pdf && identity.plan != Plan::Free,
        scan,
    }))
}

// ─── Compare ─────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ComparePage {
    /// Prefilled from the saved settings
    pub competitor_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub primary_url: String,
    pub competitor_url: String,
}

async fn compare_page(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ComparePage>> {
    require_compare(&state)?;
    let settings = load_settings(&state, &identity).await?;
    Ok(Json(ComparePage {
        competitor_url: settings.competitor_url,
    }))
}

async fn compare(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<CompareRequest>,
) -> Result<Json<Comparison>> {
    require_compare(&state)?;
    let comparison = state
        .scans
        .compare(&body.primary_url, &body.competitor_url)
        .await?;

    tracing::info!(user_id = %identity.id, "Competitor comparison generated");
    Ok(Json(comparison))
}

fn require_compare(state: &AppState) -> Result<()> {
    if state.config.features.competitor_compare {
        Ok(())
    } else {
        Err(AppError::FeatureDisabled("competitor_compare"))
    }
}

// ─── Settings ────────────────────────────────────────────────────

async fn get_settings(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<UserSettings>> {
    load_settings(&state, &identity).await.map(Json)
}

async fn put_settings(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<UserSettings>,
) -> Result<Json<UserSettings>> {
    let settings = body.normalized();
    settings.validate()?;

    if !state.config.features.scheduled_scans
        && settings.schedule_cron != UserSettings::default().schedule_cron
    {
        return Err(AppError::FeatureDisabled("scheduled_scans"));
    }

    let patch = ProfilePatch {
        settings: Some(settings),
        ..Default::default()
    };
    let profile = state
        .remote
        .update_profile(identity.id, &patch)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    tracing::info!(user_id = %identity.id, "Settings saved");
    Ok(Json(profile.settings.unwrap_or_default()))
}

async fn load_settings(state: &AppState, identity: &Identity) -> Result<UserSettings> {
    let profile = state.remote.get_profile(identity.id).await?;
    Ok(profile.and_then(|p| p.settings).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn identity(scan_count: u32, scan_limit: Option<u32>) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: "carla@example.com".to_string(),
            name: "Carla".to_string(),
            plan: Plan::Free,
            scan_count,
            scan_limit,
            role: Role::User,
        }
    }

    #[test]
    fn test_quota_summary_limited() {
        let summary = QuotaSummary::for_identity(&identity(1, Some(3)));
        assert_eq!(summary.label, "1/3 scans used");
        assert_eq!(summary.remaining, Some(2));
    }

    #[test]
    fn test_quota_summary_unlimited() {
        let summary = QuotaSummary::for_identity(&identity(40, None));
        assert_eq!(summary.label, "Unlimited scans available");
        assert_eq!(summary.remaining, None);
    }
}
