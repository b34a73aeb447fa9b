// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Administrative actions over all users and scans.
//!
//! Callers must already have checked the admin role; nothing here does.

use crate::config::PlanCatalog;
use crate::error::{AppError, Result};
use crate::models::{
    sort_newest_first, AuthUser, Grade, Identity, Plan, Profile, ProfilePatch, Role, Scan,
    ScanStatus, UserMetadata,
};
use crate::remote::RemoteService;
use crate::services::scans::ScanStore;
use crate::time_utils::{format_date, format_utc_rfc3339};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Row in the admin user table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub plan: Plan,
    pub role: Role,
    pub scan_count: u32,
    pub scan_limit: Option<u32>,
    /// Date of the most recent scan, if any
    pub last_scan: Option<String>,
}

/// Headline numbers for the admin panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminOverview {
    pub total_users: usize,
    pub paying_users: usize,
    /// Scan rows of any status
    pub total_scans: usize,
    pub failed_scans: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteReport {
    pub user_id: Uuid,
    pub scans_deleted: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplayReport {
    /// New scans created by the replay
    pub replayed: Vec<Scan>,
    /// Failed scan ids that could not be replayed, with the reason
    pub skipped: Vec<(Uuid, String)>,
}

/// One line of the scan log export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanLogEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: Option<String>,
    pub url: String,
    pub status: ScanStatus,
    pub grade: Option<Grade>,
    pub score: Option<u8>,
    pub created_at: String,
}

#[derive(Clone)]
pub struct AdminService {
    remote: RemoteService,
    scans: Arc<ScanStore>,
    catalog: PlanCatalog,
}

impl AdminService {
    pub fn new(remote: RemoteService, scans: Arc<ScanStore>, catalog: PlanCatalog) -> Self {
        Self {
            remote,
            scans,
            catalog,
        }
    }

    pub async fn list_users(&self) -> Result<Vec<UserSummary>> {
        let profiles = self.remote.list_profiles().await?;
        let scans = self.remote.list_all_scans().await?;

        let mut last_scan: HashMap<Uuid, chrono::DateTime<chrono::Utc>> = HashMap::new();
        for scan in &scans {
            let entry = last_scan.entry(scan.user_id).or_insert(scan.created_at);
            if scan.created_at > *entry {
                *entry = scan.created_at;
            }
        }

        let mut users: Vec<UserSummary> = profiles
            .iter()
            .map(|profile| {
                let identity = self.identity_for(profile);
                UserSummary {
                    id: identity.id,
                    email: identity.email,
                    name: identity.name,
                    plan: identity.plan,
                    role: identity.role,
                    scan_count: identity.scan_count,
                    scan_limit: identity.scan_limit,
                    last_scan: last_scan.get(&profile.id).copied().map(format_date),
                }
            })
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));

        Ok(users)
    }

    pub async fn overview(&self) -> Result<AdminOverview> {
        let profiles = self.remote.list_profiles().await?;
        let scans = self.remote.list_all_scans().await?;

        Ok(AdminOverview {
            total_users: profiles.len(),
            paying_users: profiles
                .iter()
                .filter(|p| self.identity_for(p).plan != Plan::Free)
                .count(),
            total_scans: scans.len(),
            failed_scans: scans
                .iter()
                .filter(|s| s.status == ScanStatus::Failed)
                .count(),
        })
    }

    /// Move a user to `plan`, taking the quota from the plan catalog.
    pub async fn set_plan(&self, user_id: Uuid, plan: Plan) -> Result<Identity> {
        let patch = ProfilePatch {
            plan: Some(plan),
            scan_limit: Some(self.catalog.get(plan).scan_limit),
            ..Default::default()
        };

        let profile = self
            .remote
            .update_profile(user_id, &patch)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        tracing::info!(user_id = %user_id, plan = plan.as_str(), "Plan changed by admin");
        Ok(self.identity_for(&profile))
    }

    /// Delete the user's scans, then the profile.
    pub async fn delete_user(&self, user_id: Uuid) -> Result<DeleteReport> {
        let scans_deleted = self.remote.delete_scans_for_user(user_id).await?;
        let deleted = self.remote.delete_profile(user_id).await?;
        self.scans.evict(user_id);

        if !deleted && scans_deleted == 0 {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }

        tracing::info!(user_id = %user_id, scans_deleted, "User deleted by admin");
        Ok(DeleteReport {
            user_id,
            scans_deleted,
        })
    }

    pub async fn failed_scans(&self) -> Result<Vec<Scan>> {
        let mut scans = self.remote.list_scans_with_status(ScanStatus::Failed).await?;
        sort_newest_first(&mut scans);
        Ok(scans)
    }

    /// Resubmit every failed scan on behalf of its owner.
    ///
    /// Each replay is a fresh submission and counts against the owner's
    /// quota. The failed rows are left as they are.
    pub async fn replay_failed(&self) -> Result<ReplayReport> {
        let failed = self.failed_scans().await?;
        let mut report = ReplayReport::default();

        for scan in failed {
            let owner = match self.remote.get_profile(scan.user_id).await? {
                Some(profile) => self.identity_for(&profile),
                None => {
                    report.skipped.push((scan.id, "owner no longer exists".to_string()));
                    continue;
                }
            };

            match self.scans.submit(&owner, &scan.url).await {
                Ok(replayed) => report.replayed.push(replayed),
                Err(e) => {
                    tracing::warn!(scan_id = %scan.id, error = %e, "Replay of failed scan did not succeed");
                    report.skipped.push((scan.id, e.to_string()));
                }
            }
        }

        tracing::info!(
            replayed = report.replayed.len(),
            skipped = report.skipped.len(),
            "Replayed failed scans"
        );
        Ok(report)
    }

    /// Every scan, newest first, with the owner's e-mail.
    pub async fn export_scans(&self) -> Result<Vec<ScanLogEntry>> {
        let emails: HashMap<Uuid, String> = self
            .remote
            .list_profiles()
            .await?
            .into_iter()
            .map(|p| (p.id, p.email))
            .collect();

        let mut scans = self.remote.list_all_scans().await?;
        sort_newest_first(&mut scans);

        Ok(scans
            .into_iter()
            .map(|scan| ScanLogEntry {
                id: scan.id,
                user_id: scan.user_id,
                email: emails.get(&scan.user_id).cloned(),
                url: scan.url,
                status: scan.status,
                grade: scan.grade,
                score: scan.score,
                created_at: format_utc_rfc3339(scan.created_at),
            })
            .collect())
    }

    fn identity_for(&self, profile: &Profile) -> Identity {
        let user = AuthUser {
            id: profile.id,
            email: profile.email.clone(),
            user_metadata: UserMetadata::default(),
        };
        Identity::derive(&user, Some(profile), &self.catalog)
    }
}
