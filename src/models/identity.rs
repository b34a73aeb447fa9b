// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity, profile and auth-provider user models.

use crate::config::PlanCatalog;
use crate::models::UserSettings;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Subscription tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Pro,
    Enterprise,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
            Plan::Enterprise => "enterprise",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// User record as returned by the auth provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub name: Option<String>,
}

/// Profile row stored in the `profiles` table (keyed by auth user id).
///
/// Every product field is optional; [`Identity::derive`] fills in defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub plan: Option<Plan>,
    #[serde(default)]
    pub scan_count: Option<u32>,
    /// `Some(None)` is an explicit null (unlimited); `None` means the
    /// column was absent and the default applies.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub scan_limit: Option<Option<u32>>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub settings: Option<UserSettings>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Profile created lazily on a user's first authenticated visit.
    ///
    /// Allow-listed admins get the enterprise tier with no quota.
    pub fn new_for(user: &AuthUser, is_admin: bool, catalog: &PlanCatalog) -> Self {
        let (plan, role) = if is_admin {
            (Plan::Enterprise, Role::Admin)
        } else {
            (Plan::Free, Role::User)
        };
        let now = Utc::now();

        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.user_metadata.name.clone(),
            plan: Some(plan),
            scan_count: Some(0),
            scan_limit: Some(catalog.get(plan).scan_limit),
            role: Some(role),
            settings: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Effective quota after defaults.
    pub fn effective_scan_limit(&self, catalog: &PlanCatalog) -> Option<u32> {
        self.scan_limit
            .unwrap_or_else(|| catalog.get(Plan::Free).scan_limit)
    }
}

/// Partial profile update. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_limit: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<UserSettings>,
}

impl ProfilePatch {
    pub fn apply(&self, profile: &mut Profile) {
        if let Some(name) = &self.name {
            profile.name = Some(name.clone());
        }
        if let Some(plan) = self.plan {
            profile.plan = Some(plan);
        }
        if let Some(count) = self.scan_count {
            profile.scan_count = Some(count);
        }
        if let Some(limit) = self.scan_limit {
            profile.scan_limit = Some(limit);
        }
        if let Some(role) = self.role {
            profile.role = Some(role);
        }
        if let Some(settings) = &self.settings {
            profile.settings = Some(settings.clone());
        }
        profile.updated_at = Utc::now();
    }
}

/// The public identity: auth-provider fields merged with the profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub plan: Plan,
    pub scan_count: u32,
    /// `None` means unlimited.
    pub scan_limit: Option<u32>,
    pub role: Role,
}

impl Identity {
    /// Merge an auth user with its (possibly missing) profile.
    pub fn derive(user: &AuthUser, profile: Option<&Profile>, catalog: &PlanCatalog) -> Self {
        let name = profile
            .and_then(|p| p.name.clone())
            .or_else(|| user.user_metadata.name.clone())
            .unwrap_or_else(|| default_display_name(&user.email));

        Self {
            id: user.id,
            email: user.email.clone(),
            name,
            plan: profile.and_then(|p| p.plan).unwrap_or_default(),
            scan_count: profile.and_then(|p| p.scan_count).unwrap_or(0),
            scan_limit: match profile {
                Some(p) => p.effective_scan_limit(catalog),
                None => catalog.get(Plan::Free).scan_limit,
            },
            role: profile.and_then(|p| p.role).unwrap_or_default(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// True when a finite quota has been used up.
    pub fn quota_exhausted(&self) -> bool {
        self.scan_limit
            .is_some_and(|limit| self.scan_count >= limit)
    }

    /// Scans left before the quota is hit; `None` when unlimited.
    pub fn remaining_scans(&self) -> Option<u32> {
        self.scan_limit
            .map(|limit| limit.saturating_sub(self.scan_count))
    }

    /// Reconstruct the auth-provider view of this identity (for re-syncs).
    pub fn auth_user(&self) -> AuthUser {
        AuthUser {
            id: self.id,
            email: self.email.clone(),
            user_metadata: UserMetadata {
                name: Some(self.name.clone()),
            },
        }
    }
}

fn default_display_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

/// Distinguish an explicit `null` from an absent field.
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
