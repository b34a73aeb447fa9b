// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process stand-in for the hosted store and auth provider.
//!
//! Used for local development and tests. Mirrors the hosted behavior that
//! the rest of the app depends on: provider error messages, token format,
//! and the atomic `reserve_scan` operation.

use crate::error::{AppError, Result};
use crate::middleware::auth::create_access_token;
use crate::models::scan::sort_newest_first;
use crate::models::{AuthUser, Profile, ProfilePatch, Scan, ScanStatus, ScanUpdate, UserMetadata};
use crate::remote::password::{hash_password, verify_password};
use crate::remote::AuthSession;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

pub(crate) const DUPLICATE_USER: &str = "User already registered";
pub(crate) const INVALID_CREDENTIALS: &str = "Invalid login credentials";

struct Account {
    user_id: Uuid,
    password_hash: String,
}

/// Memory-backed tables and auth sessions.
pub struct MemoryBackend {
    signing_key: Vec<u8>,
    session_ttl: Duration,
    /// Quota applied when a profile row has no `scan_limit` column.
    default_scan_limit: Option<u32>,
    /// Keyed by lower-cased e-mail
    accounts: DashMap<String, Account>,
    users: DashMap<Uuid, AuthUser>,
    /// Access token -> user id
    sessions: DashMap<String, Uuid>,
    profiles: DashMap<Uuid, Profile>,
    scans: DashMap<Uuid, Scan>,
    writes: AtomicUsize,
    fail_scan_updates: AtomicBool,
}

impl MemoryBackend {
    pub fn new(signing_key: Vec<u8>, session_ttl: Duration, default_scan_limit: Option<u32>) -> Self {
        Self {
            signing_key,
            session_ttl,
            default_scan_limit,
            accounts: DashMap::new(),
            users: DashMap::new(),
            sessions: DashMap::new(),
            profiles: DashMap::new(),
            scans: DashMap::new(),
            writes: AtomicUsize::new(0),
            fail_scan_updates: AtomicBool::new(false),
        }
    }

    /// Number of table writes performed so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Simulate an outage on scan updates.
    pub fn set_fail_scan_updates(&self, fail: bool) {
        self.fail_scan_updates.store(fail, Ordering::SeqCst);
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    // ─── Auth ────────────────────────────────────────────────────

    pub fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<AuthSession> {
        let key = email.trim().to_lowercase();
        let password_hash = hash_password(password)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))?;

        let user = AuthUser {
            id: Uuid::new_v4(),
            email: key.clone(),
            user_metadata: UserMetadata {
                name: Some(name.to_string()),
            },
        };

        match self.accounts.entry(key) {
            Entry::Occupied(_) => return Err(AppError::Auth(DUPLICATE_USER.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Account {
                    user_id: user.id,
                    password_hash,
                });
            }
        }
        self.users.insert(user.id, user.clone());

        self.open_session(user)
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let key = email.trim().to_lowercase();
        let (user_id, password_hash) = self
            .accounts
            .get(&key)
            .map(|a| (a.user_id, a.password_hash.clone()))
            .ok_or_else(|| AppError::Auth(INVALID_CREDENTIALS.to_string()))?;

        let matches = verify_password(password, &password_hash)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Stored hash unreadable: {}", e)))?;
        if !matches {
            return Err(AppError::Auth(INVALID_CREDENTIALS.to_string()));
        }

        let user = self
            .users
            .get(&user_id)
            .map(|u| u.clone())
            .ok_or_else(|| AppError::Auth(INVALID_CREDENTIALS.to_string()))?;

        self.open_session(user)
    }

    fn open_session(&self, user: AuthUser) -> Result<AuthSession> {
        let access_token = create_access_token(&user, &self.signing_key, self.session_ttl)?;
        self.sessions.insert(access_token.clone(), user.id);

        Ok(AuthSession {
            access_token,
            expires_in: Some(self.session_ttl.as_secs()),
            user,
        })
    }

    pub fn sign_out(&self, access_token: &str) -> Result<()> {
        self.sessions.remove(access_token);
        Ok(())
    }

    /// User behind a live session, or `None` once signed out.
    pub fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>> {
        let Some(user_id) = self.sessions.get(access_token).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.users.get(&user_id).map(|u| u.clone()))
    }

    // ─── Profiles ────────────────────────────────────────────────

    pub fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        Ok(self.profiles.get(&user_id).map(|p| p.clone()))
    }

    pub fn insert_profile(&self, profile: &Profile) -> Result<Profile> {
        match self.profiles.entry(profile.id) {
            Entry::Occupied(_) => Err(AppError::Remote(format!(
                "duplicate key value violates unique constraint \"profiles_pkey\" ({})",
                profile.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(profile.clone());
                self.record_write();
                Ok(profile.clone())
            }
        }
    }

    pub fn update_profile(&self, user_id: Uuid, patch: &ProfilePatch) -> Result<Option<Profile>> {
        let Some(mut profile) = self.profiles.get_mut(&user_id) else {
            return Ok(None);
        };
        patch.apply(&mut profile);
        self.record_write();
        Ok(Some(profile.clone()))
    }

    pub fn list_profiles(&self) -> Result<Vec<Profile>> {
        let mut profiles: Vec<Profile> = self.profiles.iter().map(|p| p.clone()).collect();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(profiles)
    }

    pub fn delete_profile(&self, user_id: Uuid) -> Result<bool> {
        let removed = self.profiles.remove(&user_id).is_some();
        if removed {
            self.record_write();
        }
        Ok(removed)
    }

    // ─── Scans ───────────────────────────────────────────────────

    pub fn list_scans(&self, user_id: Uuid) -> Result<Vec<Scan>> {
        Ok(self.collect_scans(|s| s.user_id == user_id))
    }

    pub fn list_scans_with_status(&self, status: ScanStatus) -> Result<Vec<Scan>> {
        Ok(self.collect_scans(|s| s.status == status))
    }

    pub fn list_all_scans(&self) -> Result<Vec<Scan>> {
        Ok(self.collect_scans(|_| true))
    }

    fn collect_scans(&self, keep: impl Fn(&Scan) -> bool) -> Vec<Scan> {
        let mut scans: Vec<Scan> = self
            .scans
            .iter()
            .filter(|s| keep(s.value()))
            .map(|s| s.clone())
            .collect();
        sort_newest_first(&mut scans);
        scans
    }

    /// Check the quota, insert a pending scan and bump the count in one step.
    ///
    /// The profile entry stays locked for the whole operation, so concurrent
    /// reservations for the same user are serialized.
    pub fn reserve_scan(&self, user_id: Uuid, url: &str) -> Result<Scan> {
        let mut profile = self
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user_id)))?;

        let count = profile.scan_count.unwrap_or(0);
        let limit = profile.scan_limit.unwrap_or(self.default_scan_limit);
        if limit.is_some_and(|limit| count >= limit) {
            return Err(AppError::QuotaExceeded);
        }

        let scan = Scan::pending(user_id, url);
        self.scans.insert(scan.id, scan.clone());
        profile.scan_count = Some(count + 1);
        profile.updated_at = chrono::Utc::now();
        self.record_write();

        Ok(scan)
    }

    /// Give back a slot taken by `reserve_scan`. Returns the new count.
    pub fn release_scan(&self, user_id: Uuid) -> Result<u32> {
        let mut profile = self
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user_id)))?;

        let count = profile.scan_count.unwrap_or(0).saturating_sub(1);
        profile.scan_count = Some(count);
        profile.updated_at = chrono::Utc::now();
        self.record_write();

        Ok(count)
    }

    pub fn update_scan(&self, scan_id: Uuid, update: &ScanUpdate) -> Result<Scan> {
        if self.fail_scan_updates.load(Ordering::SeqCst) {
            return Err(AppError::Remote("connection reset by peer".to_string()));
        }

        let mut scan = self
            .scans
            .get_mut(&scan_id)
            .ok_or_else(|| AppError::NotFound(format!("Scan {} not found", scan_id)))?;
        update.apply(&mut scan);
        self.record_write();
        Ok(scan.clone())
    }

    pub fn delete_scans_for_user(&self, user_id: Uuid) -> Result<usize> {
        let before = self.scans.len();
        self.scans.retain(|_, s| s.user_id != user_id);
        let deleted = before.saturating_sub(self.scans.len());
        if deleted > 0 {
            self.record_write();
        }
        Ok(deleted)
    }
}
