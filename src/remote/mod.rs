// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Remote data service: the hosted tables plus the auth provider.
//!
//! [`RemoteService`] is the single handle the stores talk to. It hides which
//! backend is in use and publishes an [`AuthEvent`] feed for session changes.

pub mod memory;
pub mod password;
pub mod rest;

pub use memory::MemoryBackend;
pub use rest::SupabaseClient;

use crate::config::Config;
use crate::error::Result;
use crate::models::{AuthUser, Profile, ProfilePatch, Scan, ScanStatus, ScanUpdate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Table names as constants.
pub mod tables {
    pub const PROFILES: &str = "profiles";
    pub const SCANS: &str = "scans";
}

const AUTH_EVENT_CAPACITY: usize = 256;

/// Session issued by the auth provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

/// Session-change notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn(AuthUser),
    SignedOut(Uuid),
    /// Profile row changed outside the owner's session (e.g. by an admin).
    ProfileChanged(Uuid),
    ProfileDeleted(Uuid),
}

#[derive(Clone)]
enum Backend {
    Supabase(SupabaseClient),
    Memory(Arc<MemoryBackend>),
}

/// Handle to the remote collaborator.
#[derive(Clone)]
pub struct RemoteService {
    backend: Backend,
    events: broadcast::Sender<AuthEvent>,
}

impl RemoteService {
    pub fn supabase(client: SupabaseClient) -> Self {
        Self::with_backend(Backend::Supabase(client))
    }

    pub fn memory(backend: Arc<MemoryBackend>) -> Self {
        Self::with_backend(Backend::Memory(backend))
    }

    fn with_backend(backend: Backend) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self { backend, events }
    }

    /// Hosted backend when `SUPABASE_URL` is configured, memory otherwise.
    pub fn from_config(config: &Config) -> Self {
        match (&config.supabase_url, &config.supabase_key) {
            (Some(url), Some(key)) => {
                tracing::info!(url = %url, "Using hosted store");
                Self::supabase(SupabaseClient::new(url, key))
            }
            (Some(url), None) => {
                tracing::warn!(url = %url, "SUPABASE_KEY missing, falling back to in-memory store");
                Self::memory(Arc::new(Self::memory_from_config(config)))
            }
            _ => {
                tracing::warn!("SUPABASE_URL not set, using in-memory store (data is not persisted)");
                Self::memory(Arc::new(Self::memory_from_config(config)))
            }
        }
    }

    fn memory_from_config(config: &Config) -> MemoryBackend {
        MemoryBackend::new(
            config.jwt_signing_key.clone(),
            config.session_ttl,
            config.plans.free.scan_limit,
        )
    }

    /// The memory backend, when that is what's in use.
    pub fn memory_backend(&self) -> Option<&Arc<MemoryBackend>> {
        match &self.backend {
            Backend::Memory(m) => Some(m),
            Backend::Supabase(_) => None,
        }
    }

    /// Subscribe to session changes. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: AuthEvent) {
        // Only fails when nobody is listening.
        let _ = self.events.send(event);
    }

    // ─── Auth ────────────────────────────────────────────────────

    pub async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<AuthSession> {
        let session = match &self.backend {
            Backend::Supabase(c) => c.sign_up(email, password, name).await?,
            Backend::Memory(m) => m.sign_up(email, password, name)?,
        };
        self.emit(AuthEvent::SignedIn(session.user.clone()));
        Ok(session)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let session = match &self.backend {
            Backend::Supabase(c) => c.sign_in(email, password).await?,
            Backend::Memory(m) => m.sign_in(email, password)?,
        };
        self.emit(AuthEvent::SignedIn(session.user.clone()));
        Ok(session)
    }

    pub async fn sign_out(&self, access_token: &str, user_id: Uuid) -> Result<()> {
        match &self.backend {
            Backend::Supabase(c) => c.sign_out(access_token).await?,
            Backend::Memory(m) => m.sign_out(access_token)?,
        }
        self.emit(AuthEvent::SignedOut(user_id));
        Ok(())
    }

    pub async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>> {
        match &self.backend {
            Backend::Supabase(c) => c.get_user(access_token).await,
            Backend::Memory(m) => m.get_user(access_token),
        }
    }

    // ─── Profiles ────────────────────────────────────────────────

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        match &self.backend {
            Backend::Supabase(c) => c.get_profile(user_id).await,
            Backend::Memory(m) => m.get_profile(user_id),
        }
    }

    pub async fn insert_profile(&self, profile: &Profile) -> Result<Profile> {
        match &self.backend {
            Backend::Supabase(c) => c.insert_profile(profile).await,
            Backend::Memory(m) => m.insert_profile(profile),
        }
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        patch: &ProfilePatch,
    ) -> Result<Option<Profile>> {
        let updated = match &self.backend {
            Backend::Supabase(c) => c.update_profile(user_id, patch).await?,
            Backend::Memory(m) => m.update_profile(user_id, patch)?,
        };
        if updated.is_some() {
            self.emit(AuthEvent::ProfileChanged(user_id));
        }
        Ok(updated)
    }

    pub async fn list_profiles(&self) -> Result<Vec<Profile>> {
        match &self.backend {
            Backend::Supabase(c) => c.list_profiles().await,
            Backend::Memory(m) => m.list_profiles(),
        }
    }

    pub async fn delete_profile(&self, user_id: Uuid) -> Result<bool> {
        let deleted = match &self.backend {
            Backend::Supabase(c) => c.delete_profile(user_id).await?,
            Backend::Memory(m) => m.delete_profile(user_id)?,
        };
        if deleted {
            self.emit(AuthEvent::ProfileDeleted(user_id));
        }
        Ok(deleted)
    }

    // ─── Scans ───────────────────────────────────────────────────

    /// All scans owned by a user, newest first.
    pub async fn list_scans(&self, user_id: Uuid) -> Result<Vec<Scan>> {
        match &self.backend {
            Backend::Supabase(c) => c.list_scans(user_id).await,
            Backend::Memory(m) => m.list_scans(user_id),
        }
    }

    pub async fn list_scans_with_status(&self, status: ScanStatus) -> Result<Vec<Scan>> {
        match &self.backend {
            Backend::Supabase(c) => c.list_scans_with_status(status).await,
            Backend::Memory(m) => m.list_scans_with_status(status),
        }
    }

    pub async fn list_all_scans(&self) -> Result<Vec<Scan>> {
        match &self.backend {
            Backend::Supabase(c) => c.list_all_scans().await,
            Backend::Memory(m) => m.list_all_scans(),
        }
    }

    /// Atomically check the quota, insert a pending scan and bump the count.
    ///
    /// Fails with `AppError::QuotaExceeded` when the limit is already reached.
    pub async fn reserve_scan(&self, user_id: Uuid, url: &str) -> Result<Scan> {
        match &self.backend {
            Backend::Supabase(c) => c.reserve_scan(user_id, url).await,
            Backend::Memory(m) => m.reserve_scan(user_id, url),
        }
    }

    /// Undo the count increment of a reservation whose scan never completed.
    pub async fn release_scan(&self, user_id: Uuid) -> Result<u32> {
        match &self.backend {
            Backend::Supabase(c) => c.release_scan(user_id).await,
            Backend::Memory(m) => m.release_scan(user_id),
        }
    }

    pub async fn update_scan(&self, scan_id: Uuid, update: &ScanUpdate) -> Result<Scan> {
        match &self.backend {
            Backend::Supabase(c) => c.update_scan(scan_id, update).await,
            Backend::Memory(m) => m.update_scan(scan_id, update),
        }
    }

    pub async fn delete_scans_for_user(&self, user_id: Uuid) -> Result<usize> {
        match &self.backend {
            Backend::Supabase(c) => c.delete_scans_for_user(user_id).await,
            Backend::Memory(m) => m.delete_scans_for_user(user_id),
        }
    }
}
