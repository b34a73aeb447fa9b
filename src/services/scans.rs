// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scan store: per-user scan lists and the submission pipeline.

use crate::error::{AppError, Result};
use crate::models::{is_http_url, sort_newest_first, Identity, Scan, ScanUpdate};
use crate::remote::RemoteService;
use crate::services::events::{AppEvent, EventBus};
use crate::services::grader::{Comparison, Grader};
use crate::services::session::SessionStore;
use dashmap::DashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use uuid::Uuid;

pub const EMPTY_URL: &str = "Please enter a URL";

/// Trim and check a submitted page URL. Only http(s) is accepted.
pub fn normalize_url(raw: &str) -> Result<String> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(AppError::BadRequest(EMPTY_URL.to_string()));
    }

    if !is_http_url(url) {
        return Err(AppError::BadRequest(format!(
            "Not a valid http(s) URL: {}",
            url
        )));
    }

    Ok(url.to_string())
}

pub struct ScanStore {
    remote: RemoteService,
    sessions: Arc<SessionStore>,
    grader: Grader,
    delay: Duration,
    events: EventBus,
    /// user -> scans, newest first
    cache: DashMap<Uuid, Vec<Scan>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl ScanStore {
    /// Create the store. A cached scan list is dropped when its user signs out.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        remote: RemoteService,
        sessions: Arc<SessionStore>,
        grader: Grader,
        delay: Duration,
        events: EventBus,
    ) -> Arc<Self> {
        let feed = events.subscribe();
        let store = Arc::new(Self {
            remote,
            sessions,
            grader,
            delay,
            events,
            cache: DashMap::new(),
            listener: Mutex::new(None),
        });

        let handle = tokio::spawn(evict_on_sign_out(Arc::downgrade(&store), feed));
        if let Ok(mut slot) = store.listener.lock() {
            *slot = Some(handle);
        }

        store
    }

    pub fn shutdown(&self) {
        if let Ok(mut slot) = self.listener.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
                tracing::debug!("Scan cache listener stopped");
            }
        }
    }

    /// Load the user's scans from the remote store, replacing the cache.
    pub async fn fetch(&self, identity: &Identity) -> Result<Vec<Scan>> {
        let mut scans = self.remote.list_scans(identity.id).await?;
        sort_newest_first(&mut scans);
        self.cache.insert(identity.id, scans.clone());
        tracing::debug!(user_id = %identity.id, count = scans.len(), "Fetched scans");
        Ok(scans)
    }

    /// Cached list, fetching on first use.
    pub async fn ensure_loaded(&self, identity: &Identity) -> Result<Vec<Scan>> {
        match self.cached(identity.id) {
            Some(scans) => Ok(scans),
            None => self.fetch(identity).await,
        }
    }

    pub fn cached(&self, user_id: Uuid) -> Option<Vec<Scan>> {
        self.cache.get(&user_id).map(|scans| scans.value().clone())
    }

    pub fn get_by_id(&self, identity: &Identity, scan_id: Uuid) -> Option<Scan> {
        self.cache
            .get(&identity.id)
            .and_then(|scans| scans.iter().find(|s| s.id == scan_id).cloned())
    }

    pub fn evict(&self, user_id: Uuid) {
        self.cache.remove(&user_id);
    }

    /// Submit a page for grading and wait for the result.
    pub async fn submit(&self, identity: &Identity, url: &str) -> Result<Scan> {
        let url = normalize_url(url)?;

        if identity.quota_exhausted() {
            tracing::info!(
                user_id = %identity.id,
                scan_count = identity.scan_count,
                scan_limit = ?identity.scan_limit,
                "Scan rejected, quota exhausted"
            );
            return Err(AppError::QuotaExceeded);
        }

        let pending = match self.remote.reserve_scan(identity.id, &url).await {
            Ok(scan) => scan,
            Err(AppError::QuotaExceeded) => {
                // Another submission used the last slot first
                tracing::info!(user_id = %identity.id, "Scan rejected at reservation, quota exhausted");
                if let Err(e) = self.sessions.refresh(identity.id).await {
                    tracing::warn!(error = %e, "Failed to refresh identity after quota rejection");
                }
                return Err(AppError::QuotaExceeded);
            }
            Err(e) => {
                tracing::error!(error = %e, user_id = %identity.id, "Failed to reserve scan");
                return Err(AppError::ScanFailed);
            }
        };

        tracing::info!(user_id = %identity.id, scan_id = %pending.id, url = %url, "Scan accepted");
        self.publish(&pending);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let update = self.grader.analyze().into_update();
        let completed = match self.remote.update_scan(pending.id, &update).await {
            Ok(scan) => scan,
            Err(e) => {
                tracing::error!(error = %e, scan_id = %pending.id, "Failed to store scan result");
                self.mark_failed(&pending).await;
                self.release_slot(identity).await;
                return Err(AppError::ScanFailed);
            }
        };

        tracing::info!(
            scan_id = %completed.id,
            grade = ?completed.grade,
            score = ?completed.score,
            "Scan completed"
        );
        self.publish(&completed);

        if let Err(e) = self.sync_after_scan(identity).await {
            tracing::error!(error = %e, user_id = %identity.id, "Failed to refresh after scan");
            return Err(AppError::ScanFailed);
        }

        Ok(completed)
    }

    /// Re-run a cached scan's URL. `None` when the id is unknown.
    pub async fn replay(&self, identity: &Identity, scan_id: Uuid) -> Result<Option<Scan>> {
        let Some(original) = self.get_by_id(identity, scan_id) else {
            tracing::debug!(scan_id = %scan_id, "Replay of unknown scan ignored");
            return Ok(None);
        };

        tracing::info!(scan_id = %scan_id, "Replaying scan");
        self.submit(identity, &original.url).await.map(Some)
    }

    /// Grade the user's page against a competitor's.
    pub async fn compare(&self, primary_url: &str, competitor_url: &str) -> Result<Comparison> {
        let primary = normalize_url(primary_url)?;
        let competitor = normalize_url(competitor_url)?;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        Ok(self.grader.compare(&primary, &competitor))
    }

    async fn sync_after_scan(&self, identity: &Identity) -> Result<()> {
        self.sessions.refresh(identity.id).await?;
        self.fetch(identity).await?;
        Ok(())
    }

    async fn mark_failed(&self, pending: &Scan) {
        match self.remote.update_scan(pending.id, &ScanUpdate::failed()).await {
            Ok(failed) => self.publish(&failed),
            Err(e) => tracing::warn!(
                error = %e,
                scan_id = %pending.id,
                "Could not mark scan failed, leaving it pending"
            ),
        }
    }

    /// A scan that never completed does not count against the quota.
    async fn release_slot(&self, identity: &Identity) {
        match self.remote.release_scan(identity.id).await {
            Ok(scan_count) => {
                tracing::info!(user_id = %identity.id, scan_count, "Released scan slot");
                if let Err(e) = self.sessions.refresh(identity.id).await {
                    tracing::warn!(error = %e, "Failed to refresh identity after releasing slot");
                }
            }
            Err(e) => tracing::warn!(
                error = %e,
                user_id = %identity.id,
                "Could not release scan slot"
            ),
        }
    }

    fn publish(&self, scan: &Scan) {
        self.events.publish(AppEvent::Scan {
            user_id: scan.user_id,
            scan: scan.clone(),
        });
    }
}

impl Drop for ScanStore {
    fn drop(&mut self) {
        if let Ok(slot) = self.listener.get_mut() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

async fn evict_on_sign_out(store: Weak<ScanStore>, mut feed: broadcast::Receiver<AppEvent>) {
    loop {
        let user_id = match feed.recv().await {
            Ok(AppEvent::Session {
                user_id,
                identity: None,
            }) => user_id,
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Scan cache listener fell behind");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let Some(store) = store.upgrade() else {
            break;
        };
        store.evict(user_id);
        tracing::debug!(user_id = %user_id, "Dropped cached scans after sign-out");
    }
}
