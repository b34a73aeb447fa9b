// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session store: who is signed in, and their merged identity.
//!
//! Tokens map to users; each user has at most one cached status. The first
//! sync for a user is observable as [`SessionStatus::Loading`] so the route
//! guard can tell "not yet known" from "signed out". A background listener
//! keeps the cache in step with the remote session feed and is aborted when
//! the store is shut down or dropped.

use crate::config::Config;
use crate::error::Result;
use crate::models::{AuthUser, Identity, Profile};
use crate::remote::{AuthEvent, AuthSession, RemoteService};
use crate::services::events::{AppEvent, EventBus};
use dashmap::DashMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    /// Initial profile sync still in flight.
    Loading,
    SignedOut,
    SignedIn(Identity),
}

pub struct SessionStore {
    remote: RemoteService,
    config: Config,
    events: EventBus,
    /// access token -> user
    tokens: DashMap<String, Uuid>,
    /// Only `Loading` or `SignedIn`; absence means signed out.
    states: DashMap<Uuid, SessionStatus>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionStore {
    /// Create the store and subscribe it to the remote session feed.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(remote: RemoteService, config: Config, events: EventBus) -> Arc<Self> {
        let feed = remote.subscribe();
        let store = Arc::new(Self {
            remote,
            config,
            events,
            tokens: DashMap::new(),
            states: DashMap::new(),
            listener: Mutex::new(None),
        });

        let handle = tokio::spawn(listen(Arc::downgrade(&store), feed));
        if let Ok(mut slot) = store.listener.lock() {
            *slot = Some(handle);
        }

        store
    }

    /// Stop following the remote session feed.
    pub fn shutdown(&self) {
        if let Ok(mut slot) = self.listener.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
                tracing::debug!("Session listener stopped");
            }
        }
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<(AuthSession, Identity)> {
        let session = self.remote.sign_up(email, password, name).await?;
        let identity = self.establish(&session).await?;
        tracing::info!(user_id = %identity.id, "User signed up");
        Ok((session, identity))
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(AuthSession, Identity)> {
        let session = self.remote.sign_in(email, password).await?;
        let identity = self.establish(&session).await?;
        tracing::info!(user_id = %identity.id, "User signed in");
        Ok((session, identity))
    }

    async fn establish(&self, session: &AuthSession) -> Result<Identity> {
        self.tokens
            .insert(session.access_token.clone(), session.user.id);
        self.sync(&session.user).await
    }

    /// End the session for `token`. Unknown tokens are a no-op.
    pub async fn sign_out(&self, token: &str) -> Result<()> {
        let cached = self.tokens.get(token).map(|entry| *entry.value());
        let user_id = match cached {
            Some(user_id) => user_id,
            None => match self.remote.get_user(token).await? {
                Some(user) => user.id,
                None => return Ok(()),
            },
        };

        self.remote.sign_out(token, user_id).await?;
        self.tokens.remove(token);
        if !self.has_tokens(user_id) {
            self.evict(user_id);
        }

        tracing::info!(user_id = %user_id, "User signed out");
        Ok(())
    }

    /// Stop tracking a token that no longer verifies. No remote call.
    pub fn forget(&self, token: &str) {
        if let Some((_, user_id)) = self.tokens.remove(token) {
            if !self.has_tokens(user_id) {
                self.evict(user_id);
            }
            tracing::debug!(user_id = %user_id, "Dropped unverifiable session token");
        }
    }

    /// Resolve a token to a session status, syncing the profile on first use.
    pub async fn restore(&self, token: &str) -> Result<SessionStatus> {
        let cached = self.tokens.get(token).map(|entry| *entry.value());
        if let Some(user_id) = cached {
            let status = self.states.get(&user_id).map(|s| s.value().clone());
            if let Some(status) = status {
                return Ok(status);
            }
        }

        let Some(user) = self.remote.get_user(token).await? else {
            self.tokens.remove(token);
            return Ok(SessionStatus::SignedOut);
        };

        self.tokens.insert(token.to_string(), user.id);
        let identity = self.sync(&user).await?;
        Ok(SessionStatus::SignedIn(identity))
    }

    /// Re-read the profile of a signed-in user. `None` if not signed in.
    pub async fn refresh(&self, user_id: Uuid) -> Result<Option<Identity>> {
        let Some(identity) = self.identity(user_id) else {
            return Ok(None);
        };
        self.sync(&identity.auth_user()).await.map(Some)
    }

    pub fn status_of(&self, user_id: Uuid) -> SessionStatus {
        self.states
            .get(&user_id)
            .map(|s| s.value().clone())
            .unwrap_or(SessionStatus::SignedOut)
    }

    pub fn identity(&self, user_id: Uuid) -> Option<Identity> {
        match self.status_of(user_id) {
            SessionStatus::SignedIn(identity) => Some(identity),
            _ => None,
        }
    }

    fn has_tokens(&self, user_id: Uuid) -> bool {
        self.tokens.iter().any(|entry| *entry.value() == user_id)
    }

    fn evict(&self, user_id: Uuid) {
        if self.states.remove(&user_id).is_some() {
            self.events.publish(AppEvent::Session {
                user_id,
                identity: None,
            });
        }
    }

    async fn sync(&self, user: &AuthUser) -> Result<Identity> {
        self.states.entry(user.id).or_insert(SessionStatus::Loading);

        match self.load_identity(user).await {
            Ok(identity) => {
                self.states
                    .insert(user.id, SessionStatus::SignedIn(identity.clone()));
                self.events.publish(AppEvent::Session {
                    user_id: user.id,
                    identity: Some(identity.clone()),
                });
                Ok(identity)
            }
            Err(e) => {
                self.states
                    .remove_if(&user.id, |_, s| *s == SessionStatus::Loading);
                Err(e)
            }
        }
    }

    async fn load_identity(&self, user: &AuthUser) -> Result<Identity> {
        let profile = match self.remote.get_profile(user.id).await? {
            Some(profile) => profile,
            None => self.create_profile(user).await?,
        };
        Ok(Identity::derive(user, Some(&profile), &self.config.plans))
    }

    async fn create_profile(&self, user: &AuthUser) -> Result<Profile> {
        let is_admin = self.config.is_admin_email(&user.email);
        let profile = Profile::new_for(user, is_admin, &self.config.plans);

        match self.remote.insert_profile(&profile).await {
            Ok(created) => {
                tracing::info!(user_id = %user.id, is_admin, "Created profile");
                Ok(created)
            }
            Err(e) => {
                // A concurrent first sync may have inserted it already
                match self.remote.get_profile(user.id).await? {
                    Some(existing) => Ok(existing),
                    None => Err(e),
                }
            }
        }
    }

    async fn handle_event(&self, event: AuthEvent) {
        let result = match event {
            AuthEvent::SignedIn(user) => {
                if self.has_tokens(user.id) {
                    self.sync(&user).await.map(|_| ())
                } else {
                    Ok(())
                }
            }
            AuthEvent::SignedOut(user_id) => {
                if !self.has_tokens(user_id) {
                    self.evict(user_id);
                }
                Ok(())
            }
            AuthEvent::ProfileChanged(user_id) => self.refresh(user_id).await.map(|_| ()),
            AuthEvent::ProfileDeleted(user_id) => {
                // Next request re-syncs and recreates the profile
                self.states.remove(&user_id);
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to re-sync session after remote change");
        }
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        if let Ok(slot) = self.listener.get_mut() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

async fn listen(store: Weak<SessionStore>, mut feed: broadcast::Receiver<AuthEvent>) {
    loop {
        let event = match feed.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Session listener fell behind");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let Some(store) = store.upgrade() else {
            break;
        };
        store.handle_event(event).await;
    }
}
