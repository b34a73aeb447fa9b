// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Pricing-page grader: submit a pricing page URL, get a graded report.
//!
//! This crate provides the backend API: accounts and sessions, per-plan scan
//! quotas, the synthetic grading pipeline and the admin panel.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod remote;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use remote::RemoteService;
use services::{AdminService, EventBus, Grader, ScanStore, SessionStore};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub remote: RemoteService,
    pub events: EventBus,
    pub sessions: Arc<SessionStore>,
    pub scans: Arc<ScanStore>,
    pub admin: AdminService,
}

impl AppState {
    /// Wire the stores together. Must be called from within a Tokio runtime.
    pub fn build(config: Config, remote: RemoteService) -> Arc<Self> {
        let events = EventBus::default();
        let sessions = SessionStore::start(remote.clone(), config.clone(), events.clone());
        let scans = ScanStore::start(
            remote.clone(),
            sessions.clone(),
            Grader,
            config.scan_delay,
            events.clone(),
        );
        let admin = AdminService::new(remote.clone(), scans.clone(), config.plans.clone());

        Arc::new(Self {
            config,
            remote,
            events,
            sessions,
            scans,
            admin,
        })
    }
}
