// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod identity;
pub mod scan;
pub mod settings;

pub use identity::{AuthUser, Identity, Plan, Profile, ProfilePatch, Role, UserMetadata};
pub use scan::{is_http_url, sort_newest_first, Grade, Scan, ScanMetrics, ScanStatus, ScanUpdate};
pub use settings::UserSettings;
