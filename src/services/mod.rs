// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod admin;
pub mod events;
pub mod grader;
pub mod scans;
pub mod session;

pub use admin::AdminService;
pub use events::{AppEvent, EventBus};
pub use grader::Grader;
pub use scans::ScanStore;
pub use session::{SessionStatus, SessionStore};
