// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user settings stored on the profile row.

use serde::{Deserialize, Serialize};
use super::scan::is_http_url;
use validator::{Validate, ValidationError};

const DEFAULT_SCHEDULE_CRON: &str = "0 9 * * 1";
const SLACK_WEBHOOK_PREFIX: &str = "https://hooks.slack.com/";

/// Scheduling and notification preferences.
///
/// The cron schedule is stored but nothing executes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserSettings {
    #[serde(default = "default_schedule_cron")]
    #[validate(custom(function = "validate_cron"))]
    pub schedule_cron: String,
    #[serde(default)]
    #[validate(custom(function = "validate_competitor_url"))]
    pub competitor_url: Option<String>,
    #[serde(default = "default_true")]
    pub email_notifications: bool,
    #[serde(default)]
    #[validate(custom(function = "validate_slack_webhook"))]
    pub slack_webhook: Option<String>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            schedule_cron: default_schedule_cron(),
            competitor_url: None,
            email_notifications: true,
            slack_webhook: None,
        }
    }
}

impl UserSettings {
    /// Treat blank form fields as unset.
    pub fn normalized(mut self) -> Self {
        self.schedule_cron = self.schedule_cron.trim().to_string();
        self.competitor_url = non_blank(self.competitor_url);
        self.slack_webhook = non_blank(self.slack_webhook);
        self
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn default_schedule_cron() -> String {
    DEFAULT_SCHEDULE_CRON.to_string()
}

fn default_true() -> bool {
    true
}

/// Five whitespace-separated fields, each drawn from the usual cron alphabet.
fn validate_cron(expr: &str) -> Result<(), ValidationError> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    let valid_field = |f: &&str| {
        f.chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '*' | ',' | '-' | '/'))
    };

    if fields.len() == 5 && fields.iter().all(valid_field) {
        Ok(())
    } else {
        Err(ValidationError::new("cron")
            .with_message("schedule must be a 5-field cron expression".into()))
    }
}

fn validate_competitor_url(url: &str) -> Result<(), ValidationError> {
    if is_http_url(url) {
        Ok(())
    } else {
        Err(ValidationError::new("competitor_url")
            .with_message("Competitor URL must be an http(s) URL".into()))
    }
}

fn validate_slack_webhook(url: &str) -> Result<(), ValidationError> {
    if url.starts_with(SLACK_WEBHOOK_PREFIX) {
        Ok(())
    } else {
        Err(ValidationError::new("slack_webhook")
            .with_message("Slack webhook must be a hooks.slack.com URL".into()))
    }
}
