// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! The plan catalog and feature flags are fixed at startup; nothing here is
//! reloaded while the server runs.

use crate::models::Plan;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Product name shown on the landing page.
pub const APP_NAME: &str = "Pricing Page Analyzer";

/// Default synthetic analysis delay (milliseconds).
const DEFAULT_SCAN_DELAY_MS: u64 = 3000;

/// Default lifetime of an issued session token (7 days).
const DEFAULT_SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Public URLs ---
    /// Public domain the app is served from
    pub domain: String,
    /// "http" or "https"
    pub protocol: String,
    /// Base URL of this API
    pub api_base_url: String,
    /// Frontend origin allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,

    // --- Remote store / auth provider ---
    /// Hosted store base URL. `None` selects the in-memory backend.
    pub supabase_url: Option<String>,
    /// Service key for the hosted store
    pub supabase_key: Option<String>,
    /// HS256 secret used to sign and verify access tokens
    pub jwt_signing_key: Vec<u8>,
    /// Access token lifetime for the in-memory auth provider
    pub session_ttl: Duration,

    // --- Product ---
    /// Synthetic delay before a scan completes
    pub scan_delay: Duration,
    pub features: FeatureFlags,
    pub plans: PlanCatalog,
    /// Lower-cased e-mail addresses that receive the admin role
    pub admin_emails: Vec<String>,
}

/// Feature switches. Not every flag gates behavior yet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FeatureFlags {
    pub admin_panel: bool,
    pub competitor_compare: bool,
    pub scheduled_scans: bool,
    pub export_pdf: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            admin_panel: true,
            competitor_compare: true,
            scheduled_scans: true,
            export_pdf: true,
        }
    }
}

/// One entry of the plan catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanConfig {
    pub name: String,
    /// Maximum number of scans; `None` means unlimited.
    pub scan_limit: Option<u32>,
    /// Monthly price in dollars (free plan has none)
    #[serde(default)]
    pub price: Option<u32>,
    #[serde(default)]
    pub features: Vec<String>,
}

/// Plan catalog keyed by tier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanCatalog {
    pub free: PlanConfig,
    pub pro: PlanConfig,
    pub enterprise: PlanConfig,
}

impl Default for PlanCatalog {
    fn default() -> Self {
        fn features(list: &[&str]) -> Vec<String> {
            list.iter().map(|f| f.to_string()).collect()
        }

        Self {
            free: PlanConfig {
                name: "Free".to_string(),
                scan_limit: Some(3),
                price: None,
                features: features(&["Basic analysis", "Grade reports", "Email support"]),
            },
            pro: PlanConfig {
                name: "Pro".to_string(),
                scan_limit: None,
                price: Some(25),
                features: features(&[
                    "Unlimited scans",
                    "Competitor compare",
                    "Priority support",
                    "PDF exports",
                ]),
            },
            enterprise: PlanConfig {
                name: "Enterprise".to_string(),
                scan_limit: None,
                price: Some(99),
                features: features(&[
                    "Everything in Pro",
                    "Scheduled scans",
                    "Team collaboration",
                    "Admin dashboard",
                    "API access",
                ]),
            },
        }
    }
}

impl PlanCatalog {
    /// Look up the configuration for a plan tier.
    pub fn get(&self, plan: Plan) -> &PlanConfig {
        match plan {
            Plan::Free => &self.free,
            Plan::Pro => &self.pro,
            Plan::Enterprise => &self.enterprise,
        }
    }

    /// Load a catalog from a JSON file.
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Invalid("PLAN_CATALOG_PATH", e.to_string()))?;
        serde_json::from_str(&raw)
            .map_err(|e| ConfigError::Invalid("PLAN_CATALOG_PATH", e.to_string()))
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let domain = env::var("APP_DOMAIN").unwrap_or_else(|_| "localhost:8080".to_string());
        let protocol = env::var("APP_PROTOCOL").unwrap_or_else(|_| "http".to_string());
        let api_base_url =
            env::var("API_BASE_URL").unwrap_or_else(|_| format!("{}://{}", protocol, domain));

        let plans = match env::var("PLAN_CATALOG_PATH") {
            Ok(path) => PlanCatalog::load_from_file(&path)?,
            Err(_) => PlanCatalog::default(),
        };

        Ok(Self {
            domain,
            protocol,
            api_base_url,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),

            supabase_url: env::var("SUPABASE_URL")
                .ok()
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty()),
            supabase_key: env::var("SUPABASE_KEY").ok().map(|v| v.trim().to_string()),
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            session_ttl: Duration::from_secs(parse_u64(
                "SESSION_TTL_SECS",
                DEFAULT_SESSION_TTL_SECS,
            )?),

            scan_delay: Duration::from_millis(parse_u64("SCAN_DELAY_MS", DEFAULT_SCAN_DELAY_MS)?),
            features: FeatureFlags {
                admin_panel: parse_flag("FEATURE_ADMIN_PANEL", true),
                competitor_compare: parse_flag("FEATURE_COMPETITOR_COMPARE", true),
                scheduled_scans: parse_flag("FEATURE_SCHEDULED_SCANS", true),
                export_pdf: parse_flag("FEATURE_EXPORT_PDF", true),
            },
            plans,
            admin_emails: parse_email_list(&env::var("ADMIN_EMAILS").unwrap_or_default()),
        })
    }

    /// Configuration for tests: memory backend, no synthetic delay.
    pub fn test_default() -> Self {
        Self {
            domain: "localhost:8080".to_string(),
            protocol: "http".to_string(),
            api_base_url: "http://localhost:8080".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            supabase_url: None,
            supabase_key: None,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            session_ttl: Duration::from_secs(3600),
            scan_delay: Duration::ZERO,
            features: FeatureFlags::default(),
            plans: PlanCatalog::default(),
            admin_emails: vec!["admin@example.com".to_string()],
        }
    }

    /// Build an absolute URL on the public domain.
    pub fn full_url(&self, path: &str) -> String {
        format!("{}://{}{}", self.protocol, self.domain, path)
    }

    /// Whether an e-mail address is on the admin allow-list.
    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|admin| *admin == email)
    }

    /// Cookies are marked `Secure` unless the frontend is served over plain http.
    pub fn secure_cookies(&self) -> bool {
        self.frontend_url.starts_with("https://")
    }
}

fn parse_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

fn parse_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(raw) => matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}

fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("ADMIN_EMAILS", " Boss@Example.com, ops@example.com ,");
        env::set_var("FEATURE_COMPETITOR_COMPARE", "off");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.port, 8080);
        assert_eq!(
            config.admin_emails,
            vec!["boss@example.com".to_string(), "ops@example.com".to_string()]
        );
        assert!(!config.features.competitor_compare);
        assert!(config.features.admin_panel);
        assert!(config.is_admin_email("BOSS@example.com"));
        assert!(!config.is_admin_email("someone@example.com"));
    }

    #[test]
    fn test_plan_catalog_quotas() {
        let catalog = PlanCatalog::default();
        assert_eq!(catalog.get(Plan::Free).scan_limit, Some(3));
        assert_eq!(catalog.get(Plan::Pro).scan_limit, None);
        assert_eq!(catalog.get(Plan::Enterprise).price, Some(99));
    }

    #[test]
    fn test_full_url() {
        let config = Config::test_default();
        assert_eq!(
            config.full_url("/scan/abc"),
            "http://localhost:8080/scan/abc"
        );
        assert!(!config.secure_cookies());
    }
}
