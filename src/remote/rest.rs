// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client for the hosted store (PostgREST tables) and auth provider (GoTrue).
//!
//! Handles:
//! - E-mail/password sign-up, sign-in, sign-out and session lookup
//! - Profile and scan table reads/writes
//! - The `reserve_scan` stored procedure (atomic quota check + insert)
//!   and its counterpart `release_scan`

use crate::error::{AppError, Result};
use crate::models::{AuthUser, Profile, ProfilePatch, Scan, ScanStatus, ScanUpdate};
use crate::remote::{tables, AuthSession};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Exception message raised by `reserve_scan` when the quota is used up.
const QUOTA_EXCEPTION: &str = "quota_exceeded";

/// Hosted store API client.
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct SignUpBody<'a> {
    email: &'a str,
    password: &'a str,
    data: SignUpData<'a>,
}

#[derive(Serialize)]
struct SignUpData<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct PasswordGrantBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct ReserveScanArgs<'a> {
    p_user_id: Uuid,
    p_url: &'a str,
}

#[derive(Serialize)]
struct ReleaseScanArgs {
    p_user_id: Uuid,
}

/// Sign-up returns a session when e-mail confirmation is off, a bare user otherwise.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(AuthSession),
    User(AuthUser),
}

/// Update body with the server-side `updated_at` stamp.
#[derive(Serialize)]
struct Stamped<'a, T: Serialize> {
    #[serde(flatten)]
    fields: &'a T,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl<'a, T: Serialize> Stamped<'a, T> {
    fn now(fields: &'a T) -> Self {
        Self {
            fields,
            updated_at: chrono::Utc::now(),
        }
    }
}

impl SupabaseClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn auth_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/auth/v1/{}", self.base_url, path))
            .header("apikey", &self.api_key)
    }

    fn table_request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    // ─── Auth ────────────────────────────────────────────────────

    pub async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<AuthSession> {
        let response = self
            .auth_request(Method::POST, "signup")
            .json(&SignUpBody {
                email,
                password,
                data: SignUpData { name },
            })
            .send()
            .await
            .map_err(|e| AppError::Remote(format!("Sign-up request failed: {}", e)))?;

        match check_auth_response::<SignUpResponse>(response).await? {
            SignUpResponse::Session(session) => Ok(session),
            SignUpResponse::User(user) => {
                tracing::info!(user_id = %user.id, "Sign-up pending e-mail confirmation");
                Err(AppError::Auth(
                    "Check your e-mail to confirm your account".to_string(),
                ))
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let response = self
            .auth_request(Method::POST, "token")
            .query(&[("grant_type", "password")])
            .json(&PasswordGrantBody { email, password })
            .send()
            .await
            .map_err(|e| AppError::Remote(format!("Sign-in request failed: {}", e)))?;

        check_auth_response(response).await
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<()> {
        let response = self
            .auth_request(Method::POST, "logout")
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Remote(format!("Sign-out request failed: {}", e)))?;

        // An already-dead session is as signed out as it gets.
        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
        ) {
            return Ok(());
        }
        check_auth_empty(response).await
    }

    /// Look up the user behind an access token; `None` if the session is gone.
    pub async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>> {
        let response = self
            .auth_request(Method::GET, "user")
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Remote(format!("Session lookup failed: {}", e)))?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Ok(None);
        }
        check_auth_response(response).await.map(Some)
    }

    // ─── Profiles ────────────────────────────────────────────────

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        let rows: Vec<Profile> = self
            .send_table(
                self.table_request(Method::GET, tables::PROFILES)
                    .query(&[("id", format!("eq.{}", user_id)), ("select", "*".into())]),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    pub async fn insert_profile(&self, profile: &Profile) -> Result<Profile> {
        let rows: Vec<Profile> = self
            .send_table(
                self.table_request(Method::POST, tables::PROFILES)
                    .header("Prefer", "return=representation")
                    .json(profile),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Remote("Profile insert returned no row".to_string()))
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        patch: &ProfilePatch,
    ) -> Result<Option<Profile>> {
        let rows: Vec<Profile> = self
            .send_table(
                self.table_request(Method::PATCH, tables::PROFILES)
                    .query(&[("id", format!("eq.{}", user_id))])
                    .header("Prefer", "return=representation")
                    .json(&Stamped::now(patch)),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    pub async fn list_profiles(&self) -> Result<Vec<Profile>> {
        self.send_table(
            self.table_request(Method::GET, tables::PROFILES)
                .query(&[("select", "*"), ("order", "created_at.desc")]),
        )
        .await
    }

    pub async fn delete_profile(&self, user_id: Uuid) -> Result<bool> {
        let rows: Vec<Profile> = self
            .send_table(
                self.table_request(Method::DELETE, tables::PROFILES)
                    .query(&[("id", format!("eq.{}", user_id))])
                    .header("Prefer", "return=representation"),
            )
            .await?;
        Ok(!rows.is_empty())
    }

    // ─── Scans ───────────────────────────────────────────────────

    pub async fn list_scans(&self, user_id: Uuid) -> Result<Vec<Scan>> {
        self.send_table(
            self.table_request(Method::GET, tables::SCANS).query(&[
                ("user_id", format!("eq.{}", user_id)),
                ("order", "created_at.desc".into()),
            ]),
        )
        .await
    }

    pub async fn list_scans_with_status(&self, status: ScanStatus) -> Result<Vec<Scan>> {
        self.send_table(
            self.table_request(Method::GET, tables::SCANS).query(&[
                ("status", format!("eq.{}", status.as_str())),
                ("order", "created_at.desc".into()),
            ]),
        )
        .await
    }

    pub async fn list_all_scans(&self) -> Result<Vec<Scan>> {
        self.send_table(
            self.table_request(Method::GET, tables::SCANS)
                .query(&[("order", "created_at.desc")]),
        )
        .await
    }

    /// Atomically check the quota, insert a pending scan and bump the count.
    pub async fn reserve_scan(&self, user_id: Uuid, url: &str) -> Result<Scan> {
        self.send_table(
            self.table_request(Method::POST, "rpc/reserve_scan")
                .json(&ReserveScanArgs {
                    p_user_id: user_id,
                    p_url: url,
                }),
        )
        .await
    }

    /// Decrement the scan count after a failed scan. Returns the new count.
    pub async fn release_scan(&self, user_id: Uuid) -> Result<u32> {
        self.send_table(
            self.table_request(Method::POST, "rpc/release_scan")
                .json(&ReleaseScanArgs { p_user_id: user_id }),
        )
        .await
    }

    pub async fn update_scan(&self, scan_id: Uuid, update: &ScanUpdate) -> Result<Scan> {
        let rows: Vec<Scan> = self
            .send_table(
                self.table_request(Method::PATCH, tables::SCANS)
                    .query(&[("id", format!("eq.{}", scan_id))])
                    .header("Prefer", "return=representation")
                    .json(&Stamped::now(update)),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("Scan {} not found", scan_id)))
    }

    pub async fn delete_scans_for_user(&self, user_id: Uuid) -> Result<usize> {
        let rows: Vec<Scan> = self
            .send_table(
                self.table_request(Method::DELETE, tables::SCANS)
                    .query(&[("user_id", format!("eq.{}", user_id))])
                    .header("Prefer", "return=representation"),
            )
            .await?;
        Ok(rows.len())
    }

    /// Send a table request and parse the JSON body.
    async fn send_table<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| AppError::Remote(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if is_quota_violation(&body) {
                return Err(AppError::QuotaExceeded);
            }
            return Err(AppError::Remote(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Remote(format!("JSON parse error: {}", e)))
    }
}

/// Parse an auth response, passing provider rejections through verbatim.
async fn check_auth_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| AppError::Remote(format!("JSON parse error: {}", e)));
    }

    let body = response.text().await.unwrap_or_default();
    Err(auth_failure(status, &body))
}

async fn check_auth_empty(response: reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(auth_failure(status, &body))
}

fn auth_failure(status: StatusCode, body: &str) -> AppError {
    if status.is_server_error() {
        return AppError::Remote(format!("HTTP {}: {}", status, body));
    }
    AppError::Auth(auth_error_message(body))
}

/// Pull the human-readable message out of an auth error body.
fn auth_error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(|m| m.as_str()))
        })
        .map(str::to_string)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                "Authentication failed".to_string()
            } else {
                body.trim().to_string()
            }
        })
}

fn is_quota_violation(body: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .is_some_and(|message| message == QUOTA_EXCEPTION)
}
