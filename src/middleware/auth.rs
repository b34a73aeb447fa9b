// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session token handling and the authentication middleware.

use crate::error::AppError;
use crate::middleware::guard::{evaluate, loading_response, GuardDecision};
use crate::models::{AuthUser, Identity};
use crate::services::session::SessionStatus;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// HttpOnly cookie carrying the access token.
pub const SESSION_COOKIE: &str = "pg_session";
/// Script-readable hint that a session cookie exists.
pub const LOGGED_IN_COOKIE: &str = "pg_logged_in";

/// Audience claim used by the auth provider for signed-in users.
const TOKEN_AUDIENCE: &str = "authenticated";

/// Access token claims.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    pub email: String,
    pub aud: String,
    /// Distinguishes tokens issued to the same user in the same second
    pub session_id: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Issue an HS256 access token for a user.
pub fn create_access_token(
    user: &AuthUser,
    signing_key: &[u8],
    ttl: Duration,
) -> anyhow::Result<String> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        aud: TOKEN_AUDIENCE.to_string(),
        session_id: Uuid::new_v4().to_string(),
        iat: now,
        exp: now + ttl.as_secs() as usize,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

/// Verify signature, audience and expiry. `None` for anything unusable.
pub fn decode_access_token(token: &str, signing_key: &[u8]) -> Option<Claims> {
    let key = DecodingKey::from_secret(signing_key);
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[TOKEN_AUDIENCE]);

    let claims = decode::<Claims>(token, &key, &validation).ok()?.claims;
    claims.sub.parse::<Uuid>().ok()?;
    Some(claims)
}

/// Access token from the session cookie, falling back to a bearer header.
pub fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Route guard for protected pages.
///
/// Signed out: redirect to the landing page. Still loading: placeholder,
/// no redirect. Signed in: the [`Identity`] is added to the request
/// extensions.
pub async fn require_identity(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let token = session_token(&jar, request.headers());
    let status = match token.as_deref() {
        Some(token) => resolve_session(&state, token).await,
        None => SessionStatus::SignedOut,
    };

    match evaluate(status) {
        GuardDecision::Allow(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        GuardDecision::Loading => loading_response(),
        GuardDecision::Redirect(to) => Redirect::to(to).into_response(),
    }
}

async fn resolve_session(state: &AppState, token: &str) -> SessionStatus {
    if decode_access_token(token, &state.config.jwt_signing_key).is_none() {
        tracing::debug!("Rejected unverifiable access token");
        state.sessions.forget(token);
        return SessionStatus::SignedOut;
    }

    match state.sessions.restore(token).await {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!(error = %e, "Session restore failed, treating as signed out");
            SessionStatus::SignedOut
        }
    }
}

/// Admin-only routes. Must run inside [`require_identity`].
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.config.features.admin_panel {
        return Err(AppError::FeatureDisabled("admin_panel"));
    }

    if !identity.is_admin() {
        tracing::warn!(user_id = %identity.id, "Blocked non-admin access to admin route");
        return Err(AppError::Forbidden);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::UserMetadata;
    use crate::remote::RemoteService;
    use assert_matches::assert_matches;
    use axum::http::HeaderValue;

    const KEY: &[u8] = b"test_jwt_key_32_bytes_minimum!!";

    fn user() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "carla@example.com".to_string(),
            user_metadata: UserMetadata::default(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let user = user();
        let token = create_access_token(&user, KEY, Duration::from_secs(60)).unwrap();
        let claims = decode_access_token(&token, KEY).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.aud, "authenticated");
    }

    #[test]
    fn test_tokens_are_unique_per_session() {
        let user = user();
        let a = create_access_token(&user, KEY, Duration::from_secs(60)).unwrap();
        let b = create_access_token(&user, KEY, Duration::from_secs(60)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let token = create_access_token(&user(), KEY, Duration::from_secs(60)).unwrap();
        assert!(decode_access_token(&token, b"some_other_key_that_is_long_enough").is_none());
        assert!(decode_access_token("invalid.token.here", KEY).is_none());
    }

    #[test]
    fn test_session_token_prefers_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        headers.insert(header::COOKIE, HeaderValue::from_static("pg_session=from-cookie"));
        let jar = CookieJar::from_headers(&headers);
        assert_eq!(session_token(&jar, &headers).as_deref(), Some("from-cookie"));

        headers.remove(header::COOKIE);
        let jar = CookieJar::from_headers(&headers);
        assert_eq!(session_token(&jar, &headers).as_deref(), Some("from-header"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(session_token(&jar, &headers), None);
    }

    #[tokio::test]
    async fn test_unverifiable_token_is_forgotten() {
        let config = Config::test_default();
        let state = AppState::build(config.clone(), RemoteService::from_config(&config));
        let (session, identity) = state
            .sessions
            .sign_up("carla@example.com", "password1", "Carla")
            .await
            .unwrap();
        assert_matches!(
            resolve_session(&state, &session.access_token).await,
            SessionStatus::SignedIn(_)
        );

        // Same sessions, rotated signing key: the old token no longer verifies
        let rotated = AppState {
            config: Config {
                jwt_signing_key: b"rotated_key_that_is_long_enough!!".to_vec(),
                ..Config::test_default()
            },
            remote: state.remote.clone(),
            events: state.events.clone(),
            sessions: state.sessions.clone(),
            scans: state.scans.clone(),
            admin: state.admin.clone(),
        };
        assert_eq!(
            resolve_session(&rotated, &session.access_token).await,
            SessionStatus::SignedOut
        );
        assert_eq!(state.sessions.status_of(identity.id), SessionStatus::SignedOut);
    }
}
