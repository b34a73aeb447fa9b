// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account routes: sign up, sign in, sign out.

use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::config::Config;
use crate::error::Result;
use crate::middleware::auth::{session_token, LOGGED_IN_COOKIE, SESSION_COOKIE};
use crate::models::Identity;
use crate::remote::AuthSession;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
        .route("/auth/signout", post(sign_out))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "Please enter your name"))]
    pub name: String,
}

impl SignUpRequest {
    /// Trim e-mail and name so blank input fails validation.
    pub fn normalized(mut self) -> Self {
        self.email = self.email.trim().to_string();
        self.name = self.name.trim().to_string();
        self
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Please enter your password"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub identity: Identity,
    /// Also set as an HttpOnly cookie; returned for non-browser clients.
    pub access_token: String,
    pub expires_in: Option<u64>,
}

async fn sign_up(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<SignUpRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let body = body.normalized();
    body.validate()?;

    let (session, identity) = state
        .sessions
        .sign_up(&body.email, &body.password, &body.name)
        .await?;

    Ok(start_session(jar, &state.config, session, identity))
}

async fn sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<SignInRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    body.validate()?;

    let (session, identity) = state
        .sessions
        .sign_in(body.email.trim(), &body.password)
        .await?;

    Ok(start_session(jar, &state.config, session, identity))
}

async fn sign_out(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<(CookieJar, StatusCode)> {
    if let Some(token) = session_token(&jar, &headers) {
        state.sessions.sign_out(&token).await?;
    }

    let secure = state.config.secure_cookies();
    let jar = jar
        .remove(session_cookie(String::new(), secure))
        .remove(logged_in_cookie(secure));

    Ok((jar, StatusCode::NO_CONTENT))
}

fn start_session(
    jar: CookieJar,
    config: &Config,
    session: AuthSession,
    identity: Identity,
) -> (CookieJar, Json<SessionResponse>) {
    let secure = config.secure_cookies();
    let max_age = time::Duration::seconds(
        session
            .expires_in
            .unwrap_or(config.session_ttl.as_secs()) as i64,
    );

    let mut token_cookie = session_cookie(session.access_token.clone(), secure);
    token_cookie.set_max_age(max_age);
    let mut hint_cookie = logged_in_cookie(secure);
    hint_cookie.set_max_age(max_age);

    let jar = jar.add(token_cookie).add(hint_cookie);
    let body = SessionResponse {
        identity,
        access_token: session.access_token,
        expires_in: session.expires_in,
    };

    (jar, Json(body))
}

fn session_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

fn logged_in_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((LOGGED_IN_COOKIE, "1"))
        .path("/")
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}
