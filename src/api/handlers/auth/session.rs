//! Session refresh and sign-out endpoints.
//!
//! `GET /v1/auth/session` is the reconciliation point: the presented
//! credential is verified, its password-changed snapshot is re-read from
//! the store (patched false→true when the account has moved on), and a
//! re-signed cookie is attached. This closes the stale-claims window for
//! sessions minted during the forced-change flow.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::account::session::{self, SessionClaims};

use super::{
    state::SecurityState,
    types::SessionResponse,
    utils::{clear_session_cookie, extract_session_token, session_cookie},
};

#[utoipa::path(
    get,
    path = "/v1/auth/session",
    responses(
        (status = 200, description = "Session is active; refreshed cookie attached", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    security: Extension<Arc<SecurityState>>,
) -> impl IntoResponse {
    // Missing or bad credentials are all "no session" to avoid leaking
    // auth state.
    let Some(claims) = verify_session(&headers, &security) else {
        return StatusCode::NO_CONTENT.into_response();
    };

    let claims = match session::reconcile(&pool, claims).await {
        Ok(Some(claims)) => claims,
        Ok(None) => return StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!("Failed to reconcile session: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let token = match security.issuer().refresh(&claims) {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to refresh session: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut response_headers = HeaderMap::new();
    match session_cookie(security.config(), &token, security.issuer().ttl_seconds()) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to set session cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    let response = SessionResponse {
        account_id: claims.sub.to_string(),
        role: claims.role.as_str().to_string(),
        tenant_id: claims.tid.map(|id| id.to_string()),
        password_changed: claims.pwc,
        expires_in: security.issuer().ttl_seconds(),
        idle_timeout: security.config().idle_timeout_seconds(),
    };
    (StatusCode::OK, response_headers, Json(response)).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(security: Extension<Arc<SecurityState>>) -> impl IntoResponse {
    // Sessions are stateless; sign-out is realized by expiring the cookie.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(security.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

/// Resolve the presented credential into claims, if valid and unexpired.
pub(super) fn verify_session(
    headers: &HeaderMap,
    security: &SecurityState,
) -> Option<SessionClaims> {
    let token = extract_session_token(headers)?;
    security.issuer().verify(&token).ok()
}
