//! Forced password change for an authenticated session.
//!
//! The update flips the password-changed flag in the same statement, and
//! the response expires the session cookie: refresh-time reconciliation
//! handles the general stale-snapshot case, the immediate sign-out removes
//! the window where the just-minted-stale credential is still live. The
//! caller signs in again with the new password.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};

use crate::account::service;

use super::{
    session::verify_session,
    state::SecurityState,
    types::ForceChangeRequest,
    utils::{clear_session_cookie, valid_password},
};

#[utoipa::path(
    post,
    path = "/v1/auth/password/force-change",
    request_body = ForceChangeRequest,
    responses(
        (status = 204, description = "Password updated; session ended"),
        (status = 400, description = "Validation error", body = String),
        (status = 401, description = "Missing or invalid session"),
        (status = 500, description = "Change failed", body = String)
    ),
    tag = "auth"
)]
pub async fn force_change(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    security: Extension<Arc<SecurityState>>,
    payload: Option<Json<ForceChangeRequest>>,
) -> impl IntoResponse {
    let Some(claims) = verify_session(&headers, &security) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let request: ForceChangeRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    if !valid_password(&request.password) {
        return (
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters".to_string(),
        )
            .into_response();
    }
    if request.password != request.confirm_password {
        return (StatusCode::BAD_REQUEST, "Passwords do not match".to_string()).into_response();
    }

    match service::force_change_password(&pool, security.hasher(), claims.sub, &request.password)
        .await
    {
        Ok(true) => {
            info!(account_id = %claims.sub, "Forced password change completed");
            let mut response_headers = HeaderMap::new();
            if let Ok(cookie) = clear_session_cookie(security.config()) {
                response_headers.insert(SET_COOKIE, cookie);
            }
            (StatusCode::NO_CONTENT, response_headers).into_response()
        }
        Ok(false) => StatusCode::UNAUTHORIZED.into_response(),
        Err(err) => {
            error!("Failed to change password: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Change failed. Try again.".to_string(),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::test_support::{
        lazy_pool, mint_for, security_state, staff_account,
    };
    use anyhow::Result;
    use axum::http::{header::AUTHORIZATION, HeaderValue};

    #[tokio::test]
    async fn force_change_requires_session() -> Result<()> {
        let response = force_change(
            HeaderMap::new(),
            Extension(lazy_pool()?),
            Extension(security_state()),
            Some(Json(ForceChangeRequest {
                password: "long-enough-password".to_string(),
                confirm_password: "long-enough-password".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn force_change_rejects_mismatched_confirmation() -> Result<()> {
        let security = security_state();
        let token = mint_for(&security, &staff_account(false));
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))?,
        );
        let response = force_change(
            headers,
            Extension(lazy_pool()?),
            Extension(security),
            Some(Json(ForceChangeRequest {
                password: "long-enough-password".to_string(),
                confirm_password: "different-password".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
