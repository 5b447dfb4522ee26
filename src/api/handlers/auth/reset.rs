//! Password-reset endpoints: token issuance and consumption.
//!
//! Issuance is intentionally opaque: callers always get 202 so the surface
//! does not reveal whether an email has an account. Consumption is
//! single-use; the winning transaction deletes the token row before the
//! password update it authorizes is complete.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::account::repo::ResetOutcome;
use crate::account::service;

use super::{
    state::SecurityState,
    types::{ResetPasswordRequest, ResetRequestRequest},
    utils::{normalize_email, valid_email, valid_password},
};

#[utoipa::path(
    post,
    path = "/v1/auth/password/reset-request",
    request_body = ResetRequestRequest,
    responses(
        (status = 202, description = "Reset queued if the email has an account"),
        (status = 400, description = "Validation error", body = String)
    ),
    tag = "auth"
)]
pub async fn reset_request(
    pool: Extension<PgPool>,
    security: Extension<Arc<SecurityState>>,
    payload: Option<Json<ResetRequestRequest>>,
) -> impl IntoResponse {
    let request: ResetRequestRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    match service::request_password_reset(
        &pool,
        &email,
        security.config().reset_token_ttl_seconds(),
    )
    .await
    {
        Ok(Some(token)) => {
            // Delivery belongs to the email collaborator; the raw token is
            // only surfaced to operators at debug verbosity.
            debug!(%email, token_len = token.len(), "Reset token issued");
        }
        Ok(None) => {
            debug!(%email, "Reset requested for unknown email");
        }
        Err(err) => {
            // Still 202: a failed issuance must not reveal anything either.
            error!("Failed to issue reset token: {err}");
        }
    }

    StatusCode::ACCEPTED.into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/password/reset",
    request_body = ResetPasswordRequest,
    responses(
        (status = 204, description = "Password updated"),
        (status = 400, description = "Validation error", body = String),
        (status = 401, description = "Invalid or expired reset token", body = String),
        (status = 500, description = "Reset failed", body = String)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    pool: Extension<PgPool>,
    security: Extension<Arc<SecurityState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> impl IntoResponse {
    let request: ResetPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    if request.token.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing token".to_string()).into_response();
    }
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

    match service::reset_password(
        &pool,
        security.hasher(),
        request.token.trim(),
        &request.password,
    )
    .await
    {
        Ok(ResetOutcome::Consumed { account_id, .. }) => {
            info!(%account_id, "Password reset completed");
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(ResetOutcome::Expired | ResetOutcome::Invalid) => (
            StatusCode::UNAUTHORIZED,
            "Invalid or expired reset token. Request a new one.".to_string(),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to reset password: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Reset failed. Try again.".to_string(),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::test_support::{lazy_pool, security_state};
    use anyhow::Result;

    #[tokio::test]
    async fn reset_request_missing_payload() -> Result<()> {
        let response = reset_request(Extension(lazy_pool()?), Extension(security_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn reset_password_rejects_short_password() -> Result<()> {
        let response = reset_password(
            Extension(lazy_pool()?),
            Extension(security_state()),
            Some(Json(ResetPasswordRequest {
                token: "token".to_string(),
                password: "short".to_string(),
                confirm_password: "short".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn reset_password_rejects_mismatched_confirmation() -> Result<()> {
        let response = reset_password(
            Extension(lazy_pool()?),
            Extension(security_state()),
            Some(Json(ResetPasswordRequest {
                token: "token".to_string(),
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
