//! Login endpoint.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::account::service::{self, AuthError, ClientMeta};

use super::{
    state::SecurityState,
    types::{LoginRequest, LoginResponse},
    utils::{
        extract_client_ip, extract_user_agent, normalize_email, session_cookie, valid_email,
    },
};

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = LoginResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 401, description = "Invalid credentials", body = String),
        (status = 423, description = "Account temporarily locked", body = String),
        (status = 500, description = "Login failed", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    security: Extension<Arc<SecurityState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    let client = ClientMeta {
        ip_address: extract_client_ip(&headers),
        user_agent: extract_user_agent(&headers),
    };

    let authenticated = match service::authenticate(
        &pool,
        security.hasher(),
        security.policy(),
        &email,
        &request.password,
        &client,
    )
    .await
    {
        Ok(authenticated) => authenticated,
        // One generic message for unknown accounts and wrong passwords; the
        // locked message is the only allowed asymmetry.
        Err(AuthError::InvalidCredentials) => {
            return (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            )
                .into_response();
        }
        Err(AuthError::Locked { .. }) => {
            return (
                StatusCode::LOCKED,
                "Account is temporarily locked. Try again later.".to_string(),
            )
                .into_response();
        }
        Err(AuthError::Transient(err)) => {
            error!("Login failed: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Login failed. Try again.".to_string(),
            )
                .into_response();
        }
    };

    let account = &authenticated.account;
    let token = match security.issuer().mint(account) {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to mint session: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Login failed. Try again.".to_string(),
            )
                .into_response();
        }
    };

    let mut response_headers = HeaderMap::new();
    match session_cookie(
        security.config(),
        &token,
        security.issuer().ttl_seconds(),
    ) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to set session cookie: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Login failed. Try again.".to_string(),
            )
                .into_response();
        }
    }

    let response = LoginResponse {
        account_id: account.id.to_string(),
        role: account.role.as_str().to_string(),
        tenant_id: account.tenant_id.map(|id| id.to_string()),
        password_changed: account.is_password_changed,
    };
    (StatusCode::OK, response_headers, Json(response)).into_response()
}
