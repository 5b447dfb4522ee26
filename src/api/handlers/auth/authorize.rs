//! Route-authorization endpoint for the dashboard's route layer.
//!
//! The route layer calls this on every navigation; the decision itself is
//! the pure function in `crate::account::authorize`, and the transport
//! realizes any redirect.

use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::account::authorize::authorize;

use super::{
    session::verify_session,
    state::SecurityState,
    types::{AuthorizeQuery, AuthorizeResponse},
};

#[utoipa::path(
    get,
    path = "/v1/auth/authorize",
    params(
        ("path" = String, Query, description = "Requested navigation path")
    ),
    responses(
        (status = 200, description = "Navigation decision", body = AuthorizeResponse),
        (status = 400, description = "Validation error", body = String)
    ),
    tag = "auth"
)]
pub async fn route_decision(
    headers: HeaderMap,
    security: Extension<Arc<SecurityState>>,
    query: Option<Query<AuthorizeQuery>>,
) -> impl IntoResponse {
    let Some(Query(query)) = query else {
        return (StatusCode::BAD_REQUEST, "Missing path".to_string()).into_response();
    };
    if !query.path.starts_with('/') {
        return (StatusCode::BAD_REQUEST, "Path must be absolute".to_string()).into_response();
    }

    let claims = verify_session(&headers, &security);
    let decision = authorize(claims.as_ref(), &query.path, security.routes());

    let response = AuthorizeResponse {
        decision: decision.as_str(),
        location: decision.location(),
    };
    (StatusCode::OK, Json(response)).into_response()
}
