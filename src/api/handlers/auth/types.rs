//! Request/response types for the account-security endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub account_id: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// False when the caller must change their password before using the
    /// dashboard.
    pub password_changed: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub account_id: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub password_changed: bool,
    /// Seconds until the refreshed credential expires.
    pub expires_in: i64,
    /// Inactivity window after which the dashboard signs the session out.
    pub idle_timeout: u64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetRequestRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ForceChangeRequest {
    pub password: String,
    pub confirm_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AuthorizeQuery {
    /// Requested navigation path, e.g. `/admin/accounts`.
    pub path: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct AuthorizeResponse {
    /// One of `allow`, `to_login`, `to_force_change`, `to_dashboard`.
    pub decision: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<&'static str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_request_round_trips() {
        let request = LoginRequest {
            email: "alice@example.edu".to_string(),
            password: "hunter2hunter2".to_string(),
        };
        let value = serde_json::to_value(&request).expect("serialize");
        let decoded: LoginRequest = serde_json::from_value(value).expect("deserialize");
        assert_eq!(decoded.email, "alice@example.edu");
    }

    #[test]
    fn login_response_omits_absent_tenant() {
        let response = LoginResponse {
            account_id: "id".to_string(),
            role: "super_admin".to_string(),
            tenant_id: None,
            password_changed: true,
        };
        let json = serde_json::to_string(&response).expect("serialize");
        assert!(!json.contains("tenant_id"));
    }

    #[test]
    fn authorize_response_serializes_decision() {
        use crate::account::authorize::RouteDecision;

        let response = AuthorizeResponse {
            decision: RouteDecision::ToLogin.as_str(),
            location: RouteDecision::ToLogin.location(),
        };
        let json = serde_json::to_string(&response).expect("serialize");
        assert!(json.contains("\"to_login\""));
        assert!(json.contains("/login"));
    }
}
