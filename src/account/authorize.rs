//! Route authorization as a pure decision function.
//!
//! The dashboard's route layer calls this on every navigation with the
//! caller's (possibly absent) session claims and the requested path. Role
//! allow-lists are plain configuration data layered on top of the
//! authentication/forced-change checks, not a state machine.

use super::models::Role;
use super::session::SessionClaims;

pub const LOGIN_PATH: &str = "/login";
pub const FORCE_CHANGE_PATH: &str = "/account/password";
pub const DEFAULT_LANDING: &str = "/dashboard";

/// Tagged decision returned to the transport layer, which realizes the
/// redirects. No exceptions-as-control-flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    ToLogin,
    ToForceChange,
    ToDashboard,
}

impl RouteDecision {
    /// Wire name used by the authorize endpoint.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::ToLogin => "to_login",
            Self::ToForceChange => "to_force_change",
            Self::ToDashboard => "to_dashboard",
        }
    }

    /// Redirect target, when the decision is a redirect.
    #[must_use]
    pub const fn location(self) -> Option<&'static str> {
        match self {
            Self::Allow => None,
            Self::ToLogin => Some(LOGIN_PATH),
            Self::ToForceChange => Some(FORCE_CHANGE_PATH),
            Self::ToDashboard => Some(DEFAULT_LANDING),
        }
    }
}

/// Route-access configuration: which prefixes require a session, and which
/// of those additionally require one of a set of roles.
#[derive(Debug, Clone)]
pub struct RouteAccess {
    protected_prefixes: Vec<String>,
    role_rules: Vec<(String, Vec<Role>)>,
}

impl Default for RouteAccess {
    fn default() -> Self {
        Self {
            protected_prefixes: [
                "/dashboard",
                "/admin",
                "/staff",
                "/research",
                "/facilities",
                "/meetings",
                "/account",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            role_rules: vec![(
                "/admin".to_string(),
                vec![Role::SuperAdmin, Role::Admin],
            )],
        }
    }
}

impl RouteAccess {
    #[must_use]
    pub fn new(protected_prefixes: Vec<String>, role_rules: Vec<(String, Vec<Role>)>) -> Self {
        Self {
            protected_prefixes,
            role_rules,
        }
    }

    fn is_protected(&self, path: &str) -> bool {
        self.protected_prefixes
            .iter()
            .any(|prefix| prefix_matches(prefix, path))
    }

    fn role_allowed(&self, path: &str, role: Role) -> bool {
        self.role_rules
            .iter()
            .filter(|(prefix, _)| prefix_matches(prefix, path))
            .all(|(_, roles)| roles.contains(&role))
    }
}

fn prefix_matches(prefix: &str, path: &str) -> bool {
    path == prefix || path.starts_with(&format!("{prefix}/"))
}

/// Decide what to do with a navigation.
///
/// Order matters: an authenticated caller never sees the login page; a
/// caller who still needs to change their password is pinned to the
/// change-password path; role mismatches resolve to the default landing so
/// restricted areas stay unprobeable.
#[must_use]
pub fn authorize(
    claims: Option<&SessionClaims>,
    path: &str,
    routes: &RouteAccess,
) -> RouteDecision {
    if let Some(claims) = claims {
        if prefix_matches(LOGIN_PATH, path) {
            return RouteDecision::ToDashboard;
        }
        if routes.is_protected(path) {
            if !claims.pwc && !prefix_matches(FORCE_CHANGE_PATH, path) {
                return RouteDecision::ToForceChange;
            }
            if !routes.role_allowed(path, claims.role) {
                return RouteDecision::ToDashboard;
            }
        }
        RouteDecision::Allow
    } else if routes.is_protected(path) {
        RouteDecision::ToLogin
    } else {
        RouteDecision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn claims(role: Role, pwc: bool) -> SessionClaims {
        let now = Utc::now().timestamp();
        SessionClaims {
            sub: Uuid::new_v4(),
            iss: "custos".to_string(),
            role,
            tid: (role != Role::SuperAdmin).then(Uuid::new_v4),
            pwc,
            iat: now,
            exp: now + 3600,
            jti: Uuid::new_v4().to_string(),
        }
    }

    #[test]
    fn unauthenticated_protected_path_redirects_to_login() {
        let routes = RouteAccess::default();
        assert_eq!(
            authorize(None, "/dashboard", &routes),
            RouteDecision::ToLogin
        );
        assert_eq!(
            authorize(None, "/meetings/42", &routes),
            RouteDecision::ToLogin
        );
    }

    #[test]
    fn unauthenticated_public_path_is_allowed() {
        let routes = RouteAccess::default();
        assert_eq!(authorize(None, "/", &routes), RouteDecision::Allow);
        assert_eq!(authorize(None, "/login", &routes), RouteDecision::Allow);
    }

    #[test]
    fn authenticated_login_page_redirects_to_landing() {
        let routes = RouteAccess::default();
        let claims = claims(Role::Staff, true);
        assert_eq!(
            authorize(Some(&claims), "/login", &routes),
            RouteDecision::ToDashboard
        );
    }

    #[test]
    fn pending_password_change_pins_to_change_page() {
        let routes = RouteAccess::default();
        let claims = claims(Role::Staff, false);
        for path in ["/dashboard", "/research/projects", "/meetings"] {
            assert_eq!(
                authorize(Some(&claims), path, &routes),
                RouteDecision::ToForceChange
            );
        }
        // The change page itself stays reachable.
        assert_eq!(
            authorize(Some(&claims), FORCE_CHANGE_PATH, &routes),
            RouteDecision::Allow
        );
    }

    #[test]
    fn role_rules_gate_admin_prefix() {
        let routes = RouteAccess::default();
        let staff = claims(Role::Staff, true);
        assert_eq!(
            authorize(Some(&staff), "/admin/accounts", &routes),
            RouteDecision::ToDashboard
        );
        let admin = claims(Role::Admin, true);
        assert_eq!(
            authorize(Some(&admin), "/admin/accounts", &routes),
            RouteDecision::Allow
        );
        let top = claims(Role::SuperAdmin, true);
        assert_eq!(
            authorize(Some(&top), "/admin", &routes),
            RouteDecision::Allow
        );
    }

    #[test]
    fn prefix_matching_does_not_bleed_into_siblings() {
        let routes = RouteAccess::default();
        // "/administrivia" is not under "/admin".
        assert_eq!(
            authorize(None, "/administrivia", &routes),
            RouteDecision::Allow
        );
    }

    #[test]
    fn compliant_session_reaches_protected_paths() {
        let routes = RouteAccess::default();
        let claims = claims(Role::Staff, true);
        for path in ["/dashboard", "/staff", "/facilities/rooms/7"] {
            assert_eq!(
                authorize(Some(&claims), path, &routes),
                RouteDecision::Allow
            );
        }
    }

    #[test]
    fn decisions_expose_redirect_locations() {
        assert_eq!(RouteDecision::Allow.location(), None);
        assert_eq!(RouteDecision::ToLogin.location(), Some(LOGIN_PATH));
        assert_eq!(
            RouteDecision::ToForceChange.location(),
            Some(FORCE_CHANGE_PATH)
        );
        assert_eq!(RouteDecision::ToDashboard.location(), Some(DEFAULT_LANDING));
    }

    #[test]
    fn decisions_have_stable_wire_names() {
        assert_eq!(RouteDecision::Allow.as_str(), "allow");
        assert_eq!(RouteDecision::ToLogin.as_str(), "to_login");
        assert_eq!(RouteDecision::ToForceChange.as_str(), "to_force_change");
        assert_eq!(RouteDecision::ToDashboard.as_str(), "to_dashboard");
    }
}
