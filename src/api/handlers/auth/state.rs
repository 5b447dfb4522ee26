//! Security configuration and shared handler state.

use secrecy::SecretString;

use crate::account::authorize::RouteAccess;
use crate::account::lockout::LockoutPolicy;
use crate::account::password::PasswordHasher;
use crate::account::session::SessionIssuer;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;
const DEFAULT_LOCKOUT_THRESHOLD: i32 = 5;
const DEFAULT_LOCKOUT_DURATION_SECONDS: i64 = 15 * 60;
const DEFAULT_RESET_TOKEN_TTL_SECONDS: i64 = 60 * 60;
const DEFAULT_IDLE_TIMEOUT_SECONDS: u64 = 15 * 60;
const DEFAULT_SESSION_ISSUER: &str = "custos";

#[derive(Clone, Debug)]
pub struct SecurityConfig {
    frontend_base_url: String,
    session_ttl_seconds: i64,
    session_issuer: String,
    lockout_threshold: i32,
    lockout_duration_seconds: i64,
    reset_token_ttl_seconds: i64,
    idle_timeout_seconds: u64,
}

impl SecurityConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            session_issuer: DEFAULT_SESSION_ISSUER.to_string(),
            lockout_threshold: DEFAULT_LOCKOUT_THRESHOLD,
            lockout_duration_seconds: DEFAULT_LOCKOUT_DURATION_SECONDS,
            reset_token_ttl_seconds: DEFAULT_RESET_TOKEN_TTL_SECONDS,
            idle_timeout_seconds: DEFAULT_IDLE_TIMEOUT_SECONDS,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_issuer(mut self, issuer: String) -> Self {
        self.session_issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_lockout_threshold(mut self, threshold: i32) -> Self {
        self.lockout_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_lockout_duration_seconds(mut self, seconds: i64) -> Self {
        self.lockout_duration_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_reset_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_idle_timeout_seconds(mut self, seconds: u64) -> Self {
        self.idle_timeout_seconds = seconds;
        self
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    pub(super) fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn reset_token_ttl_seconds(&self) -> i64 {
        self.reset_token_ttl_seconds
    }

    #[must_use]
    pub fn idle_timeout_seconds(&self) -> u64 {
        self.idle_timeout_seconds
    }

    pub(super) fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

/// Everything the auth handlers share, injected as one `Extension`.
pub struct SecurityState {
    config: SecurityConfig,
    issuer: SessionIssuer,
    hasher: PasswordHasher,
    policy: LockoutPolicy,
    routes: RouteAccess,
}

impl SecurityState {
    #[must_use]
    pub fn new(config: SecurityConfig, session_secret: SecretString) -> Self {
        let issuer = SessionIssuer::new(
            session_secret,
            config.session_issuer.clone(),
            config.session_ttl_seconds,
        );
        let policy = LockoutPolicy::new(
            config.lockout_threshold,
            config.lockout_duration_seconds,
        );
        Self {
            config,
            issuer,
            hasher: PasswordHasher::new(),
            policy,
            routes: RouteAccess::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    #[must_use]
    pub fn issuer(&self) -> &SessionIssuer {
        &self.issuer
    }

    pub(crate) fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    pub(crate) fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    pub(crate) fn routes(&self) -> &RouteAccess {
        &self.routes
    }
}
