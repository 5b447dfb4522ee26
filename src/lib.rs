//! # Custos (Account Security & Session Integrity)
//!
//! `custos` is the account-security authority for a multi-tenant
//! institutional dashboard. It owns credential verification, progressive
//! lockout accounting, single-use password-reset tokens, and the
//! reconciliation between a stateless session credential and mutable
//! server-side security flags.
//!
//! ## Tenant Model
//!
//! Every account belongs to exactly one tenant, except for the top
//! administrative role (`super_admin`) which operates across tenants and
//! carries no tenant id.
//!
//! ## Lockout
//!
//! Five consecutive failed login attempts lock an account for 15 minutes.
//! The lock clears lazily: it is observed (and, once expired, cleared) on
//! the next login attempt, never by a background timer. Counter updates run
//! under row-level locking so concurrent failures cannot race past the
//! threshold.
//!
//! ## Sessions
//!
//! Sessions are stateless signed claims (HS256 JWT in an `HttpOnly`
//! cookie). Security-relevant claims are snapshots taken at mint time; the
//! `password changed` flag is re-read from the store and patched on every
//! session refresh so a stale credential cannot pin a user in the
//! forced-change flow.
//!
//! ## Audit
//!
//! Every call to the login orchestrator appends exactly one row to the
//! append-only login log, including calls that fail because the store is
//! unreachable or the account does not exist.

pub mod account;
pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
