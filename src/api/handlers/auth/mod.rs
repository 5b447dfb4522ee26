//! Account-security handlers.
//!
//! This module coordinates login, session refresh/reconciliation, the
//! password-reset token lifecycle, the forced-change flow, and the
//! route-authorization endpoint consumed by the dashboard's route layer.
//!
//! ## Lockout
//!
//! Five consecutive failures lock an account for 15 minutes (tunable via
//! CLI/env). The counters are only ever updated under a row lock, so
//! racing requests cannot skip past the threshold.
//!
//! ## Sessions
//!
//! Sessions are stateless signed claims in an `HttpOnly` cookie. Every
//! `GET /v1/auth/session` re-reads the password-changed flag and patches a
//! stale snapshot before re-signing.

pub(crate) mod authorize;
pub(crate) mod force_change;
pub(crate) mod login;
pub(crate) mod reset;
pub(crate) mod session;
mod state;
#[cfg(test)]
pub(crate) mod test_support;
pub(crate) mod types;
mod utils;

pub use state::{SecurityConfig, SecurityState};
