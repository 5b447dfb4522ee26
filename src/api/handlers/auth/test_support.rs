//! Shared fixtures for auth handler tests.

use anyhow::Result;
use secrecy::SecretString;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use crate::account::models::{Account, Role};

use super::state::{SecurityConfig, SecurityState};

/// Pool that never connects; handler tests only exercise paths that fail
/// before touching the database.
pub(crate) fn lazy_pool() -> Result<PgPool> {
    Ok(PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?)
}

pub(crate) fn security_state() -> Arc<SecurityState> {
    let config = SecurityConfig::new("https://portal.example.edu".to_string());
    Arc::new(SecurityState::new(
        config,
        SecretString::from("test-secret-test-secret-test-secret"),
    ))
}

pub(crate) fn staff_account(is_password_changed: bool) -> Account {
    Account {
        id: Uuid::new_v4(),
        email: "alice@example.edu".to_string(),
        password_hash: "$argon2id$placeholder".to_string(),
        role: Role::Staff,
        tenant_id: Some(Uuid::new_v4()),
        failed_login_attempts: 0,
        locked_until: None,
        is_password_changed,
        last_login_at: None,
    }
}

pub(crate) fn mint_for(security: &SecurityState, account: &Account) -> String {
    security.issuer().mint(account).expect("mint session")
}
