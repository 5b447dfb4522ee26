//! Login orchestration and password lifecycle use cases.
//!
//! The orchestrator owns the audit contract: every `authenticate` call
//! appends exactly one login-log row, including calls where the account
//! does not exist or the store is unreachable. Audit appends are attempted
//! even when the primary operation fails; a failed append is logged
//! server-side and never blocks the user-facing result.

use anyhow::{Context, Result};
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use super::lockout::{AttemptResult, LockoutPolicy};
use super::models::{Account, AttemptOutcome, AttemptRecord};
use super::password::PasswordHasher;
use super::repo::{self, ResetOutcome};

/// Failure taxonomy at the orchestrator boundary. Raw store errors are
/// wrapped as `Transient` and never reach a user-visible message.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account locked")]
    Locked { until: Option<DateTime<Utc>> },
    #[error(transparent)]
    Transient(#[from] anyhow::Error),
}

/// Successful authentication, with enough identity to mint a session.
#[derive(Debug)]
pub struct Authenticated {
    pub account: Account,
}

/// Request-scoped client metadata carried into the audit trail.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Authenticate an email/password pair.
///
/// The caller supplies an already-normalized email. The caller-visible
/// error does not distinguish unknown accounts from wrong passwords; the
/// locked/invalid asymmetry is intentional.
///
/// # Errors
/// `InvalidCredentials`, `Locked`, or `Transient` per the taxonomy above.
pub async fn authenticate(
    pool: &PgPool,
    hasher: &PasswordHasher,
    policy: &LockoutPolicy,
    email: &str,
    password: &str,
    client: &ClientMeta,
) -> Result<Authenticated, AuthError> {
    let now = Utc::now();

    let account = match repo::find_for_auth(pool, email).await {
        Ok(account) => account,
        Err(err) => {
            // Store unreachable: the attempt is still logged, best-effort.
            append_best_effort(
                pool,
                AttemptRecord::new(email, AttemptOutcome::Failed)
                    .with_client(client.ip_address.clone(), client.user_agent.clone()),
            )
            .await;
            return Err(AuthError::Transient(err));
        }
    };

    let Some(account) = account else {
        append_best_effort(
            pool,
            AttemptRecord::new(email, AttemptOutcome::Failed)
                .with_client(client.ip_address.clone(), client.user_agent.clone()),
        )
        .await;
        return Err(AuthError::InvalidCredentials);
    };

    // Active lock: short-circuit before any password comparison. The lock
    // clears lazily, on the next attempt after expiry.
    if account
        .locked_until
        .is_some_and(|until| until > now)
    {
        append_best_effort(
            pool,
            AttemptRecord::new(email, AttemptOutcome::Locked)
                .with_account(account.id)
                .with_client(client.ip_address.clone(), client.user_agent.clone()),
        )
        .await;
        return Err(AuthError::Locked {
            until: account.locked_until,
        });
    }

    let matched = match hasher.verify(password, &account.password_hash) {
        Ok(matched) => matched,
        Err(err) => {
            // A malformed stored hash is unrecoverable for this account;
            // treat as a mismatch so the surface stays uniform.
            warn!(account_id = %account.id, "Stored password hash rejected: {err}");
            false
        }
    };
    let result = if matched {
        AttemptResult::Success
    } else {
        AttemptResult::Failure
    };

    let attempt = AttemptRecord::new(email, AttemptOutcome::Failed)
        .with_account(account.id)
        .with_client(client.ip_address.clone(), client.user_agent.clone());

    let resolution = match repo::apply_login_outcome(pool, account.id, &attempt, policy, result, now).await
    {
        Ok(resolution) => resolution,
        Err(err) => {
            // The counter update failed; the audit trail still gets its row
            // with best-effort data. Never retry the counter here.
            append_best_effort(
                pool,
                AttemptRecord::new(email, AttemptOutcome::Failed)
                    .with_account(account.id)
                    .with_client(client.ip_address.clone(), client.user_agent.clone()),
            )
            .await;
            return Err(AuthError::Transient(err));
        }
    };

    match resolution.outcome {
        AttemptOutcome::Success => Ok(Authenticated { account }),
        AttemptOutcome::Locked => Err(AuthError::Locked {
            until: resolution.state.locked_until,
        }),
        AttemptOutcome::Failed => Err(AuthError::InvalidCredentials),
    }
}

async fn append_best_effort(pool: &PgPool, record: AttemptRecord) {
    if let Err(err) = repo::append_login_attempt(pool, &record).await {
        error!("Failed to append login attempt: {err}");
    }
}

/// Create a reset token for an email and hand back the raw value.
///
/// Returns `Ok(None)` when no account carries the email; the HTTP surface
/// answers identically either way. Delivery of the raw token is the email
/// collaborator's job.
///
/// # Errors
/// Returns an error if token generation or the insert fails.
pub async fn request_password_reset(
    pool: &PgPool,
    email: &str,
    ttl_seconds: i64,
) -> Result<Option<String>> {
    let token = generate_reset_token()?;
    let token_hash = hash_reset_token(&token);
    let issued = repo::insert_reset_token(pool, email, &token_hash, ttl_seconds).await?;
    Ok(issued.then_some(token))
}

/// Consume a reset token and set the new password it authorizes.
///
/// # Errors
/// Returns an error if hashing or the store transaction fails.
pub async fn reset_password(
    pool: &PgPool,
    hasher: &PasswordHasher,
    token: &str,
    new_password: &str,
) -> Result<ResetOutcome> {
    let token_hash = hash_reset_token(token);
    let password_hash = hasher
        .hash(new_password)
        .context("failed to hash new password")?;
    repo::reset_password_with_token(pool, &token_hash, &password_hash).await
}

/// Replace the password of an authenticated account (forced-change flow).
///
/// Sets the password-changed flag in the same statement. The caller must
/// invalidate the current session afterwards.
///
/// # Errors
/// Returns an error if hashing or the update fails.
pub async fn force_change_password(
    pool: &PgPool,
    hasher: &PasswordHasher,
    account_id: Uuid,
    new_password: &str,
) -> Result<bool> {
    let password_hash = hasher
        .hash(new_password)
        .context("failed to hash new password")?;
    repo::set_password(pool, account_id, &password_hash).await
}

/// Create a new reset token: 32 random bytes, URL-safe base64.
///
/// The raw value is only handed to the delivery collaborator; the database
/// stores a hash.
fn generate_reset_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate reset token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a reset token so raw values never touch the database.
pub(crate) fn hash_reset_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    #[test]
    fn reset_token_has_256_bits_of_entropy() {
        let decoded_len = generate_reset_token()
            .ok()
            .and_then(|token| URL_SAFE_NO_PAD.decode(token.as_bytes()).ok())
            .map(|bytes| bytes.len());
        assert_eq!(decoded_len, Some(32));
    }

    #[test]
    fn reset_tokens_are_unique() {
        let first = generate_reset_token().expect("token");
        let second = generate_reset_token().expect("token");
        assert_ne!(first, second);
    }

    #[test]
    fn hash_reset_token_is_stable_and_discriminating() {
        let first = hash_reset_token("token");
        let second = hash_reset_token("token");
        let different = hash_reset_token("other");
        assert_eq!(first, second);
        assert_ne!(first, different);
        assert_eq!(first.len(), 32);
    }

    #[test]
    fn auth_error_messages_stay_generic() {
        assert_eq!(AuthError::InvalidCredentials.to_string(), "invalid credentials");
        assert_eq!(
            AuthError::Locked { until: None }.to_string(),
            "account locked"
        );
    }
}
