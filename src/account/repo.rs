//! Database adapter for account security state.
//!
//! All read-modify-write sequences on the lockout counters run inside a
//! single transaction with a row-level lock (`SELECT ... FOR UPDATE`), so
//! two concurrent failed attempts cannot read the same pre-increment
//! counter and both write `count + 1`. The audit append for an attempt is
//! part of the same transaction; if the transaction fails, the caller
//! appends the attempt separately (see `service::authenticate`).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::lockout::{AttemptResult, LockState, LockoutPolicy};
use super::models::{Account, AttemptOutcome, AttemptRecord};

/// Final state of one adjudicated login attempt.
#[derive(Debug, Clone, Copy)]
pub struct LoginResolution {
    pub outcome: AttemptOutcome,
    pub state: LockState,
}

/// Outcome of consuming a reset token.
#[derive(Debug)]
pub enum ResetOutcome {
    Consumed { account_id: Uuid, email: String },
    Expired,
    Invalid,
}

/// Look up the security slice of an account by normalized email.
///
/// # Errors
/// Returns an error if the query fails.
pub async fn find_for_auth(pool: &PgPool, email: &str) -> Result<Option<Account>> {
    let query = r"
        SELECT id, email, password_hash, role, tenant_id,
               failed_login_attempts, locked_until, is_password_changed, last_login_at
        FROM accounts
        WHERE email = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    sqlx::query_as::<_, Account>(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to look up account for auth")
}

/// Append one row to the append-only login log.
///
/// # Errors
/// Returns an error if the insert fails; callers treat this as best-effort
/// and only log the failure.
pub async fn append_login_attempt(pool: &PgPool, record: &AttemptRecord) -> Result<()> {
    let query = r"
        INSERT INTO login_log (email, account_id, ip_address, user_agent, status)
        VALUES ($1, $2, $3, $4, $5)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(&record.email)
        .bind(record.account_id)
        .bind(record.ip_address.as_deref())
        .bind(record.user_agent.as_deref())
        .bind(record.outcome.as_str())
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to append login attempt")?;
    Ok(())
}

/// Apply the outcome of a password comparison to an account, atomically.
///
/// Inside one transaction: re-read the counters under a row lock, recompute
/// the next lockout state against the fresh values, update the row, and
/// append the audit entry. The `attempt` record supplies the audit
/// identity/client fields; its outcome field is ignored in favor of the
/// adjudicated one. A lock set concurrently by another request is honored
/// here even though the caller's pre-check saw the account unlocked.
///
/// # Errors
/// Returns an error if any statement or the commit fails; no partial state
/// is left behind.
pub async fn apply_login_outcome(
    pool: &PgPool,
    account_id: Uuid,
    attempt: &AttemptRecord,
    policy: &LockoutPolicy,
    result: AttemptResult,
    now: DateTime<Utc>,
) -> Result<LoginResolution> {
    let mut tx = pool.begin().await.context("begin login outcome transaction")?;

    let query = r"
        SELECT failed_login_attempts, locked_until
        FROM accounts
        WHERE id = $1
        FOR UPDATE
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(account_id)
        .fetch_one(&mut *tx)
        .instrument(span)
        .await
        .context("failed to lock account row")?;

    let current = LockState {
        fail_count: row.get("failed_login_attempts"),
        locked_until: row.get("locked_until"),
    };

    // Another request may have locked the account between the caller's read
    // and this transaction. The lock wins; counters stay untouched.
    let resolution = if current.is_locked(now) {
        LoginResolution {
            outcome: AttemptOutcome::Locked,
            state: current,
        }
    } else {
        let next = policy.next_state(current, now, result);
        match result {
            AttemptResult::Success => {
                let query = r"
                    UPDATE accounts
                    SET failed_login_attempts = 0,
                        locked_until = NULL,
                        last_login_at = $2,
                        updated_at = NOW()
                    WHERE id = $1
                ";
                let span = tracing::info_span!(
                    "db.query",
                    db.system = "postgresql",
                    db.operation = "UPDATE",
                    db.statement = query
                );
                sqlx::query(query)
                    .bind(account_id)
                    .bind(now)
                    .execute(&mut *tx)
                    .instrument(span)
                    .await
                    .context("failed to record successful login")?;
                LoginResolution {
                    outcome: AttemptOutcome::Success,
                    state: next,
                }
            }
            AttemptResult::Failure => {
                let query = r"
                    UPDATE accounts
                    SET failed_login_attempts = $2,
                        locked_until = $3,
                        updated_at = NOW()
                    WHERE id = $1
                ";
                let span = tracing::info_span!(
                    "db.query",
                    db.system = "postgresql",
                    db.operation = "UPDATE",
                    db.statement = query
                );
                sqlx::query(query)
                    .bind(account_id)
                    .bind(next.fail_count)
                    .bind(next.locked_until)
                    .execute(&mut *tx)
                    .instrument(span)
                    .await
                    .context("failed to record failed login")?;
                let outcome = if next.is_locked(now) {
                    AttemptOutcome::Locked
                } else {
                    AttemptOutcome::Failed
                };
                LoginResolution {
                    outcome,
                    state: next,
                }
            }
        }
    };

    let query = r"
        INSERT INTO login_log (email, account_id, ip_address, user_agent, status)
        VALUES ($1, $2, $3, $4, $5)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(&attempt.email)
        .bind(account_id)
        .bind(attempt.ip_address.as_deref())
        .bind(attempt.user_agent.as_deref())
        .bind(resolution.outcome.as_str())
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to append login attempt")?;

    tx.commit().await.context("commit login outcome transaction")?;

    Ok(resolution)
}

/// Store a reset token hash for an email, replacing any prior token.
///
/// Returns `false` when no account carries the email; the caller still
/// answers 202 so the surface does not leak account existence.
///
/// # Errors
/// Returns an error if any statement or the commit fails.
pub async fn insert_reset_token(
    pool: &PgPool,
    email: &str,
    token_hash: &[u8],
    ttl_seconds: i64,
) -> Result<bool> {
    let mut tx = pool.begin().await.context("begin reset token transaction")?;

    let query = "SELECT 1 FROM accounts WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let exists = sqlx::query(query)
        .bind(email)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to look up account for reset")?
        .is_some();

    if !exists {
        tx.commit().await.context("commit reset token noop")?;
        return Ok(false);
    }

    // At most one actionable token per email: replace, do not accumulate.
    let query = "DELETE FROM password_reset_tokens WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to clear prior reset tokens")?;

    let query = r"
        INSERT INTO password_reset_tokens (token_hash, email, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token_hash)
        .bind(email)
        .bind(ttl_seconds)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert reset token")?;

    tx.commit().await.context("commit reset token transaction")?;
    Ok(true)
}

/// Consume a reset token and apply the password update it authorizes.
///
/// The delete and the update share one transaction, and the delete filters
/// on expiry: of two concurrent consumers, exactly one wins the deleted
/// row; the other observes `Invalid`. Expired tokens are left in place.
///
/// # Errors
/// Returns an error if any statement or the commit fails.
pub async fn reset_password_with_token(
    pool: &PgPool,
    token_hash: &[u8],
    new_password_hash: &str,
) -> Result<ResetOutcome> {
    let mut tx = pool.begin().await.context("begin password reset transaction")?;

    let query = r"
        DELETE FROM password_reset_tokens
        WHERE token_hash = $1
          AND expires_at > NOW()
        RETURNING email
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to consume reset token")?;

    let Some(row) = row else {
        // Distinguish expired from unknown for server-side logging only;
        // both surface to the user as invalid-or-expired.
        let query = "SELECT 1 FROM password_reset_tokens WHERE token_hash = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let expired = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&mut *tx)
            .instrument(span)
            .await
            .context("failed to check reset token expiry")?
            .is_some();
        tx.commit().await.context("commit reset token lookup")?;
        return Ok(if expired {
            ResetOutcome::Expired
        } else {
            ResetOutcome::Invalid
        });
    };

    let email: String = row.get("email");
    let query = r"
        UPDATE accounts
        SET password_hash = $2,
            is_password_changed = TRUE,
            failed_login_attempts = 0,
            locked_until = NULL,
            updated_at = NOW()
        WHERE email = $1
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(&email)
        .bind(new_password_hash)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to update password from reset")?;

    let Some(row) = row else {
        // Token referenced an email that no longer has an account. Roll
        // back so the token is not burned by a no-op.
        tx.rollback().await.context("rollback orphan reset token")?;
        return Ok(ResetOutcome::Invalid);
    };

    let account_id: Uuid = row.get("id");
    tx.commit().await.context("commit password reset transaction")?;

    Ok(ResetOutcome::Consumed { account_id, email })
}

/// Replace an account's password during the forced-change flow.
///
/// Sets the password-changed flag and resets the lockout counters in the
/// same statement. Returns `false` when the account no longer exists.
///
/// # Errors
/// Returns an error if the update fails.
pub async fn set_password(pool: &PgPool, account_id: Uuid, new_password_hash: &str) -> Result<bool> {
    let query = r"
        UPDATE accounts
        SET password_hash = $2,
            is_password_changed = TRUE,
            failed_login_attempts = 0,
            locked_until = NULL,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(account_id)
        .bind(new_password_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update password")?;
    Ok(result.rows_affected() == 1)
}

/// Read the live password-changed flag for session reconciliation.
///
/// # Errors
/// Returns an error if the query fails.
pub async fn read_password_changed(pool: &PgPool, account_id: Uuid) -> Result<Option<bool>> {
    let query = "SELECT is_password_changed FROM accounts WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(account_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to read password-changed flag")?;
    Ok(row.map(|row| row.get("is_password_changed")))
}
