//! Stateless session credential: claims, issuance, and reconciliation.
//!
//! Claims are a snapshot of security-relevant account state taken at mint
//! time, signed as an HS256 JWT. The snapshot can go stale relative to the
//! account row; `reconcile` bounds that staleness by re-reading the live
//! password-changed flag on every session refresh and patching the claim
//! when it has flipped false→true. Without this, a credential minted during
//! the forced-change flow keeps bouncing its user back to the change page
//! after the password was already changed.

use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use super::models::{Account, Role};

/// Clock-skew tolerance for `exp` validation.
const LEEWAY_SECONDS: u64 = 60;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session expired")]
    Expired,
    #[error("invalid session credential")]
    Invalid,
}

/// Signed session payload.
///
/// `pwc` is the password-changed flag *snapshot*, not a live read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Account id.
    pub sub: Uuid,
    pub iss: String,
    pub role: Role,
    /// Tenant id; absent for the top administrative role.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tid: Option<Uuid>,
    /// Password-changed flag snapshot.
    pub pwc: bool,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Mints and verifies session credentials with a shared HS256 secret.
pub struct SessionIssuer {
    secret: SecretString,
    issuer: String,
    ttl_seconds: i64,
}

impl SessionIssuer {
    #[must_use]
    pub fn new(secret: SecretString, issuer: String, ttl_seconds: i64) -> Self {
        Self {
            secret,
            issuer,
            ttl_seconds,
        }
    }

    #[must_use]
    pub const fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Mint a fresh credential snapshotting the account's security state.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn mint(&self, account: &Account) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: account.id,
            iss: self.issuer.clone(),
            role: account.role,
            tid: account.tenant_id,
            pwc: account.is_password_changed,
            iat: now,
            exp: now + self.ttl_seconds,
            jti: Uuid::new_v4().to_string(),
        };
        self.sign(&claims)
    }

    /// Re-sign existing claims with a fresh lifetime and token id.
    ///
    /// The snapshot fields travel unchanged; callers reconcile them against
    /// the store first.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn refresh(&self, claims: &SessionClaims) -> Result<String> {
        let now = Utc::now().timestamp();
        let refreshed = SessionClaims {
            iat: now,
            exp: now + self.ttl_seconds,
            jti: Uuid::new_v4().to_string(),
            ..claims.clone()
        };
        self.sign(&refreshed)
    }

    /// Verify a presented credential and return its claims.
    ///
    /// # Errors
    /// `Expired` for out-of-lifetime tokens, `Invalid` for everything else
    /// (bad signature, malformed payload, wrong issuer).
    pub fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = LEEWAY_SECONDS;
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation.set_issuer(&[&self.issuer]);
        let key = DecodingKey::from_secret(self.secret.expose_secret().as_bytes());
        match decode::<SessionClaims>(token, &key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(err) => match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(SessionError::Expired),
                _ => Err(SessionError::Invalid),
            },
        }
    }

    fn sign(&self, claims: &SessionClaims) -> Result<String> {
        let key = EncodingKey::from_secret(self.secret.expose_secret().as_bytes());
        encode(&Header::new(Algorithm::HS256), claims, &key)
            .context("failed to sign session credential")
    }
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("secret", &"***")
            .field("issuer", &self.issuer)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

/// Reconcile a claims snapshot against the live account row.
///
/// Re-reads the password-changed flag and patches the snapshot when it has
/// flipped false→true since mint time. Returns `Ok(None)` when the account
/// no longer exists, in which case the session must be treated as invalid.
///
/// # Errors
/// Returns an error if the store read fails.
pub async fn reconcile(pool: &PgPool, claims: SessionClaims) -> Result<Option<SessionClaims>> {
    let Some(live) = super::repo::read_password_changed(pool, claims.sub).await? else {
        return Ok(None);
    };
    let mut claims = claims;
    if !claims.pwc && live {
        claims.pwc = true;
    }
    Ok(Some(claims))
}
