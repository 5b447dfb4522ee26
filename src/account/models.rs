use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use uuid::Uuid;

/// Closed set of dashboard roles persisted in `accounts.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Cross-tenant administrator; the only role without a tenant id.
    SuperAdmin,
    Admin,
    Staff,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Admin => "admin",
            Self::Staff => "staff",
        }
    }

    /// Parse the persisted `accounts.role` textual value into a typed enum.
    fn from_db(value: &str) -> Result<Self, sqlx::Error> {
        match value {
            "super_admin" => Ok(Self::SuperAdmin),
            "admin" => Ok(Self::Admin),
            "staff" => Ok(Self::Staff),
            _ => Err(sqlx::Error::Decode(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid accounts.role value: {value}"),
            )))),
        }
    }
}

/// Security-relevant slice of an account row, as read for authentication.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub tenant_id: Option<Uuid>,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub is_password_changed: bool,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for Account {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: Role::from_db(&role)?,
            tenant_id: row.try_get("tenant_id")?,
            failed_login_attempts: row.try_get("failed_login_attempts")?,
            locked_until: row.try_get("locked_until")?,
            is_password_changed: row.try_get("is_password_changed")?,
            last_login_at: row.try_get("last_login_at")?,
        })
    }
}

/// Audit outcome persisted in `login_log.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failed,
    Locked,
}

impl AttemptOutcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Locked => "locked",
        }
    }
}

/// One append-only `login_log` row. The email is kept even when no account
/// matched, for abuse forensics.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub email: String,
    pub account_id: Option<Uuid>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub outcome: AttemptOutcome,
}

impl AttemptRecord {
    #[must_use]
    pub fn new(email: &str, outcome: AttemptOutcome) -> Self {
        Self {
            email: email.to_string(),
            account_id: None,
            ip_address: None,
            user_agent: None,
            outcome,
        }
    }

    #[must_use]
    pub fn with_account(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn with_client(mut self, ip: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip;
        self.user_agent = user_agent;
        self
    }
}
