//! Account model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Account status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Revoked,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Revoked => "revoked",
        }
    }
}

/// A registered user identity. `password_hash` is `None` for accounts created
/// through an OAuth2 provider that never set a password.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub account_id: Uuid,
    pub email: String,
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email_verified: bool,
    pub status_code: String,
    pub created_utc: DateTime<Utc>,
}

impl Account {
    /// Create a new active account. The email is normalized to lowercase so
    /// uniqueness and lookups are case-insensitive everywhere.
    pub fn new(
        email: &str,
        password_hash: Option<String>,
        first_name: &str,
        last_name: &str,
    ) -> Self {
        Self {
            account_id: Uuid::new_v4(),
            email: email.trim().to_lowercase(),
            password_hash,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email_verified: false,
            status_code: AccountStatus::Active.as_str().to_string(),
            created_utc: Utc::now(),
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.status_code == AccountStatus::Revoked.as_str()
    }

    /// Response shape without sensitive fields.
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            account_id: self.account_id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email_verified: self.email_verified,
        }
    }
}

/// Account view for API responses; never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub account_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub email_verified: bool,
}

/// Registration input as received from the transport layer.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}
