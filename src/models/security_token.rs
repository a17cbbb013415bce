//! Single-use, time-boxed security tokens.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    PasswordReset,
    EmailVerification,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::PasswordReset => "password_reset",
            TokenPurpose::EmailVerification => "email_verification",
        }
    }
}

/// A secret authorizing one sensitive follow-up action. Only the digest of
/// the secret is persisted; `consumed_utc` is set exactly once.
#[derive(Debug, Clone, FromRow)]
pub struct SecurityToken {
    pub token_id: Uuid,
    pub token_hash: String,
    pub account_id: Uuid,
    pub purpose_code: String,
    pub created_utc: DateTime<Utc>,
    pub expiry_utc: DateTime<Utc>,
    pub consumed_utc: Option<DateTime<Utc>>,
}

impl SecurityToken {
    pub fn new(account_id: Uuid, purpose: TokenPurpose, token_hash: String, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            token_id: Uuid::new_v4(),
            token_hash,
            account_id,
            purpose_code: purpose.as_str().to_string(),
            created_utc: now,
            expiry_utc: now + ttl,
            consumed_utc: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expiry_utc <= Utc::now()
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed_utc.is_some()
    }

    pub fn has_purpose(&self, purpose: TokenPurpose) -> bool {
        self.purpose_code == purpose.as_str()
    }
}
