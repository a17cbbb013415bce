//! Link between an external provider identity and a local account.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Immutable once created; unique on `(provider, provider_user_id)`.
#[derive(Debug, Clone, FromRow)]
pub struct OAuthIdentity {
    pub provider: String,
    pub provider_user_id: String,
    pub account_id: Uuid,
    pub created_utc: DateTime<Utc>,
}

impl OAuthIdentity {
    pub fn new(provider: &str, provider_user_id: &str, account_id: Uuid) -> Self {
        Self {
            provider: provider.to_string(),
            provider_user_id: provider_user_id.to_string(),
            account_id,
            created_utc: Utc::now(),
        }
    }
}
