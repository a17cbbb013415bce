//! Token ledger: issue, validate, consume, purge.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::AuthError;
use crate::models::{SecurityToken, TokenPurpose};
use crate::stores::TokenStore;
use crate::utils::secret::{digest, digest_eq, generate_secret};

/// A freshly issued token: the persisted record plus the secret that is
/// handed to the notification collaborator exactly once.
pub struct IssuedToken {
    pub record: SecurityToken,
    pub secret: String,
}

#[derive(Clone)]
pub struct TokenLedger {
    store: Arc<dyn TokenStore>,
}

impl TokenLedger {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// Issue a token, superseding any outstanding unconsumed token of the
    /// same purpose for the account.
    pub async fn issue(
        &self,
        account_id: Uuid,
        purpose: TokenPurpose,
        ttl: Duration,
    ) -> Result<IssuedToken, AuthError> {
        let secret = generate_secret();
        let record = SecurityToken::new(account_id, purpose, digest(&secret), ttl);
        self.store.supersede_and_insert(record.clone()).await?;

        tracing::debug!(
            account_id = %account_id,
            purpose = purpose.as_str(),
            token_id = %record.token_id,
            "security token issued"
        );

        Ok(IssuedToken { record, secret })
    }

    /// Check a presented secret without consuming it. Expiry is judged
    /// against server time only.
    pub async fn validate(
        &self,
        secret: &str,
        purpose: TokenPurpose,
    ) -> Result<SecurityToken, AuthError> {
        let hash = digest(secret);
        let token = self
            .store
            .find_by_hash(&hash)
            .await?
            .ok_or(AuthError::Invalid)?;

        if !digest_eq(&token.token_hash, &hash) || !token.has_purpose(purpose) {
            return Err(AuthError::Invalid);
        }
        if token.is_consumed() {
            return Err(AuthError::Invalid);
        }
        if token.is_expired() {
            return Err(AuthError::Expired);
        }
        Ok(token)
    }

    /// Consume a token. Compare-and-set underneath: of two concurrent calls
    /// for the same token, exactly one succeeds and the other sees `Invalid`.
    pub async fn consume(&self, secret: &str) -> Result<(), AuthError> {
        let hash = digest(secret);
        if self.store.consume(&hash, Utc::now()).await? {
            Ok(())
        } else {
            Err(AuthError::Invalid)
        }
    }

    /// Drop expired tokens. Advisory; validation already checks expiry.
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        self.store.purge_expired(Utc::now()).await
    }
}
