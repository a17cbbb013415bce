//! Session lifecycle: create, validate, revoke, enumerate.
//!
//! Session tokens are opaque, high-entropy, and unrelated to the account id.
//! Validation never extends a session; there is no sliding expiration.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::AuthError;
use crate::models::Session;
use crate::stores::SessionStore;
use crate::utils::secret::{digest, digest_eq, generate_secret};

/// A freshly created session: the record plus the token the client keeps.
pub struct IssuedSession {
    pub session: Session,
    pub token: String,
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
    remember_me_ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration, remember_me_ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            remember_me_ttl,
        }
    }

    pub async fn create(
        &self,
        account_id: Uuid,
        remember_me: bool,
        client_meta: Option<String>,
    ) -> Result<IssuedSession, AuthError> {
        let token = generate_secret();
        let ttl = if remember_me {
            self.remember_me_ttl
        } else {
            self.ttl
        };
        let session = Session::new(account_id, digest(&token), remember_me, client_meta, ttl);
        self.store.insert(session.clone()).await?;

        tracing::debug!(
            account_id = %account_id,
            session_id = %session.session_id,
            remember_me,
            "session created"
        );

        Ok(IssuedSession { session, token })
    }

    /// Resolve a presented token to a live session. Unknown, revoked, and
    /// expired all collapse to `Invalid`.
    pub async fn validate(&self, token: &str) -> Result<Session, AuthError> {
        let hash = digest(token);
        let session = self
            .store
            .find_by_token_hash(&hash)
            .await?
            .ok_or(AuthError::Invalid)?;

        if !digest_eq(&session.token_hash, &hash) || !session.is_valid() {
            return Err(AuthError::Invalid);
        }
        Ok(session)
    }

    /// Revoke the session behind a token. Deliberately succeeds for unknown
    /// or already-revoked tokens so callers cannot probe validity.
    pub async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        let hit = self.store.revoke(&digest(token)).await?;
        tracing::debug!(hit, "session revocation requested");
        Ok(())
    }

    pub async fn list_by_account(&self, account_id: Uuid) -> Result<Vec<Session>, AuthError> {
        self.store.list_by_account(account_id).await
    }

    /// Invalidate every session of an account (password reset, revocation).
    pub async fn revoke_all(&self, account_id: Uuid) -> Result<u64, AuthError> {
        let revoked = self.store.revoke_all(account_id).await?;
        tracing::info!(account_id = %account_id, revoked, "revoked all sessions");
        Ok(revoked)
    }

    /// Invalidate every session of an account except the one behind
    /// `keep_token_hash` (password change keeps the caller signed in).
    pub async fn revoke_all_except(
        &self,
        account_id: Uuid,
        keep_token_hash: &str,
    ) -> Result<u64, AuthError> {
        let revoked = self
            .store
            .revoke_all_except(account_id, keep_token_hash)
            .await?;
        tracing::info!(account_id = %account_id, revoked, "revoked other sessions");
        Ok(revoked)
    }

    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        self.store.purge_expired(Utc::now()).await
    }
}
