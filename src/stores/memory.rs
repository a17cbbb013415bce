//! In-memory store backend.
//!
//! Backs the test suite and embedded deployments. Sessions and accounts live
//! in `DashMap`s (per-entry locking is enough for their operations); tokens
//! and identity links sit behind a mutex because their invariants span
//! entries (supersede-then-insert, link-once).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AuthError;
use crate::models::{Account, AccountStatus, OAuthIdentity, SecurityToken, Session};
use crate::stores::{CredentialStore, OAuthIdentityStore, SessionStore, TokenStore};

#[derive(Default)]
pub struct MemoryStore {
    accounts: DashMap<Uuid, Account>,
    /// lowercase email -> account id; the entry lock makes create atomic.
    email_index: DashMap<String, Uuid>,
    /// token digest -> token.
    tokens: Mutex<HashMap<String, SecurityToken>>,
    /// session-token digest -> session.
    sessions: DashMap<String, Session>,
    /// (provider, provider_user_id) -> link.
    identities: Mutex<HashMap<(String, String), OAuthIdentity>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_tokens(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, SecurityToken>>, AuthError> {
        self.tokens
            .lock()
            .map_err(|e| AuthError::Storage(anyhow::anyhow!("token map poisoned: {e}")))
    }

    fn lock_identities(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<(String, String), OAuthIdentity>>, AuthError> {
        self.identities
            .lock()
            .map_err(|e| AuthError::Storage(anyhow::anyhow!("identity map poisoned: {e}")))
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AuthError> {
        let key = email.trim().to_lowercase();
        Ok(self
            .email_index
            .get(&key)
            .and_then(|id| self.accounts.get(&id).map(|a| a.clone())))
    }

    async fn find_by_id(&self, account_id: Uuid) -> Result<Option<Account>, AuthError> {
        Ok(self.accounts.get(&account_id).map(|a| a.clone()))
    }

    async fn create(&self, account: Account) -> Result<Account, AuthError> {
        match self.email_index.entry(account.email.clone()) {
            Entry::Occupied(_) => Err(AuthError::DuplicateEmail),
            Entry::Vacant(slot) => {
                slot.insert(account.account_id);
                self.accounts.insert(account.account_id, account.clone());
                Ok(account)
            }
        }
    }

    async fn set_password_hash(&self, account_id: Uuid, hash: &str) -> Result<(), AuthError> {
        match self.accounts.get_mut(&account_id) {
            Some(mut account) => {
                account.password_hash = Some(hash.to_string());
                Ok(())
            }
            None => Err(AuthError::Storage(anyhow::anyhow!(
                "account {account_id} not found"
            ))),
        }
    }

    async fn set_status(&self, account_id: Uuid, status: AccountStatus) -> Result<(), AuthError> {
        match self.accounts.get_mut(&account_id) {
            Some(mut account) => {
                account.status_code = status.as_str().to_string();
                Ok(())
            }
            None => Err(AuthError::Storage(anyhow::anyhow!(
                "account {account_id} not found"
            ))),
        }
    }

    async fn mark_email_verified(&self, account_id: Uuid) -> Result<(), AuthError> {
        match self.accounts.get_mut(&account_id) {
            Some(mut account) => {
                account.email_verified = true;
                Ok(())
            }
            None => Err(AuthError::Storage(anyhow::anyhow!(
                "account {account_id} not found"
            ))),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn supersede_and_insert(&self, token: SecurityToken) -> Result<(), AuthError> {
        let mut tokens = self.lock_tokens()?;
        tokens.retain(|_, t| {
            !(t.account_id == token.account_id
                && t.purpose_code == token.purpose_code
                && t.consumed_utc.is_none())
        });
        tokens.insert(token.token_hash.clone(), token);
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<SecurityToken>, AuthError> {
        Ok(self.lock_tokens()?.get(token_hash).cloned())
    }

    async fn consume(&self, token_hash: &str, now: DateTime<Utc>) -> Result<bool, AuthError> {
        let mut tokens = self.lock_tokens()?;
        match tokens.get_mut(token_hash) {
            Some(token) if token.consumed_utc.is_none() => {
                token.consumed_utc = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let mut tokens = self.lock_tokens()?;
        let before = tokens.len();
        tokens.retain(|_, t| t.expiry_utc > now);
        Ok((before - tokens.len()) as u64)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert(&self, session: Session) -> Result<(), AuthError> {
        self.sessions.insert(session.token_hash.clone(), session);
        Ok(())
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>, AuthError> {
        Ok(self.sessions.get(token_hash).map(|s| s.clone()))
    }

    async fn revoke(&self, token_hash: &str) -> Result<bool, AuthError> {
        match self.sessions.get_mut(token_hash) {
            Some(mut session) if session.revoked_utc.is_none() => {
                session.revoked_utc = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_by_account(&self, account_id: Uuid) -> Result<Vec<Session>, AuthError> {
        let mut sessions: Vec<Session> = self
            .sessions
            .iter()
            .filter(|s| s.account_id == account_id)
            .map(|s| s.clone())
            .collect();
        sessions.sort_by(|a, b| b.created_utc.cmp(&a.created_utc));
        Ok(sessions)
    }

    async fn revoke_all(&self, account_id: Uuid) -> Result<u64, AuthError> {
        let now = Utc::now();
        let mut revoked = 0;
        for mut entry in self.sessions.iter_mut() {
            if entry.account_id == account_id && entry.revoked_utc.is_none() {
                entry.revoked_utc = Some(now);
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn revoke_all_except(
        &self,
        account_id: Uuid,
        keep_token_hash: &str,
    ) -> Result<u64, AuthError> {
        let now = Utc::now();
        let mut revoked = 0;
        for mut entry in self.sessions.iter_mut() {
            if entry.account_id == account_id
                && entry.revoked_utc.is_none()
                && entry.token_hash != keep_token_hash
            {
                entry.revoked_utc = Some(now);
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.expiry_utc > now);
        Ok((before - self.sessions.len()) as u64)
    }
}

#[async_trait]
impl OAuthIdentityStore for MemoryStore {
    async fn find(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<OAuthIdentity>, AuthError> {
        Ok(self
            .lock_identities()?
            .get(&(provider.to_string(), provider_user_id.to_string()))
            .cloned())
    }

    async fn link(&self, identity: OAuthIdentity) -> Result<(), AuthError> {
        let mut identities = self.lock_identities()?;
        let key = (identity.provider.clone(), identity.provider_user_id.clone());
        if identities.contains_key(&key) {
            return Err(AuthError::Storage(anyhow::anyhow!(
                "identity already linked for {}/{}",
                key.0,
                key.1
            )));
        }
        identities.insert(key, identity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenPurpose;
    use chrono::Duration;

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let store = MemoryStore::new();
        store
            .create(Account::new("a@x.com", None, "A", "X"))
            .await
            .unwrap();

        let err = store
            .create(Account::new("A@X.COM", None, "A", "X"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
    }

    #[tokio::test]
    async fn consume_is_compare_and_set() {
        let store = MemoryStore::new();
        let account = store
            .create(Account::new("a@x.com", None, "A", "X"))
            .await
            .unwrap();
        let token = SecurityToken::new(
            account.account_id,
            TokenPurpose::PasswordReset,
            "digest-1".into(),
            Duration::hours(1),
        );
        store.supersede_and_insert(token).await.unwrap();

        assert!(store.consume("digest-1", Utc::now()).await.unwrap());
        assert!(!store.consume("digest-1", Utc::now()).await.unwrap());
        assert!(!store.consume("unknown", Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn supersede_removes_prior_unconsumed_token_of_same_purpose() {
        let store = MemoryStore::new();
        let account = store
            .create(Account::new("a@x.com", None, "A", "X"))
            .await
            .unwrap();

        let first = SecurityToken::new(
            account.account_id,
            TokenPurpose::PasswordReset,
            "digest-1".into(),
            Duration::hours(1),
        );
        let second = SecurityToken::new(
            account.account_id,
            TokenPurpose::PasswordReset,
            "digest-2".into(),
            Duration::hours(1),
        );
        let other_purpose = SecurityToken::new(
            account.account_id,
            TokenPurpose::EmailVerification,
            "digest-3".into(),
            Duration::hours(1),
        );

        store.supersede_and_insert(first).await.unwrap();
        store.supersede_and_insert(other_purpose).await.unwrap();
        store.supersede_and_insert(second).await.unwrap();

        assert!(store.find_by_hash("digest-1").await.unwrap().is_none());
        assert!(store.find_by_hash("digest-2").await.unwrap().is_some());
        // Different purpose is untouched.
        assert!(store.find_by_hash("digest-3").await.unwrap().is_some());
    }
}
