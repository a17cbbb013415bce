//! Persistence abstractions.
//!
//! The core never talks to a database directly; it goes through these traits.
//! Two backends ship with the crate: [`PgStore`] (PostgreSQL via sqlx) for
//! deployments and [`MemoryStore`] for tests and embedded use. Both must be
//! safe under concurrent invocation for the same account; the contract
//! comments below call out the operations where atomicity matters.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AuthError;
use crate::models::{Account, AccountStatus, OAuthIdentity, SecurityToken, Session};

/// Account persistence. Email comparisons are case-insensitive.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AuthError>;

    async fn find_by_id(&self, account_id: Uuid) -> Result<Option<Account>, AuthError>;

    /// Insert a new account. Two concurrent creates for the same email must
    /// resolve to exactly one success; the loser gets `DuplicateEmail`.
    async fn create(&self, account: Account) -> Result<Account, AuthError>;

    async fn set_password_hash(&self, account_id: Uuid, hash: &str) -> Result<(), AuthError>;

    async fn set_status(&self, account_id: Uuid, status: AccountStatus) -> Result<(), AuthError>;

    async fn mark_email_verified(&self, account_id: Uuid) -> Result<(), AuthError>;
}

/// Security-token persistence, keyed by token digest.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Atomically remove any unconsumed token with the same
    /// `(account_id, purpose)` and insert the new one. This is what enforces
    /// "at most one outstanding token per purpose".
    async fn supersede_and_insert(&self, token: SecurityToken) -> Result<(), AuthError>;

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<SecurityToken>, AuthError>;

    /// Compare-and-set on `consumed_utc`: returns `true` for exactly one
    /// caller per token, `false` once consumed or unknown.
    async fn consume(&self, token_hash: &str, now: DateTime<Utc>) -> Result<bool, AuthError>;

    /// Advisory cleanup; validation never depends on it.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError>;
}

/// Session persistence, keyed by session-token digest.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: Session) -> Result<(), AuthError>;

    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<Session>, AuthError>;

    /// Mark one session revoked. Returns whether a live session was hit;
    /// callers that must not leak validity ignore the flag.
    async fn revoke(&self, token_hash: &str) -> Result<bool, AuthError>;

    /// All sessions of an account, `created_utc` descending.
    async fn list_by_account(&self, account_id: Uuid) -> Result<Vec<Session>, AuthError>;

    async fn revoke_all(&self, account_id: Uuid) -> Result<u64, AuthError>;

    async fn revoke_all_except(
        &self,
        account_id: Uuid,
        keep_token_hash: &str,
    ) -> Result<u64, AuthError>;

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError>;
}

/// Provider-identity links.
#[async_trait]
pub trait OAuthIdentityStore: Send + Sync {
    async fn find(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<OAuthIdentity>, AuthError>;

    /// Insert a link. Links are immutable; a duplicate is a storage error
    /// (backed by the primary key on `(provider, provider_user_id)`).
    async fn link(&self, identity: OAuthIdentity) -> Result<(), AuthError>;
}
