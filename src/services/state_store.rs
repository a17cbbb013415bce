//! TTL-keyed storage for pending OAuth2 attempts.
//!
//! The anti-forgery `state` of each attempt lives here rather than in any
//! in-process singleton, so concurrent attempts and horizontally scaled
//! deployments both work. `take` removes the entry, which is what makes a
//! state single-use.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use redis::{aio::ConnectionManager, Client};

use crate::config::RedisConfig;
use crate::error::AuthError;

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn put(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<(), AuthError>;

    /// Fetch and delete in one step; `None` when unknown or expired.
    async fn take(&self, key: &str) -> Result<Option<String>, AuthError>;
}

/// Redis-backed store for deployments.
#[derive(Clone)]
pub struct RedisStateStore {
    manager: ConnectionManager,
}

impl RedisStateStore {
    pub async fn connect(config: &RedisConfig) -> Result<Self, AuthError> {
        tracing::info!("connecting to Redis");
        let client = Client::open(config.url.clone())
            .map_err(|e| AuthError::Storage(anyhow::Error::new(e)))?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| AuthError::Storage(anyhow::anyhow!("Redis connection failed: {e}")))?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn put(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<(), AuthError> {
        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_seconds)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, AuthError> {
        let mut conn = self.manager.clone();
        let value: Option<String> = redis::cmd("GETDEL").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }
}

/// In-process store for tests and single-node embedding.
#[derive(Default)]
pub struct MemoryStateStore {
    entries: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn put(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<(), AuthError> {
        let expiry = Utc::now() + Duration::seconds(ttl_seconds);
        self.entries
            .lock()
            .map_err(|e| AuthError::Storage(anyhow::anyhow!("state map poisoned: {e}")))?
            .insert(key.to_string(), (value.to_string(), expiry));
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, AuthError> {
        let entry = self
            .entries
            .lock()
            .map_err(|e| AuthError::Storage(anyhow::anyhow!("state map poisoned: {e}")))?
            .remove(key);
        Ok(entry.and_then(|(value, expiry)| (expiry > Utc::now()).then_some(value)))
    }
}
