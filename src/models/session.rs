//! Session model - one authenticated login instance.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Server-tracked session. The opaque token handed to the client is never
/// stored; only its SHA-256 digest is.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub session_id: Uuid,
    pub account_id: Uuid,
    pub token_hash: String,
    pub remember_me: bool,
    pub client_meta: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub expiry_utc: DateTime<Utc>,
    pub revoked_utc: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(
        account_id: Uuid,
        token_hash: String,
        remember_me: bool,
        client_meta: Option<String>,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            account_id,
            token_hash,
            remember_me,
            client_meta,
            created_utc: now,
            expiry_utc: now + ttl,
            revoked_utc: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expiry_utc <= Utc::now()
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_utc.is_some()
    }

    /// Not expired, not revoked.
    pub fn is_valid(&self) -> bool {
        !self.is_revoked() && !self.is_expired()
    }
}

/// Session view for enumeration responses.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: Uuid,
    pub created_utc: DateTime<Utc>,
    pub expiry_utc: DateTime<Utc>,
    pub remember_me: bool,
    pub client_meta: Option<String>,
    pub is_current: bool,
}

impl From<Session> for SessionInfo {
    fn from(s: Session) -> Self {
        Self {
            session_id: s.session_id,
            created_utc: s.created_utc,
            expiry_utc: s.expiry_utc,
            remember_me: s.remember_me,
            client_meta: s.client_meta,
            is_current: false, // set by the caller
        }
    }
}
