//! Error taxonomy for the auth core.
//!
//! Every operation surfaces one of these variants. Variants that collapse
//! several internal causes (notably [`AuthError::InvalidCredentials`]) do so
//! deliberately: the precise cause is logged at the orchestration boundary,
//! never returned to the caller, so responses cannot be used to enumerate
//! accounts.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email, missing password hash, or wrong password. One variant
    /// on purpose.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account exists but access has been revoked.
    #[error("account access is revoked")]
    AccessRevoked,

    #[error("that email address is already taken")]
    DuplicateEmail,

    #[error("passwords do not match")]
    PasswordMismatch,

    /// The operation requires an authenticated caller and none was presented.
    #[error("not authenticated")]
    Unauthenticated,

    /// Unknown, consumed, superseded, or otherwise unusable token or session.
    #[error("invalid token or session")]
    Invalid,

    #[error("token expired")]
    Expired,

    /// OAuth2 anti-forgery state did not match any pending attempt.
    #[error("oauth state mismatch")]
    StateMismatch,

    #[error("identity provider error: {0}")]
    Provider(String),

    #[error("notification delivery failed: {0}")]
    Delivery(String),

    #[error("storage error: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("operation timed out")]
    Timeout,

    #[error("internal error: {0}")]
    Internal(#[source] anyhow::Error),
}

/// Stable machine-readable error kind, for transport-layer mapping to status
/// codes or response bodies. Never carries internal detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidCredentials,
    AccessRevoked,
    DuplicateEmail,
    PasswordMismatch,
    Unauthenticated,
    Invalid,
    Expired,
    StateMismatch,
    Provider,
    Delivery,
    Storage,
    Timeout,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidCredentials => "invalid_credentials",
            ErrorKind::AccessRevoked => "access_revoked",
            ErrorKind::DuplicateEmail => "duplicate_email",
            ErrorKind::PasswordMismatch => "password_mismatch",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Invalid => "invalid",
            ErrorKind::Expired => "expired",
            ErrorKind::StateMismatch => "state_mismatch",
            ErrorKind::Provider => "provider_error",
            ErrorKind::Delivery => "delivery_error",
            ErrorKind::Storage => "storage_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Internal => "internal_error",
        }
    }
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidCredentials => ErrorKind::InvalidCredentials,
            AuthError::AccessRevoked => ErrorKind::AccessRevoked,
            AuthError::DuplicateEmail => ErrorKind::DuplicateEmail,
            AuthError::PasswordMismatch => ErrorKind::PasswordMismatch,
            AuthError::Unauthenticated => ErrorKind::Unauthenticated,
            AuthError::Invalid => ErrorKind::Invalid,
            AuthError::Expired => ErrorKind::Expired,
            AuthError::StateMismatch => ErrorKind::StateMismatch,
            AuthError::Provider(_) => ErrorKind::Provider,
            AuthError::Delivery(_) => ErrorKind::Delivery,
            AuthError::Storage(_) => ErrorKind::Storage,
            AuthError::Timeout => ErrorKind::Timeout,
            AuthError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Storage(anyhow::Error::new(err))
    }
}

impl From<redis::RedisError> for AuthError {
    fn from(err: redis::RedisError) -> Self {
        AuthError::Storage(anyhow::Error::new(err))
    }
}
