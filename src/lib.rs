//! Authentication and session-lifecycle core.
//!
//! This crate is the auth subsystem of a web-facing application, minus the
//! transport: it authenticates credentials, issues and tracks opaque sessions,
//! mediates the OAuth2 authorization-code flow with an external identity
//! provider, and manages single-use security tokens for password reset and
//! email verification. A transport layer (HTTP or otherwise) calls the typed
//! operations on [`AuthService`] and renders the typed results.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod stores;
pub mod utils;

pub use config::AuthConfig;
pub use error::{AuthError, ErrorKind};
pub use services::{
    AuthPolicy, AuthService, EmailProvider, IdentityProvider, LinkPolicy, LoginOutcome,
    OAuth2Bridge, ProviderIdentity, SessionManager, StateStore, TokenLedger, TokenTtls,
};
pub use stores::{MemoryStore, PgStore};
