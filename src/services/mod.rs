//! Business-logic services: orchestration, session and token lifecycle,
//! OAuth2 mediation, and the outbound collaborators (email, pending-state
//! cache) behind traits.

mod auth;
mod email;
mod oauth;
mod sessions;
mod state_store;
mod sweeper;
mod tokens;

pub use auth::{AuthPolicy, AuthService, LoginOutcome, TokenTtls};
pub use email::{EmailProvider, MockEmailService, SmtpEmailService};
pub use oauth::{GoogleProvider, IdentityProvider, LinkPolicy, OAuth2Bridge, ProviderIdentity};
pub use sessions::{IssuedSession, SessionManager};
pub use state_store::{MemoryStateStore, RedisStateStore, StateStore};
pub use sweeper::spawn_sweeper;
pub use tokens::{IssuedToken, TokenLedger};
