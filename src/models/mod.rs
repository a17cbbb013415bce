pub mod account;
pub mod oauth_identity;
pub mod security_token;
pub mod session;

pub use account::{Account, AccountStatus, AccountSummary, RegisterDraft};
pub use oauth_identity::OAuthIdentity;
pub use security_token::{SecurityToken, TokenPurpose};
pub use session::{Session, SessionInfo};
