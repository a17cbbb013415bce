//! Orchestration of the auth use cases.
//!
//! Each operation coordinates the stores, the token ledger, the session
//! manager, and the OAuth2 bridge, and enforces the business rules the
//! transport layer must not be trusted with. Internal failure causes are
//! logged here and collapsed to the public error taxonomy: unknown email and
//! wrong password are indistinguishable to the caller, and password-reset
//! requests acknowledge identically whether or not the email exists.

use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use crate::error::AuthError;
use crate::models::{
    Account, AccountSummary, RegisterDraft, Session, SessionInfo, TokenPurpose,
};
use crate::services::{EmailProvider, OAuth2Bridge, SessionManager, TokenLedger};
use crate::stores::CredentialStore;
use crate::utils::password::{hash_password, verify_password, Password};

/// Business-policy switches.
#[derive(Debug, Clone, Copy)]
pub struct AuthPolicy {
    /// Issue and send an email-verification token at registration.
    pub verify_email_on_signup: bool,
}

/// Token lifetimes, from configuration.
#[derive(Debug, Clone, Copy)]
pub struct TokenTtls {
    pub password_reset: Duration,
    pub email_verification: Duration,
}

impl Default for TokenTtls {
    fn default() -> Self {
        Self {
            password_reset: Duration::minutes(60),
            email_verification: Duration::hours(24),
        }
    }
}

/// Result of a successful login: the sanitized account, the session record,
/// and the opaque token the client presents from now on.
#[derive(Debug)]
pub struct LoginOutcome {
    pub account: AccountSummary,
    pub session: Session,
    pub session_token: String,
}

#[derive(Clone)]
pub struct AuthService {
    accounts: Arc<dyn CredentialStore>,
    tokens: TokenLedger,
    sessions: SessionManager,
    oauth: OAuth2Bridge,
    email: Arc<dyn EmailProvider>,
    ttls: TokenTtls,
    policy: AuthPolicy,
}

impl AuthService {
    pub fn new(
        accounts: Arc<dyn CredentialStore>,
        tokens: TokenLedger,
        sessions: SessionManager,
        oauth: OAuth2Bridge,
        email: Arc<dyn EmailProvider>,
        ttls: TokenTtls,
        policy: AuthPolicy,
    ) -> Self {
        Self {
            accounts,
            tokens,
            sessions,
            oauth,
            email,
            ttls,
            policy,
        }
    }

    /// Authenticate with email and password and open a session.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
        client_meta: Option<String>,
    ) -> Result<LoginOutcome, AuthError> {
        let account = match self.accounts.find_by_email(email).await? {
            Some(account) => account,
            None => {
                tracing::debug!("login rejected: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if account.is_revoked() {
            tracing::warn!(account_id = %account.account_id, "login rejected: access revoked");
            return Err(AuthError::AccessRevoked);
        }

        let Some(stored_hash) = account.password_hash.as_deref() else {
            // OAuth-only account; password login can never succeed.
            tracing::debug!(account_id = %account.account_id, "login rejected: no password set");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(&Password::new(password), stored_hash)? {
            tracing::debug!(account_id = %account.account_id, "login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let issued = self
            .sessions
            .create(account.account_id, remember_me, client_meta)
            .await?;

        tracing::info!(account_id = %account.account_id, "login succeeded");

        Ok(LoginOutcome {
            account: account.summary(),
            session: issued.session,
            session_token: issued.token,
        })
    }

    /// Create an account. No session is opened; the caller logs in next.
    pub async fn register(&self, draft: RegisterDraft) -> Result<AccountSummary, AuthError> {
        if draft.password != draft.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }

        let hash = hash_password(&Password::new(draft.password))?;
        let account = self
            .accounts
            .create(Account::new(
                &draft.email,
                Some(hash),
                &draft.first_name,
                &draft.last_name,
            ))
            .await?;

        tracing::info!(account_id = %account.account_id, "account registered");

        if self.policy.verify_email_on_signup {
            // Verification mail is best-effort at registration; the account
            // already exists and the code can be re-requested.
            if let Err(e) = self.send_verification(&account).await {
                tracing::warn!(
                    account_id = %account.account_id,
                    error = %e,
                    "verification email not delivered at signup"
                );
            }
        }

        Ok(account.summary())
    }

    /// Close the session behind a token. Success-equivalent for unknown or
    /// already-revoked tokens: the response must not reveal validity.
    pub async fn logout(&self, session_token: &str) -> Result<(), AuthError> {
        self.sessions.revoke(session_token).await
    }

    /// Issue an email-verification code and dispatch it.
    pub async fn request_email_verification(&self, account_id: Uuid) -> Result<(), AuthError> {
        let account = self
            .accounts
            .find_by_id(account_id)
            .await?
            .ok_or(AuthError::Invalid)?;
        self.send_verification(&account).await
    }

    /// Consume a verification code and mark the account's email verified.
    pub async fn confirm_email_verification(
        &self,
        code: &str,
        email: &str,
    ) -> Result<(), AuthError> {
        let token = self
            .tokens
            .validate(code, TokenPurpose::EmailVerification)
            .await?;

        let account = self
            .accounts
            .find_by_email(email)
            .await?
            .ok_or(AuthError::Invalid)?;
        if account.account_id != token.account_id {
            tracing::warn!(
                account_id = %account.account_id,
                "verification code presented with mismatched email"
            );
            return Err(AuthError::Invalid);
        }

        self.tokens.consume(code).await?;
        self.accounts.mark_email_verified(account.account_id).await?;

        tracing::info!(account_id = %account.account_id, "email verified");
        Ok(())
    }

    /// Start a password reset. Acknowledges identically whether or not the
    /// email is registered.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let Some(account) = self.accounts.find_by_email(email).await? else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(());
        };

        let issued = self
            .tokens
            .issue(
                account.account_id,
                TokenPurpose::PasswordReset,
                self.ttls.password_reset,
            )
            .await?;

        // A delivery failure must not make the response distinguishable from
        // the unknown-email case.
        if let Err(e) = self
            .email
            .send_password_reset_email(&account.email, &issued.secret)
            .await
        {
            tracing::warn!(
                account_id = %account.account_id,
                error = %e,
                "password reset email not delivered"
            );
        }
        Ok(())
    }

    /// Finish a password reset: consume the token, store the new hash, and
    /// revoke every outstanding session of the account.
    pub async fn confirm_password_reset(
        &self,
        token: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), AuthError> {
        if new_password != confirm_password {
            return Err(AuthError::PasswordMismatch);
        }

        let record = self
            .tokens
            .validate(token, TokenPurpose::PasswordReset)
            .await?;
        self.tokens.consume(token).await?;

        let hash = hash_password(&Password::new(new_password))?;
        self.accounts
            .set_password_hash(record.account_id, &hash)
            .await?;
        self.sessions.revoke_all(record.account_id).await?;

        tracing::info!(account_id = %record.account_id, "password reset completed");
        Ok(())
    }

    /// Change the password of the authenticated account and revoke every
    /// other session, keeping the caller's one alive.
    pub async fn change_password(
        &self,
        session_token: &str,
        old_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), AuthError> {
        let session = self
            .sessions
            .validate(session_token)
            .await
            .map_err(|_| AuthError::Unauthenticated)?;

        let account = self
            .accounts
            .find_by_id(session.account_id)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        let Some(stored_hash) = account.password_hash.as_deref() else {
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(&Password::new(old_password), stored_hash)? {
            tracing::debug!(account_id = %account.account_id, "password change rejected: wrong old password");
            return Err(AuthError::InvalidCredentials);
        }

        if new_password != confirm_password {
            return Err(AuthError::PasswordMismatch);
        }

        let hash = hash_password(&Password::new(new_password))?;
        self.accounts
            .set_password_hash(account.account_id, &hash)
            .await?;
        self.sessions
            .revoke_all_except(account.account_id, &session.token_hash)
            .await?;

        tracing::info!(account_id = %account.account_id, "password changed");
        Ok(())
    }

    /// Enumerate the sessions of the authenticated account, newest first.
    pub async fn list_sessions(&self, session_token: &str) -> Result<Vec<SessionInfo>, AuthError> {
        let current = self
            .sessions
            .validate(session_token)
            .await
            .map_err(|_| AuthError::Unauthenticated)?;

        let sessions = self.sessions.list_by_account(current.account_id).await?;
        Ok(sessions
            .into_iter()
            .map(|s| {
                let is_current = s.session_id == current.session_id;
                let mut info = SessionInfo::from(s);
                info.is_current = is_current;
                info
            })
            .collect())
    }

    /// Begin an OAuth2 login: returns the provider redirect URL.
    pub async fn begin_oauth(&self, provider: &str) -> Result<String, AuthError> {
        self.oauth.build_authorization_url(provider).await
    }

    /// Complete an OAuth2 login and open a session for the resolved account.
    pub async fn complete_oauth(
        &self,
        provider: &str,
        code: &str,
        state: &str,
        client_meta: Option<String>,
    ) -> Result<LoginOutcome, AuthError> {
        let account = self.oauth.handle_callback(provider, code, state).await?;

        // A revoked account cannot produce new sessions through any path.
        if account.is_revoked() {
            tracing::warn!(account_id = %account.account_id, "oauth login rejected: access revoked");
            return Err(AuthError::AccessRevoked);
        }

        let issued = self
            .sessions
            .create(account.account_id, false, client_meta)
            .await?;

        tracing::info!(account_id = %account.account_id, provider, "oauth login succeeded");

        Ok(LoginOutcome {
            account: account.summary(),
            session: issued.session,
            session_token: issued.token,
        })
    }

    /// Revoke an account and invalidate all of its sessions.
    pub async fn revoke_account(&self, account_id: Uuid) -> Result<(), AuthError> {
        self.accounts
            .set_status(account_id, crate::models::AccountStatus::Revoked)
            .await?;
        self.sessions.revoke_all(account_id).await?;
        tracing::warn!(account_id = %account_id, "account access revoked");
        Ok(())
    }

    async fn send_verification(&self, account: &Account) -> Result<(), AuthError> {
        let issued = self
            .tokens
            .issue(
                account.account_id,
                TokenPurpose::EmailVerification,
                self.ttls.email_verification,
            )
            .await?;
        self.email
            .send_verification_email(&account.email, &issued.secret)
            .await
    }
}
