//! OAuth2 authorization-code mediation.
//!
//! Per attempt: `Initiated -> RedirectedToProvider -> CallbackReceived ->
//! {Linked | AccountCreated | Failed}`. The bridge owns the anti-forgery
//! state (stored with a TTL in a [`StateStore`]) and the mapping from a
//! provider identity to a local account; the actual token/profile HTTP
//! exchange sits behind [`IdentityProvider`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::GoogleOAuthConfig;
use crate::error::AuthError;
use crate::models::{Account, OAuthIdentity};
use crate::services::StateStore;
use crate::stores::{CredentialStore, OAuthIdentityStore};
use crate::utils::secret::generate_secret;

/// What a provider tells us about the authenticated user.
#[derive(Debug, Clone)]
pub struct ProviderIdentity {
    pub provider_user_id: String,
    pub email: String,
    pub email_verified: bool,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Authorization URL for the redirect, carrying our `state`.
    fn authorization_url(&self, state: &str) -> String;

    /// Exchange an authorization code for the provider identity.
    async fn exchange_code(&self, code: &str) -> Result<ProviderIdentity, AuthError>;
}

/// What to do when a provider identity has no existing link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPolicy {
    /// Always create a fresh account.
    CreateOnly,
    /// Link to an existing account matched by verified provider email;
    /// create otherwise.
    LinkByVerifiedEmail,
}

#[derive(Clone)]
pub struct OAuth2Bridge {
    providers: Vec<Arc<dyn IdentityProvider>>,
    states: Arc<dyn StateStore>,
    accounts: Arc<dyn CredentialStore>,
    identities: Arc<dyn OAuthIdentityStore>,
    link_policy: LinkPolicy,
    state_ttl_seconds: i64,
}

impl OAuth2Bridge {
    pub fn new(
        providers: Vec<Arc<dyn IdentityProvider>>,
        states: Arc<dyn StateStore>,
        accounts: Arc<dyn CredentialStore>,
        identities: Arc<dyn OAuthIdentityStore>,
        link_policy: LinkPolicy,
        state_ttl_seconds: i64,
    ) -> Self {
        Self {
            providers,
            states,
            accounts,
            identities,
            link_policy,
            state_ttl_seconds,
        }
    }

    fn provider(&self, name: &str) -> Result<&Arc<dyn IdentityProvider>, AuthError> {
        self.providers
            .iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| AuthError::Provider(format!("unknown provider: {name}")))
    }

    /// Start an attempt: generate the anti-forgery state, record the pending
    /// attempt with a TTL, and return the provider redirect URL.
    pub async fn build_authorization_url(&self, provider: &str) -> Result<String, AuthError> {
        let provider = self.provider(provider)?;
        let state = generate_secret();
        self.states
            .put(&state_key(&state), provider.name(), self.state_ttl_seconds)
            .await?;
        Ok(provider.authorization_url(&state))
    }

    /// Finish an attempt: check the state against the pending attempt,
    /// exchange the code, then resolve the provider identity to an account.
    pub async fn handle_callback(
        &self,
        provider: &str,
        code: &str,
        state: &str,
    ) -> Result<Account, AuthError> {
        let provider = self.provider(provider)?;

        // Take-and-compare: the state is single-use and bound to the
        // provider it was issued for.
        match self.states.take(&state_key(state)).await? {
            Some(pending) if pending == provider.name() => {}
            _ => {
                tracing::warn!(provider = provider.name(), "oauth state mismatch");
                return Err(AuthError::StateMismatch);
            }
        }

        let identity = provider.exchange_code(code).await?;

        if let Some(link) = self
            .identities
            .find(provider.name(), &identity.provider_user_id)
            .await?
        {
            return self
                .accounts
                .find_by_id(link.account_id)
                .await?
                .ok_or_else(|| {
                    AuthError::Storage(anyhow::anyhow!(
                        "identity links to missing account {}",
                        link.account_id
                    ))
                });
        }

        if self.link_policy == LinkPolicy::LinkByVerifiedEmail && identity.email_verified {
            if let Some(existing) = self.accounts.find_by_email(&identity.email).await? {
                self.identities
                    .link(OAuthIdentity::new(
                        provider.name(),
                        &identity.provider_user_id,
                        existing.account_id,
                    ))
                    .await?;
                tracing::info!(
                    account_id = %existing.account_id,
                    provider = provider.name(),
                    "linked provider identity to existing account"
                );
                return Ok(existing);
            }
        }

        // First login for this identity: create an account with no password.
        let mut account = Account::new(
            &identity.email,
            None,
            identity.given_name.as_deref().unwrap_or_default(),
            identity.family_name.as_deref().unwrap_or_default(),
        );
        account.email_verified = identity.email_verified;

        let account = self.accounts.create(account).await?;
        self.identities
            .link(OAuthIdentity::new(
                provider.name(),
                &identity.provider_user_id,
                account.account_id,
            ))
            .await?;

        tracing::info!(
            account_id = %account.account_id,
            provider = provider.name(),
            "created account from provider identity"
        );
        Ok(account)
    }
}

fn state_key(state: &str) -> String {
    format!("oauth:state:{state}")
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    email: String,
    verified_email: bool,
    given_name: Option<String>,
    family_name: Option<String>,
}

/// Google as an [`IdentityProvider`] over its token and userinfo endpoints.
pub struct GoogleProvider {
    http: reqwest::Client,
    config: GoogleOAuthConfig,
}

impl GoogleProvider {
    pub fn new(config: &GoogleOAuthConfig, timeout: Duration) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Internal(e.into()))?;
        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    fn map_http_error(err: reqwest::Error, what: &str) -> AuthError {
        if err.is_timeout() {
            tracing::error!(what, "provider call timed out");
            return AuthError::Timeout;
        }
        tracing::error!(what, error = %err, "provider call failed");
        AuthError::Provider(format!("{what} failed"))
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope=openid%20email%20profile&state={}",
            self.config.auth_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            state
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderIdentity, AuthError> {
        let token_res = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Self::map_http_error(e, "code exchange"))?;

        if !token_res.status().is_success() {
            let status = token_res.status();
            tracing::error!(status = %status, "provider rejected code exchange");
            return Err(AuthError::Provider(format!(
                "code exchange rejected with {status}"
            )));
        }

        let token_data: GoogleTokenResponse = token_res
            .json()
            .await
            .map_err(|e| Self::map_http_error(e, "token response parse"))?;

        let user_info: GoogleUserInfo = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(token_data.access_token)
            .send()
            .await
            .map_err(|e| Self::map_http_error(e, "userinfo fetch"))?
            .json()
            .await
            .map_err(|e| Self::map_http_error(e, "userinfo parse"))?;

        Ok(ProviderIdentity {
            provider_user_id: user_info.id,
            email: user_info.email,
            email_verified: user_info.verified_email,
            given_name: user_info.given_name,
            family_name: user_info.family_name,
        })
    }
}
