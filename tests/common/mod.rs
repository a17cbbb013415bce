//! Shared fixtures: an in-memory service graph with a recording mailer and a
//! scripted identity provider in place of the real collaborators.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use chrono::Duration;

use auth_core::models::RegisterDraft;
use auth_core::services::{MemoryStateStore, SessionManager, TokenLedger};
use auth_core::{
    AuthError, AuthPolicy, AuthService, EmailProvider, IdentityProvider, LinkPolicy, MemoryStore,
    OAuth2Bridge, ProviderIdentity, TokenTtls,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailKind {
    Verification,
    PasswordReset,
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub secret: String,
    pub kind: MailKind,
}

/// Captures outbound mail so tests can read the issued secrets.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn last(&self) -> SentMail {
        self.sent
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no mail was sent")
    }

    fn record(&self, to: &str, secret: &str, kind: MailKind) -> Result<(), AuthError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuthError::Delivery("smtp unavailable".into()));
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            secret: secret.to_string(),
            kind,
        });
        Ok(())
    }
}

#[async_trait]
impl EmailProvider for RecordingMailer {
    async fn send_verification_email(&self, to_email: &str, code: &str) -> Result<(), AuthError> {
        self.record(to_email, code, MailKind::Verification)
    }

    async fn send_password_reset_email(
        &self,
        to_email: &str,
        token: &str,
    ) -> Result<(), AuthError> {
        self.record(to_email, token, MailKind::PasswordReset)
    }
}

/// Scripted identity provider: tests register authorization codes and the
/// identities they exchange into.
pub struct FakeProvider {
    codes: Mutex<HashMap<String, ProviderIdentity>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            codes: Mutex::new(HashMap::new()),
        }
    }

    pub fn grant(&self, code: &str, identity: ProviderIdentity) {
        self.codes
            .lock()
            .unwrap()
            .insert(code.to_string(), identity);
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn authorization_url(&self, state: &str) -> String {
        format!("https://accounts.fake.test/o/oauth2/auth?state={state}")
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderIdentity, AuthError> {
        self.codes
            .lock()
            .unwrap()
            .get(code)
            .cloned()
            .ok_or_else(|| AuthError::Provider("authorization code not recognized".into()))
    }
}

pub fn identity(provider_user_id: &str, email: &str, email_verified: bool) -> ProviderIdentity {
    ProviderIdentity {
        provider_user_id: provider_user_id.to_string(),
        email: email.to_string(),
        email_verified,
        given_name: Some("Pat".into()),
        family_name: Some("Doe".into()),
    }
}

pub struct TestHarness {
    pub auth: AuthService,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub provider: Arc<FakeProvider>,
    pub sessions: SessionManager,
    pub tokens: TokenLedger,
}

pub fn harness() -> TestHarness {
    harness_with(
        LinkPolicy::LinkByVerifiedEmail,
        AuthPolicy {
            verify_email_on_signup: true,
        },
    )
}

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn harness_with(link_policy: LinkPolicy, policy: AuthPolicy) -> TestHarness {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::default());
    let provider = Arc::new(FakeProvider::new());

    let tokens = TokenLedger::new(store.clone());
    let sessions = SessionManager::new(store.clone(), Duration::hours(12), Duration::days(14));
    let oauth = OAuth2Bridge::new(
        vec![provider.clone() as Arc<dyn IdentityProvider>],
        Arc::new(MemoryStateStore::new()),
        store.clone(),
        store.clone(),
        link_policy,
        300,
    );
    let auth = AuthService::new(
        store.clone(),
        tokens.clone(),
        sessions.clone(),
        oauth,
        mailer.clone(),
        TokenTtls::default(),
        policy,
    );

    TestHarness {
        auth,
        store,
        mailer,
        provider,
        sessions,
        tokens,
    }
}

pub fn draft(email: &str, password: &str) -> RegisterDraft {
    RegisterDraft {
        first_name: "Pat".into(),
        last_name: "Doe".into(),
        email: email.into(),
        password: password.into(),
        confirm_password: password.into(),
    }
}

/// Pull the `state` query parameter out of an authorization URL.
pub fn state_from_url(url: &str) -> String {
    url.split("state=")
        .nth(1)
        .expect("authorization url carries no state")
        .split('&')
        .next()
        .unwrap()
        .to_string()
}
