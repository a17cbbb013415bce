//! Outbound notification collaborator.
//!
//! The core only knows the [`EmailProvider`] trait; delivery failures come
//! back as [`AuthError::Delivery`] and never change account state.

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use std::time::Duration;

use crate::config::SmtpConfig;
use crate::error::AuthError;

#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Deliver an email-verification code to `to_email`.
    async fn send_verification_email(&self, to_email: &str, code: &str) -> Result<(), AuthError>;

    /// Deliver a password-reset token to `to_email`.
    async fn send_password_reset_email(&self, to_email: &str, token: &str)
        -> Result<(), AuthError>;
}

/// SMTP-backed provider.
#[derive(Clone)]
pub struct SmtpEmailService {
    mailer: SmtpTransport,
    from_email: String,
    base_url: String,
}

impl SmtpEmailService {
    pub fn new(config: &SmtpConfig) -> Result<Self, AuthError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| AuthError::Internal(anyhow::anyhow!(e.to_string())))?
            .credentials(creds)
            .port(587)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "email service initialized");

        Ok(Self {
            mailer,
            from_email: config.user.clone(),
            base_url: config.public_base_url.clone(),
        })
    }

    async fn send(&self, to_email: &str, subject: &str, body: String) -> Result<(), AuthError> {
        let email = Message::builder()
            .from(self.from_email.parse().map_err(
                |e: lettre::address::AddressError| AuthError::Internal(e.into()),
            )?)
            .to(to_email.parse().map_err(
                |e: lettre::address::AddressError| AuthError::Delivery(e.to_string()),
            )?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| AuthError::Internal(e.into()))?;

        // SmtpTransport is blocking; keep it off the async runtime.
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AuthError::Internal(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, subject = %subject, "email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(to = %to_email, error = %e, "failed to send email");
                Err(AuthError::Delivery(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl EmailProvider for SmtpEmailService {
    async fn send_verification_email(&self, to_email: &str, code: &str) -> Result<(), AuthError> {
        let link = format!("{}/auth/email-verification/{}", self.base_url, code);
        let body = format!(
            "Welcome! Please verify your email address by visiting:\n\n{link}\n\n\
             This link expires in 24 hours. If you didn't register, ignore this email.",
        );
        self.send(to_email, "Verify your email address", body).await
    }

    async fn send_password_reset_email(
        &self,
        to_email: &str,
        token: &str,
    ) -> Result<(), AuthError> {
        let link = format!("{}/auth/reset-password/{}", self.base_url, token);
        let body = format!(
            "We received a request to reset your password. Set a new one here:\n\n{link}\n\n\
             This link expires in 1 hour. If you didn't request this, ignore this email.",
        );
        self.send(to_email, "Reset your password", body).await
    }
}

/// No-op provider for environments without SMTP.
#[derive(Clone, Default)]
pub struct MockEmailService;

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send_verification_email(&self, _to_email: &str, _code: &str) -> Result<(), AuthError> {
        Ok(())
    }

    async fn send_password_reset_email(
        &self,
        _to_email: &str,
        _token: &str,
    ) -> Result<(), AuthError> {
        Ok(())
    }
}
