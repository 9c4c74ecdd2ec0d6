//! Outbound mail — `MailTransport` trait with a lettre SMTP implementation.

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;

use crate::config::MailConfig;
use crate::error::MailError;

/// Transport abstraction — pure I/O, no formatting logic.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Send a plain-text email.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// SMTP sender backed by lettre.
pub struct SmtpMailer {
    config: MailConfig,
}

impl SmtpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    /// Build and send the message. Blocking — run in `spawn_blocking`.
    fn send_blocking(config: &MailConfig, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let creds = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let transport = SmtpTransport::relay(&config.smtp_host)
            .map_err(|e| MailError::SendFailed {
                to: to.to_string(),
                reason: format!("SMTP relay error: {e}"),
            })?
            .port(config.smtp_port)
            .credentials(creds)
            .build();

        let email = Message::builder()
            .from(config.from_address.parse().map_err(|e| {
                MailError::InvalidAddress {
                    address: config.from_address.clone(),
                    reason: format!("{e}"),
                }
            })?)
            .to(to.parse().map_err(|e| MailError::InvalidAddress {
                address: to.to_string(),
                reason: format!("{e}"),
            })?)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| MailError::SendFailed {
                to: to.to_string(),
                reason: format!("Failed to build email: {e}"),
            })?;

        transport.send(&email).map_err(|e| MailError::SendFailed {
            to: to.to_string(),
            reason: format!("SMTP send failed: {e}"),
        })?;

        tracing::info!(to, subject, "Email sent");
        Ok(())
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let config = self.config.clone();
        let to = to.to_string();
        let subject = subject.to_string();
        let body = body.to_string();

        tokio::task::spawn_blocking(move || Self::send_blocking(&config, &to, &subject, &body))
            .await
            .map_err(|e| MailError::SendFailed {
                to: "unknown".into(),
                reason: format!("send task panicked: {e}"),
            })?
    }
}

/// Reply subject: prefix with "Re: " unless already present.
pub fn reply_subject(subject: &str) -> String {
    let trimmed = subject.trim();
    if trimmed.to_lowercase().starts_with("re:") {
        trimmed.to_string()
    } else if trimmed.is_empty() {
        "Re: your message".to_string()
    } else {
        format!("Re: {trimmed}")
    }
}
