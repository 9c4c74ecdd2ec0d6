//! Configuration types, built from environment variables.

use secrecy::SecretString;

/// Mailbox configuration — IMAP inbound, SMTP outbound.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub imap_host: String,
    pub imap_port: u16,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
    pub poll_interval_secs: u64,
    pub allowed_senders: Vec<String>,
}

impl MailConfig {
    /// Build config from environment variables.
    /// Returns `None` if `EMAIL_IMAP_HOST` is not set (mailbox disabled).
    pub fn from_env() -> Option<Self> {
        let imap_host = std::env::var("EMAIL_IMAP_HOST").ok()?;

        let imap_port: u16 = std::env::var("EMAIL_IMAP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(993);

        let smtp_host =
            std::env::var("EMAIL_SMTP_HOST").unwrap_or_else(|_| imap_host.replace("imap", "smtp"));

        let smtp_port: u16 = std::env::var("EMAIL_SMTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(587);

        let username = std::env::var("EMAIL_USERNAME").unwrap_or_default();
        let password = SecretString::from(std::env::var("EMAIL_PASSWORD").unwrap_or_default());
        let from_address = std::env::var("EMAIL_FROM_ADDRESS").unwrap_or_else(|_| username.clone());

        let poll_interval_secs: u64 = std::env::var("EMAIL_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);

        let allowed_senders: Vec<String> = std::env::var("EMAIL_ALLOWED_SENDERS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Some(Self {
            imap_host,
            imap_port,
            smtp_host,
            smtp_port,
            username,
            password,
            from_address,
            poll_interval_secs,
            allowed_senders,
        })
    }
}

/// Responder configuration — pipeline knobs and sender persona.
#[derive(Debug, Clone)]
pub struct ResponderConfig {
    /// How often the processor loop drains pending messages.
    pub process_interval_secs: u64,
    /// Where escalation alerts go. `None` disables operator alerts.
    pub operator_address: Option<String>,
    /// Optional HTTP endpoint that receives pipeline failure reports.
    pub failure_sink_url: Option<String>,
    /// Name used in greetings and the signature block.
    pub agent_name: String,
    /// Company name used in the signature block.
    pub company_name: String,
    /// Sampling temperature for reply generation.
    pub temperature: f64,
    /// Max tokens per reply completion.
    pub max_tokens: u64,
}

impl ResponderConfig {
    pub fn from_env() -> Self {
        let process_interval_secs = std::env::var("REPLYDESK_PROCESS_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(120);

        let operator_address = std::env::var("REPLYDESK_OPERATOR_ADDRESS")
            .ok()
            .filter(|s| !s.is_empty());

        let failure_sink_url = std::env::var("REPLYDESK_FAILURE_SINK_URL")
            .ok()
            .filter(|s| !s.is_empty());

        let agent_name =
            std::env::var("REPLYDESK_AGENT_NAME").unwrap_or_else(|_| "Support Team".to_string());

        let company_name =
            std::env::var("REPLYDESK_COMPANY_NAME").unwrap_or_else(|_| "Replydesk".to_string());

        let temperature = std::env::var("REPLYDESK_TEMPERATURE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.7);

        let max_tokens = std::env::var("REPLYDESK_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(600);

        Self {
            process_interval_secs,
            operator_address,
            failure_sink_url,
            agent_name,
            company_name,
            temperature,
            max_tokens,
        }
    }
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            process_interval_secs: 120,
            operator_address: None,
            failure_sink_url: None,
            agent_name: "Support Team".to_string(),
            company_name: "Replydesk".to_string(),
            temperature: 0.7,
            max_tokens: 600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mail_config_none_without_imap_host() {
        // SAFETY: test runs in isolation; no other thread reads EMAIL_IMAP_HOST concurrently.
        unsafe { std::env::remove_var("EMAIL_IMAP_HOST") };
        assert!(MailConfig::from_env().is_none());
    }

    #[test]
    fn responder_config_defaults() {
        let cfg = ResponderConfig::default();
        assert_eq!(cfg.process_interval_secs, 120);
        assert!(cfg.operator_address.is_none());
        assert!(cfg.failure_sink_url.is_none());
        assert_eq!(cfg.max_tokens, 600);
    }
}
