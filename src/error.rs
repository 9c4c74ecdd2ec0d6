//! Error types for replydesk.

use std::time::Duration;

/// Top-level error type for the responder.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Mailbox and transport errors.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("IMAP connection to {host} failed: {reason}")]
    ImapConnect { host: String, reason: String },

    #[error("IMAP protocol error: {0}")]
    ImapProtocol(String),

    #[error("IMAP login failed for {username}")]
    ImapAuth { username: String },

    #[error("Failed to send mail to {to}: {reason}")]
    SendFailed { to: String, reason: String },

    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to parse message: {0}")]
    Parse(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Empty completion from {provider}")]
    EmptyCompletion { provider: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Whether the call is worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::RequestFailed { .. })
    }
}

/// Pipeline-related errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Normalization failed: {0}")]
    Normalize(String),

    #[error("Customer resolution failed: {0}")]
    Resolve(#[from] DatabaseError),

    #[error("Reply send failed: {0}")]
    Send(#[from] MailError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Result type alias for the responder.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_is_retryable() {
        let err = LlmError::RateLimited {
            provider: "anthropic".into(),
            retry_after: Some(Duration::from_secs(5)),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn auth_failure_is_not_retryable() {
        let err = LlmError::AuthFailed {
            provider: "anthropic".into(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn errors_aggregate_into_top_level() {
        let err: Error = DatabaseError::Query("boom".into()).into();
        assert!(matches!(err, Error::Database(_)));
        let err: Error = PipelineError::Normalize("empty body".into()).into();
        assert!(matches!(err, Error::Pipeline(_)));
    }
}
