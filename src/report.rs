//! Failure sink — forwards pipeline failures to an external logging
//! endpoint. Fire-and-forget: a sink outage only costs a warning.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};

/// JSON payload POSTed to the sink.
#[derive(Debug, Serialize)]
struct FailureReport<'a> {
    service: &'static str,
    stage: &'a str,
    message_id: &'a str,
    error: &'a str,
    at: String,
}

/// Forwards failure reports to an optional HTTP endpoint.
pub struct FailureReporter {
    client: reqwest::Client,
    url: Option<String>,
}

impl FailureReporter {
    pub fn new(url: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self { client, url }
    }

    /// Disabled reporter (no endpoint configured).
    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// POST one failure report. No-op when no endpoint is configured.
    pub async fn report(&self, stage: &str, message_id: &str, error: &str) {
        let Some(ref url) = self.url else {
            return;
        };

        let payload = FailureReport {
            service: "replydesk",
            stage,
            message_id,
            error,
            at: Utc::now().to_rfc3339(),
        };

        match self.client.post(url).json(&payload).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!(stage, message_id, "Failure report forwarded");
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "Failure sink rejected report");
            }
            Err(e) => {
                warn!(error = %e, "Failed to reach failure sink");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_reporter_is_a_noop() {
        let reporter = FailureReporter::disabled();
        // Must not panic or block
        reporter.report("pipeline", "msg-1", "boom").await;
    }

    #[tokio::test]
    async fn unreachable_sink_only_warns() {
        let reporter = FailureReporter::new(Some("http://127.0.0.1:1/unreachable".into()));
        reporter.report("pipeline", "msg-1", "boom").await;
    }
}
