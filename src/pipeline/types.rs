//! Shared types for the message processing pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::StoredMessage;
use crate::triage::{Intent, IntentClassifier, is_urgent};

/// Normalized representation of one inbound email.
///
/// Transient — exists only for the duration of one pipeline pass. Built
/// from a staged message plus classification results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedMessage {
    /// Staging row id.
    pub id: String,
    /// Message-ID header.
    pub external_id: String,
    pub sender: String,
    pub sender_name: Option<String>,
    pub subject: String,
    pub body: String,
    /// Thread correlation value, when the mail carried one.
    pub thread_id: Option<String>,
    pub intent: Intent,
    /// Classifier confidence for the intent label.
    pub confidence: f32,
    pub urgent: bool,
    pub received_at: DateTime<Utc>,
}

impl NormalizedMessage {
    /// Normalize a staged message: pull out fields, classify intent and
    /// urgency.
    pub fn from_stored(stored: &StoredMessage, classifier: &IntentClassifier) -> Self {
        let subject = stored.subject.clone().unwrap_or_default();
        let (intent, confidence) = classifier.classify(&stored.content);
        let urgent = is_urgent(&subject, &stored.content);

        Self {
            id: stored.id.clone(),
            external_id: stored.external_id.clone(),
            sender: stored.sender.clone(),
            sender_name: stored.sender_name.clone(),
            subject,
            body: stored.content.clone(),
            thread_id: stored.thread_id.clone(),
            intent,
            confidence,
            urgent,
            received_at: stored.received_at,
        }
    }
}

/// Result of one pipeline pass.
#[derive(Debug, Clone)]
pub struct PassOutcome {
    /// The customer the message resolved to.
    pub customer_id: Uuid,
    /// True when the pass created the customer record.
    pub customer_created: bool,
    pub intent: Intent,
    pub urgent: bool,
    pub escalated: bool,
    /// True when the reply used the fixed fallback text instead of a
    /// completion.
    pub fallback_used: bool,
    /// Set when the reply went out but the record update failed.
    pub record_error: Option<String>,
    pub processed_at: DateTime<Utc>,
}
