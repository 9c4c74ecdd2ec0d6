//! Per-message pipeline pass — resolve customer, complete, format, send,
//! record.
//!
//! Flow:
//! 1. Normalize + classify (intent, urgency)
//! 2. Resolve customer (create on first contact, load otherwise)
//! 3. Escalation decision
//! 4. Assemble prompt → LLM completion (fallback text on failure)
//! 5. Format reply → SMTP send
//! 6. Operator alert when escalated
//! 7. Record update (interactions + customer counters/scores/stage)
//!
//! A send failure fails the pass. A record-update failure after the send
//! does not — the pass reports the error instead of risking a re-send.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::ResponderConfig;
use crate::error::{DatabaseError, PipelineError};
use crate::llm::{CompletionRequest, LlmProvider};
use crate::mail::smtp::reply_subject;
use crate::mail::MailTransport;
use crate::pipeline::context::assemble_prompt;
use crate::pipeline::format::{FALLBACK_REPLY, format_escalation_alert, format_reply};
use crate::pipeline::types::{NormalizedMessage, PassOutcome};
use crate::store::model::Customer;
use crate::store::{Database, Direction, Interaction, StoredMessage};
use crate::triage::{IntentClassifier, scoring, should_escalate};

/// Recent interactions included in the prompt.
const HISTORY_LIMIT: usize = 3;

/// The pipeline pass runner.
pub struct Responder {
    db: Arc<dyn Database>,
    llm: Arc<dyn LlmProvider>,
    transport: Arc<dyn MailTransport>,
    classifier: IntentClassifier,
    config: ResponderConfig,
}

impl Responder {
    pub fn new(
        db: Arc<dyn Database>,
        llm: Arc<dyn LlmProvider>,
        transport: Arc<dyn MailTransport>,
        config: ResponderConfig,
    ) -> Self {
        Self {
            db,
            llm,
            transport,
            classifier: IntentClassifier::new(),
            config,
        }
    }

    /// Run one full pipeline pass over a staged message.
    pub async fn process(&self, stored: &StoredMessage) -> Result<PassOutcome, PipelineError> {
        let message = NormalizedMessage::from_stored(stored, &self.classifier);

        info!(
            id = %message.id,
            sender = %message.sender,
            intent = message.intent.as_str(),
            urgent = message.urgent,
            "Processing inbound message"
        );

        // Resolve: create on first contact, load otherwise.
        let (mut customer, created) = match self
            .db
            .get_customer_by_email(&message.sender)
            .await
            .map_err(PipelineError::Resolve)?
        {
            Some(existing) => (existing, false),
            None => {
                let fresh = Customer::new(&message.sender, message.sender_name.as_deref());
                self.db
                    .insert_customer(&fresh)
                    .await
                    .map_err(PipelineError::Resolve)?;
                info!(customer = %fresh.id, email = %fresh.email, "Customer created");
                (fresh, true)
            }
        };

        // Escalation uses the pre-update conversion probability.
        let escalated = should_escalate(
            message.urgent,
            message.intent,
            customer.conversion_probability,
            &message.body,
        );

        let history = if created {
            Vec::new()
        } else {
            self.db
                .list_interactions(customer.id, HISTORY_LIMIT)
                .await
                .unwrap_or_default()
        };

        // Completion, with the fixed fallback on unrecoverable failure.
        let payload = assemble_prompt(&customer, &message, &history, &self.config);
        let request = CompletionRequest::new(payload)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        let (generated, fallback_used) = match self.llm.complete(request).await {
            Ok(response) => (response.content, false),
            Err(e) => {
                warn!(id = %message.id, error = %e, "Completion failed, using fallback reply");
                (FALLBACK_REPLY.to_string(), true)
            }
        };

        let out_subject = reply_subject(&message.subject);
        let out_body = format_reply(&generated, &customer, &self.config);

        // A send failure fails the whole pass — nothing was delivered.
        self.transport
            .send(&message.sender, &out_subject, &out_body)
            .await
            .map_err(PipelineError::Send)?;

        if escalated {
            self.alert_operator(&customer, &message).await;
        }

        // Past this point the reply is out; record failures are reported,
        // not retried.
        let record_error = self
            .update_records(&mut customer, &message, &out_subject, &out_body, created)
            .await
            .err()
            .map(|e| e.to_string());

        if let Some(ref err) = record_error {
            warn!(id = %message.id, error = %err, "Record update failed after send");
        }

        Ok(PassOutcome {
            customer_id: customer.id,
            customer_created: created,
            intent: message.intent,
            urgent: message.urgent,
            escalated,
            fallback_used,
            record_error,
            processed_at: Utc::now(),
        })
    }

    /// Send the escalation alert. Best-effort — a failed alert never fails
    /// the pass.
    async fn alert_operator(&self, customer: &Customer, message: &NormalizedMessage) {
        let Some(ref operator) = self.config.operator_address else {
            info!(id = %message.id, "Escalated but no operator address configured");
            return;
        };

        let alert = format_escalation_alert(
            customer,
            &message.subject,
            &message.body,
            message.intent.as_str(),
            message.urgent,
        );
        let subject = format!("[Escalation] {}", message.subject);

        match self.transport.send(operator, &subject, &alert).await {
            Ok(()) => info!(id = %message.id, operator = %operator, "Escalation alert sent"),
            Err(e) => warn!(id = %message.id, error = %e, "Failed to send escalation alert"),
        }
    }

    /// Append both interaction rows and update the customer record.
    async fn update_records(
        &self,
        customer: &mut Customer,
        message: &NormalizedMessage,
        out_subject: &str,
        out_body: &str,
        created: bool,
    ) -> Result<(), DatabaseError> {
        let inbound = Interaction::new(
            customer.id,
            Direction::Inbound,
            &message.subject,
            &message.body,
            message.intent,
            Some(message.confidence),
        );
        self.db.insert_interaction(&inbound).await?;

        let outbound = Interaction::new(
            customer.id,
            Direction::Outbound,
            out_subject,
            out_body,
            message.intent,
            None,
        );
        self.db.insert_interaction(&outbound).await?;

        // One count per processed inbound message; last-contact only moves
        // forward.
        customer.interaction_count += 1;
        let now = Utc::now();
        if now > customer.last_contact {
            customer.last_contact = now;
        }
        customer.sentiment_score =
            scoring::adjust_sentiment(customer.sentiment_score, &message.body);
        customer.conversion_probability =
            scoring::adjust_conversion(customer.conversion_probability, message.intent);
        if !created {
            customer.stage = scoring::advance_stage(customer.stage, message.intent);
        }
        if customer.display_name.is_none() && message.sender_name.is_some() {
            customer.display_name = message.sender_name.clone();
        }

        self.db.update_customer(customer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use crate::error::{LlmError, MailError};
    use crate::llm::CompletionResponse;
    use crate::store::{LibSqlBackend, Stage};
    use crate::triage::Intent;

    /// Mock LLM that returns a fixed reply, or fails.
    struct MockLlm {
        response: Option<String>,
    }

    #[async_trait]
    impl LlmProvider for MockLlm {
        fn model_name(&self) -> &str {
            "mock"
        }

        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            match self.response {
                Some(ref text) => Ok(CompletionResponse {
                    content: text.clone(),
                    input_tokens: 100,
                    output_tokens: 50,
                    finish_reason: crate::llm::FinishReason::Stop,
                    response_id: None,
                }),
                None => Err(LlmError::AuthFailed {
                    provider: "mock".into(),
                }),
            }
        }
    }

    /// Mock transport that records sent mail, or refuses to send.
    struct MockTransport {
        sent: Mutex<Vec<(String, String, String)>>,
        fail: bool,
    }

    impl MockTransport {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn sent(&self) -> Vec<(String, String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MailTransport for MockTransport {
        async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
            if self.fail {
                return Err(MailError::SendFailed {
                    to: to.to_string(),
                    reason: "mock refuses".into(),
                });
            }
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), subject.to_string(), body.to_string()));
            Ok(())
        }
    }

    async fn staged(
        db: &LibSqlBackend,
        external_id: &str,
        sender: &str,
        subject: &str,
        body: &str,
    ) -> StoredMessage {
        db.insert_message(
            external_id,
            sender,
            Some("Alice Chen"),
            Some(subject),
            body,
            None,
            Utc::now(),
        )
        .await
        .unwrap();
        db.get_message_by_external_id(external_id)
            .await
            .unwrap()
            .unwrap()
    }

    fn responder(
        db: Arc<LibSqlBackend>,
        llm: MockLlm,
        transport: Arc<MockTransport>,
        operator: Option<&str>,
    ) -> Responder {
        let config = ResponderConfig {
            operator_address: operator.map(String::from),
            ..ResponderConfig::default()
        };
        Responder::new(db, Arc::new(llm), transport, config)
    }

    #[tokio::test]
    async fn first_contact_creates_customer_with_count_one() {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let transport = Arc::new(MockTransport::new());
        let r = responder(
            Arc::clone(&db),
            MockLlm { response: Some("Our enterprise plan starts at the Teams tier.".into()) },
            Arc::clone(&transport),
            None,
        );

        let msg = staged(
            &db,
            "<m1@mail>",
            "alice@example.com",
            "Pricing",
            "What is the price for your enterprise plan?",
        )
        .await;

        let outcome = r.process(&msg).await.unwrap();
        assert!(outcome.customer_created);
        assert_eq!(outcome.intent, Intent::PricingInquiry);
        assert!(!outcome.urgent);
        assert!(!outcome.fallback_used);
        assert!(outcome.record_error.is_none());

        let customer = db
            .get_customer_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(customer.stage, Stage::InitialInquiry);
        assert_eq!(customer.interaction_count, 1);

        // Inbound + outbound interaction rows
        let interactions = db.list_interactions(customer.id, 10).await.unwrap();
        assert_eq!(interactions.len(), 2);

        // Exactly one reply went out, to the customer
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "alice@example.com");
        assert_eq!(sent[0].1, "Re: Pricing");
        assert!(sent[0].2.starts_with("Hi Alice,"));
        assert!(sent[0].2.contains("Teams tier"));
    }

    #[tokio::test]
    async fn repeat_contact_increments_count_and_advances() {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let transport = Arc::new(MockTransport::new());
        let r = responder(
            Arc::clone(&db),
            MockLlm { response: Some("Sure, here's more detail.".into()) },
            Arc::clone(&transport),
            None,
        );

        let first = staged(&db, "<m1@mail>", "bob@example.com", "Hello", "Tell me more about your features.").await;
        r.process(&first).await.unwrap();

        let before = db
            .get_customer_by_email("bob@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(before.interaction_count, 1);
        let last_contact_before = before.last_contact;

        let second = staged(&db, "<m2@mail>", "bob@example.com", "Again", "What does the pro plan cost?").await;
        let outcome = r.process(&second).await.unwrap();
        assert!(!outcome.customer_created);

        let after = db
            .get_customer_by_email("bob@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.interaction_count, 2);
        assert!(after.last_contact >= last_contact_before);
        // initial_inquiry advanced on the repeat pass
        assert_eq!(after.stage, Stage::InformationGathering);
    }

    #[tokio::test]
    async fn escalated_pass_alerts_operator() {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let transport = Arc::new(MockTransport::new());
        let r = responder(
            Arc::clone(&db),
            MockLlm { response: Some("Sorry about that — looking into it.".into()) },
            Arc::clone(&transport),
            Some("ops@example.com"),
        );

        let msg = staged(
            &db,
            "<m1@mail>",
            "carol@example.com",
            "URGENT",
            "URGENT: system is down, need a manager",
        )
        .await;

        let outcome = r.process(&msg).await.unwrap();
        assert!(outcome.urgent);
        assert!(outcome.escalated);

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        // Reply to the customer first, then the alert
        assert_eq!(sent[0].0, "carol@example.com");
        assert_eq!(sent[1].0, "ops@example.com");
        assert!(sent[1].1.starts_with("[Escalation]"));
        assert!(sent[1].2.contains("support_request"));
    }

    #[tokio::test]
    async fn escalation_without_operator_still_replies() {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let transport = Arc::new(MockTransport::new());
        let r = responder(
            Arc::clone(&db),
            MockLlm { response: Some("On it.".into()) },
            Arc::clone(&transport),
            None,
        );

        let msg = staged(&db, "<m1@mail>", "dave@example.com", "Help", "This is urgent!").await;
        let outcome = r.process(&msg).await.unwrap();
        assert!(outcome.escalated);
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn completion_failure_falls_back_and_still_records() {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let transport = Arc::new(MockTransport::new());
        let r = responder(
            Arc::clone(&db),
            MockLlm { response: None },
            Arc::clone(&transport),
            None,
        );

        let msg = staged(&db, "<m1@mail>", "erin@example.com", "Hi", "Quick question about docs").await;
        let outcome = r.process(&msg).await.unwrap();
        assert!(outcome.fallback_used);

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].2.contains(FALLBACK_REPLY));

        // Record update still happened
        let customer = db
            .get_customer_by_email("erin@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(customer.interaction_count, 1);
    }

    #[tokio::test]
    async fn send_failure_fails_pass_without_records() {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let transport = Arc::new(MockTransport::failing());
        let r = responder(
            Arc::clone(&db),
            MockLlm { response: Some("reply".into()) },
            Arc::clone(&transport),
            None,
        );

        let msg = staged(&db, "<m1@mail>", "frank@example.com", "Hi", "hello there").await;
        let result = r.process(&msg).await;
        assert!(matches!(result, Err(PipelineError::Send(_))));

        // Customer was created during resolution, but no interactions or
        // count updates happened.
        let customer = db
            .get_customer_by_email("frank@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(customer.interaction_count, 0);
        assert!(db.list_interactions(customer.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn display_name_backfilled_from_later_message() {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        // Customer exists without a display name
        let customer = Customer::new("grace@example.com", None);
        db.insert_customer(&customer).await.unwrap();

        let transport = Arc::new(MockTransport::new());
        let r = responder(
            Arc::clone(&db),
            MockLlm { response: Some("Hello!".into()) },
            Arc::clone(&transport),
            None,
        );

        let msg = staged(&db, "<m1@mail>", "grace@example.com", "Hi", "checking in").await;
        r.process(&msg).await.unwrap();

        let loaded = db
            .get_customer_by_email("grace@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.display_name.as_deref(), Some("Alice Chen"));
    }
}
