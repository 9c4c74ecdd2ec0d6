//! Response formatting — greeting, stage call-to-action, signature block.

use crate::config::ResponderConfig;
use crate::store::model::{Customer, Stage};

/// Fixed reply used when the completion service fails after retries.
pub const FALLBACK_REPLY: &str = "Thanks for reaching out. A member of our team has received \
     your message and will get back to you shortly.";

/// Call-to-action appended per funnel stage.
pub fn stage_call_to_action(stage: Stage) -> &'static str {
    match stage {
        Stage::InitialInquiry => {
            "Is there anything specific you'd like to know to get started?"
        }
        Stage::InformationGathering => {
            "Happy to share more detail on anything above — just reply with your questions."
        }
        Stage::ProductMatching => {
            "If you'd like, I can set up a short call to find the plan that fits best."
        }
        Stage::ObjectionHandling => {
            "If anything is holding you back, let me know and I'll address it directly."
        }
        Stage::Closing => {
            "Whenever you're ready, I can send over the signup link to get you going."
        }
        Stage::Customer => "As always, just reply here if you need anything.",
        Stage::Churned => "If you'd ever like to give us another try, we'd love to have you back.",
    }
}

/// Wrap generated text with greeting, call-to-action, and signature.
pub fn format_reply(generated: &str, customer: &Customer, config: &ResponderConfig) -> String {
    format!(
        "Hi {},\n\n{}\n\n{}\n\nBest regards,\n{}\n{}",
        customer.first_name(),
        generated.trim(),
        stage_call_to_action(customer.stage),
        config.agent_name,
        config.company_name,
    )
}

/// Body of the alert email sent to the operator on escalation.
pub fn format_escalation_alert(
    customer: &Customer,
    subject: &str,
    body: &str,
    intent: &str,
    urgent: bool,
) -> String {
    let mut alert = String::with_capacity(256);
    alert.push_str("A customer message was escalated for human follow-up.\n\n");
    alert.push_str(&format!("From: {}\n", customer.email));
    if let Some(ref name) = customer.display_name {
        alert.push_str(&format!("Name: {}\n", name));
    }
    alert.push_str(&format!("Stage: {}\n", customer.stage.as_str()));
    alert.push_str(&format!("Intent: {}\n", intent));
    alert.push_str(&format!("Urgent: {}\n", if urgent { "yes" } else { "no" }));
    alert.push_str(&format!("Subject: {}\n\n", subject));

    let preview: String = body.chars().take(1000).collect();
    alert.push_str(&preview);
    alert
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_has_greeting_cta_signature() {
        let customer = Customer::new("alice@example.com", Some("Alice Chen"));
        let config = ResponderConfig::default();
        let reply = format_reply("Our pro plan covers that.", &customer, &config);

        assert!(reply.starts_with("Hi Alice,"));
        assert!(reply.contains("Our pro plan covers that."));
        assert!(reply.contains(stage_call_to_action(Stage::InitialInquiry)));
        assert!(reply.contains("Best regards,"));
        assert!(reply.contains(&config.agent_name));
        assert!(reply.contains(&config.company_name));
    }

    #[test]
    fn reply_cta_tracks_stage() {
        let mut customer = Customer::new("bob@example.com", None);
        customer.stage = Stage::Closing;
        let config = ResponderConfig::default();
        let reply = format_reply("Here are the next steps.", &customer, &config);
        assert!(reply.contains("signup link"));
    }

    #[test]
    fn reply_trims_generated_text() {
        let customer = Customer::new("bob@example.com", None);
        let config = ResponderConfig::default();
        let reply = format_reply("  spaced out  \n", &customer, &config);
        assert!(reply.contains("Hi bob,\n\nspaced out\n\n"));
    }

    #[test]
    fn every_stage_has_a_cta() {
        for stage in [
            Stage::InitialInquiry,
            Stage::InformationGathering,
            Stage::ProductMatching,
            Stage::ObjectionHandling,
            Stage::Closing,
            Stage::Customer,
            Stage::Churned,
        ] {
            assert!(!stage_call_to_action(stage).is_empty());
        }
    }

    #[test]
    fn escalation_alert_includes_context() {
        let mut customer = Customer::new("carol@example.com", Some("Carol"));
        customer.stage = Stage::ProductMatching;
        let alert = format_escalation_alert(
            &customer,
            "URGENT: broken",
            "The export feature crashes every time.",
            "support_request",
            true,
        );
        assert!(alert.contains("carol@example.com"));
        assert!(alert.contains("Carol"));
        assert!(alert.contains("product_matching"));
        assert!(alert.contains("support_request"));
        assert!(alert.contains("Urgent: yes"));
        assert!(alert.contains("export feature crashes"));
    }

    #[test]
    fn escalation_alert_truncates_body() {
        let customer = Customer::new("dave@example.com", None);
        let long = "y".repeat(3000);
        let alert = format_escalation_alert(&customer, "s", &long, "general_inquiry", false);
        assert!(alert.len() < 1500);
    }
}
