//! Escalation decision — purely combinational, no state retained.

use crate::triage::Intent;

/// Conversion probability above which a purchase intent goes to a human.
const HOT_LEAD_THRESHOLD: f32 = 0.7;

/// Phrases that explicitly ask for a human.
const HUMAN_REQUEST_PHRASES: &[&str] = &[
    "speak to a human",
    "talk to a human",
    "speak to a person",
    "talk to a person",
    "real person",
    "speak to someone",
    "talk to someone",
    "manager",
    "supervisor",
];

/// Decide whether a pass should alert a human operator.
///
/// True if urgent, or a support request, or an explicit human request,
/// or a hot lead (conversion probability above threshold) showing
/// purchase intent. Urgency alone is always sufficient.
pub fn should_escalate(
    urgent: bool,
    intent: Intent,
    conversion_probability: f32,
    body: &str,
) -> bool {
    if urgent {
        return true;
    }
    if intent == Intent::SupportRequest {
        return true;
    }
    let body_lower = body.to_lowercase();
    if HUMAN_REQUEST_PHRASES.iter().any(|p| body_lower.contains(p)) {
        return true;
    }
    conversion_probability > HOT_LEAD_THRESHOLD && intent == Intent::PurchaseIntent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgency_always_escalates() {
        for intent in [
            Intent::PricingInquiry,
            Intent::GeneralInquiry,
            Intent::DemoRequest,
        ] {
            assert!(should_escalate(true, intent, 0.0, "hello"));
        }
    }

    #[test]
    fn support_request_escalates() {
        assert!(should_escalate(
            false,
            Intent::SupportRequest,
            0.1,
            "login page errors out"
        ));
    }

    #[test]
    fn human_request_phrase_escalates() {
        assert!(should_escalate(
            false,
            Intent::GeneralInquiry,
            0.1,
            "I'd rather speak to a human about this."
        ));
        assert!(should_escalate(
            false,
            Intent::GeneralInquiry,
            0.1,
            "Please have a manager contact me."
        ));
    }

    #[test]
    fn hot_purchase_lead_escalates() {
        assert!(should_escalate(
            false,
            Intent::PurchaseIntent,
            0.8,
            "ready to sign"
        ));
    }

    #[test]
    fn cool_purchase_lead_does_not_escalate() {
        assert!(!should_escalate(
            false,
            Intent::PurchaseIntent,
            0.5,
            "thinking about buying"
        ));
    }

    #[test]
    fn hot_lead_without_purchase_intent_does_not_escalate() {
        assert!(!should_escalate(
            false,
            Intent::PricingInquiry,
            0.9,
            "what does it cost?"
        ));
    }

    #[test]
    fn quiet_general_inquiry_does_not_escalate() {
        assert!(!should_escalate(
            false,
            Intent::GeneralInquiry,
            0.3,
            "Thanks for the update!"
        ));
    }
}
