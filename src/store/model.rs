//! Customer and interaction records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::triage::Intent;

/// Position of a customer in the sales funnel.
///
/// `Customer` and `Churned` are terminal — records never leave them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    InitialInquiry,
    InformationGathering,
    ProductMatching,
    ObjectionHandling,
    Closing,
    Customer,
    Churned,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitialInquiry => "initial_inquiry",
            Self::InformationGathering => "information_gathering",
            Self::ProductMatching => "product_matching",
            Self::ObjectionHandling => "objection_handling",
            Self::Closing => "closing",
            Self::Customer => "customer",
            Self::Churned => "churned",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "information_gathering" => Self::InformationGathering,
            "product_matching" => Self::ProductMatching,
            "objection_handling" => Self::ObjectionHandling,
            "closing" => Self::Closing,
            "customer" => Self::Customer,
            "churned" => Self::Churned,
            _ => Self::InitialInquiry,
        }
    }

    /// Terminal stages never transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Customer | Self::Churned)
    }
}

/// A customer record, keyed by email address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    /// Unique key, stored lowercase.
    pub email: String,
    pub display_name: Option<String>,
    pub company: Option<String>,
    pub stage: Stage,
    pub first_contact: DateTime<Utc>,
    pub last_contact: DateTime<Utc>,
    pub interaction_count: u32,
    /// 0.0 (negative) to 1.0 (positive).
    pub sentiment_score: f32,
    /// 0.0 to 1.0.
    pub conversion_probability: f32,
    /// Free-text budget/timeline notes.
    pub notes: Option<String>,
}

impl Customer {
    /// Create a fresh record for a first-contact sender.
    pub fn new(email: &str, display_name: Option<&str>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.to_lowercase(),
            display_name: display_name.map(String::from),
            company: None,
            stage: Stage::InitialInquiry,
            first_contact: now,
            last_contact: now,
            interaction_count: 0,
            sentiment_score: 0.5,
            conversion_probability: 0.3,
            notes: None,
        }
    }

    /// First name for greetings — first token of the display name,
    /// falling back to the local part of the email address.
    pub fn first_name(&self) -> String {
        if let Some(ref name) = self.display_name
            && let Some(first) = name.split_whitespace().next()
        {
            return first.to_string();
        }
        self.email
            .split('@')
            .next()
            .unwrap_or("there")
            .to_string()
    }
}

/// Direction of an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "outbound" => Self::Outbound,
            _ => Self::Inbound,
        }
    }
}

/// One email exchanged with a customer. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub direction: Direction,
    pub subject: String,
    pub body: String,
    pub intent: Intent,
    /// Classifier confidence, when one applies.
    pub confidence: Option<f32>,
    pub created_at: DateTime<Utc>,
}

impl Interaction {
    pub fn new(
        customer_id: Uuid,
        direction: Direction,
        subject: &str,
        body: &str,
        intent: Intent,
        confidence: Option<f32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            direction,
            subject: subject.to_string(),
            body: body.to_string(),
            intent,
            confidence,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_roundtrip() {
        for stage in [
            Stage::InitialInquiry,
            Stage::InformationGathering,
            Stage::ProductMatching,
            Stage::ObjectionHandling,
            Stage::Closing,
            Stage::Customer,
            Stage::Churned,
        ] {
            assert_eq!(Stage::parse(stage.as_str()), stage);
        }
    }

    #[test]
    fn stage_parse_unknown_defaults_to_initial() {
        assert_eq!(Stage::parse("bogus"), Stage::InitialInquiry);
    }

    #[test]
    fn terminal_stages() {
        assert!(Stage::Customer.is_terminal());
        assert!(Stage::Churned.is_terminal());
        assert!(!Stage::Closing.is_terminal());
    }

    #[test]
    fn new_customer_starts_at_initial_inquiry() {
        let c = Customer::new("Alice@Example.COM", Some("Alice Chen"));
        assert_eq!(c.email, "alice@example.com");
        assert_eq!(c.stage, Stage::InitialInquiry);
        assert_eq!(c.interaction_count, 0);
        assert!(c.first_contact <= c.last_contact);
    }

    #[test]
    fn first_name_from_display_name() {
        let c = Customer::new("alice@example.com", Some("Alice Chen"));
        assert_eq!(c.first_name(), "Alice");
    }

    #[test]
    fn first_name_falls_back_to_local_part() {
        let c = Customer::new("bob.smith@example.com", None);
        assert_eq!(c.first_name(), "bob.smith");
    }

    #[test]
    fn direction_roundtrip() {
        assert_eq!(Direction::parse("inbound"), Direction::Inbound);
        assert_eq!(Direction::parse("outbound"), Direction::Outbound);
        assert_eq!(Direction::Outbound.as_str(), "outbound");
    }
}
