//! Keyword-based intent classification.
//!
//! Patterns are scanned in a fixed priority order; the first match wins.
//! No learning, no scoring — pattern order is the only ambiguity resolution.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Classification label for an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    PricingInquiry,
    SupportRequest,
    PurchaseIntent,
    DemoRequest,
    InformationRequest,
    GeneralInquiry,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PricingInquiry => "pricing_inquiry",
            Self::SupportRequest => "support_request",
            Self::PurchaseIntent => "purchase_intent",
            Self::DemoRequest => "demo_request",
            Self::InformationRequest => "information_request",
            Self::GeneralInquiry => "general_inquiry",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "pricing_inquiry" => Self::PricingInquiry,
            "support_request" => Self::SupportRequest,
            "purchase_intent" => Self::PurchaseIntent,
            "demo_request" => Self::DemoRequest,
            "information_request" => Self::InformationRequest,
            _ => Self::GeneralInquiry,
        }
    }
}

/// Confidence attached to a pattern match.
const MATCH_CONFIDENCE: f32 = 0.9;
/// Confidence attached to the default label.
const DEFAULT_CONFIDENCE: f32 = 0.4;

/// First-match keyword classifier over a closed label set.
pub struct IntentClassifier {
    patterns: Vec<(Intent, Regex)>,
}

impl IntentClassifier {
    /// Build the classifier with the default priority-ordered patterns.
    pub fn new() -> Self {
        let patterns = vec![
            (
                Intent::PricingInquiry,
                Regex::new(r"(?i)\b(price|pricing|cost|costs|how much|quote|quotation|rate|fee|fees|budget)\b")
                    .unwrap(),
            ),
            (
                Intent::SupportRequest,
                Regex::new(r"(?i)\b(help|support|issue|problem|error|bug|broken|crash|not working|doesn'?t work|down|failing|fix)\b")
                    .unwrap(),
            ),
            (
                Intent::PurchaseIntent,
                Regex::new(r"(?i)\b(buy|purchase|order|sign up|signup|subscribe|upgrade|ready to (go|start|move)|proceed|invoice me)\b")
                    .unwrap(),
            ),
            (
                Intent::DemoRequest,
                Regex::new(r"(?i)\b(demo|demonstration|walkthrough|trial|test drive|sandbox|show me)\b")
                    .unwrap(),
            ),
            (
                Intent::InformationRequest,
                Regex::new(r"(?i)\b(information|details|learn more|tell me more|documentation|docs|spec|features|capabilit)\b|\bmore about\b")
                    .unwrap(),
            ),
        ];
        Self { patterns }
    }

    /// Classify a message body. Returns the label and its confidence.
    pub fn classify(&self, body: &str) -> (Intent, f32) {
        for (intent, regex) in &self.patterns {
            if regex.is_match(body) {
                return (*intent, MATCH_CONFIDENCE);
            }
        }
        (Intent::GeneralInquiry, DEFAULT_CONFIDENCE)
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}
