//! Bounded heuristic updates for customer scores and stage.
//!
//! Deterministic by construction — keyword counts and fixed tables, so the
//! same message always moves a record the same way.

use crate::store::model::Stage;
use crate::triage::Intent;

const POSITIVE_KEYWORDS: &[&str] = &[
    "thanks",
    "thank you",
    "great",
    "love",
    "perfect",
    "excellent",
    "appreciate",
    "awesome",
    "helpful",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "disappointed",
    "frustrated",
    "angry",
    "terrible",
    "awful",
    "unacceptable",
    "cancel",
    "refund",
    "waste",
];

const POSITIVE_NUDGE: f32 = 0.05;
const NEGATIVE_NUDGE: f32 = 0.08;

/// Nudge a sentiment score by counting positive/negative keywords in the
/// body. Result stays within [0, 1].
pub fn adjust_sentiment(current: f32, body: &str) -> f32 {
    let body_lower = body.to_lowercase();
    let positives = POSITIVE_KEYWORDS
        .iter()
        .filter(|kw| body_lower.contains(*kw))
        .count() as f32;
    let negatives = NEGATIVE_KEYWORDS
        .iter()
        .filter(|kw| body_lower.contains(*kw))
        .count() as f32;

    (current + positives * POSITIVE_NUDGE - negatives * NEGATIVE_NUDGE).clamp(0.0, 1.0)
}

/// Nudge the conversion probability by intent. Result stays within [0, 1].
pub fn adjust_conversion(current: f32, intent: Intent) -> f32 {
    let delta = match intent {
        Intent::PurchaseIntent => 0.15,
        Intent::DemoRequest => 0.10,
        Intent::PricingInquiry => 0.05,
        Intent::InformationRequest => 0.02,
        Intent::SupportRequest => -0.05,
        Intent::GeneralInquiry => 0.0,
    };
    (current + delta).clamp(0.0, 1.0)
}

/// Advance the funnel stage from the latest intent.
///
/// Terminal stages never move. Conversion to `Customer` is a human action
/// and never happens here.
pub fn advance_stage(stage: Stage, intent: Intent) -> Stage {
    if stage.is_terminal() {
        return stage;
    }
    match (stage, intent) {
        (Stage::InitialInquiry, _) => Stage::InformationGathering,
        (
            Stage::InformationGathering,
            Intent::PricingInquiry | Intent::DemoRequest | Intent::PurchaseIntent,
        ) => Stage::ProductMatching,
        (Stage::ProductMatching, Intent::PurchaseIntent) => Stage::Closing,
        (Stage::ObjectionHandling, Intent::PurchaseIntent) => Stage::Closing,
        (other, _) => other,
    }
}
