//! Urgency detection — case-insensitive substring scan over subject + body.

/// Keywords that flag a message as urgent.
const URGENCY_KEYWORDS: &[&str] = &[
    "urgent",
    "asap",
    "emergency",
    "immediately",
    "right away",
    "critical",
    "time sensitive",
    "time-sensitive",
    "system is down",
    "production down",
    "cannot access",
    "can't access",
];

/// True iff any urgency keyword appears in the subject or body.
pub fn is_urgent(subject: &str, body: &str) -> bool {
    let haystack = format!("{} {}", subject, body).to_lowercase();
    URGENCY_KEYWORDS.iter().any(|kw| haystack.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgent_in_subject() {
        assert!(is_urgent("URGENT: need help", "please respond"));
    }

    #[test]
    fn urgent_in_body() {
        assert!(is_urgent("question", "This is urgent, the demo is tomorrow."));
    }

    #[test]
    fn system_down_phrase() {
        assert!(is_urgent("", "URGENT: system is down, need a manager"));
    }

    #[test]
    fn case_insensitive() {
        assert!(is_urgent("", "Please fix this ASAP"));
        assert!(is_urgent("EMERGENCY", ""));
    }

    #[test]
    fn calm_message_is_not_urgent() {
        assert!(!is_urgent(
            "Pricing question",
            "What is the price for your enterprise plan?"
        ));
    }

    #[test]
    fn substring_match_inside_words() {
        // Substring semantics: "urgently" contains "urgent".
        assert!(is_urgent("", "We urgently need this sorted."));
    }
}
