//! Mail parsing helpers — fetched-mail struct, quote stripping, HTML
//! stripping, sender allowlist.

use serde::{Deserialize, Serialize};

/// One unseen email fetched from the mailbox, before staging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedMail {
    /// IMAP sequence number used for flag updates.
    pub uid: String,
    /// Message-ID header (generated if absent).
    pub message_id: String,
    /// Sender address.
    pub sender: String,
    /// Sender display name, when the From header carries one.
    pub sender_name: Option<String>,
    pub subject: String,
    /// Body text (quote-stripped plain text, or stripped HTML fallback).
    pub body: String,
    /// Thread correlation: In-Reply-To, else first References entry.
    pub thread_id: Option<String>,
    /// Unix timestamp from the Date header.
    pub timestamp: u64,
}

/// Strip quoted text from an email body.
///
/// Removes:
/// - Lines starting with `>` (quoted reply lines)
/// - "On ... wrote:" attribution lines and everything after
/// - "--- Original Message ---" separators and everything after
pub fn strip_quoted_text(body: &str) -> String {
    let mut result = Vec::new();
    let mut skip_rest = false;

    for line in body.lines() {
        if skip_rest {
            break;
        }

        let trimmed = line.trim();

        if trimmed.starts_with('>') {
            continue;
        }

        if trimmed.starts_with("On ") && trimmed.ends_with("wrote:") {
            skip_rest = true;
            continue;
        }

        if trimmed.starts_with("---") && trimmed.contains("Original Message") {
            skip_rest = true;
            continue;
        }

        result.push(line);
    }

    while result.last().is_some_and(|l| l.trim().is_empty()) {
        result.pop();
    }

    result.join("\n")
}

/// Strip HTML tags from content (basic).
pub fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Check if a sender email is in the allowlist.
///
/// - Empty list → allow all (open support inbox)
/// - `*` in list → allow all
/// - `@domain.com` or `domain.com` → domain match
/// - `user@domain.com` → exact email match
pub fn is_sender_allowed(allowed: &[String], email: &str) -> bool {
    if allowed.is_empty() {
        return true;
    }
    if allowed.iter().any(|a| a == "*") {
        return true;
    }
    let email_lower = email.to_lowercase();
    allowed.iter().any(|a| {
        if a.starts_with('@') {
            email_lower.ends_with(&a.to_lowercase())
        } else if a.contains('@') {
            a.eq_ignore_ascii_case(email)
        } else {
            email_lower.ends_with(&format!("@{}", a.to_lowercase()))
        }
    })
}

/// Extract the sender address from a parsed email.
pub fn extract_sender(parsed: &mail_parser::Message) -> String {
    parsed
        .from()
        .and_then(|addr| addr.first())
        .and_then(|a| a.address())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".into())
}

/// Extract the sender display name, if the From header carries one.
pub fn extract_sender_name(parsed: &mail_parser::Message) -> Option<String> {
    parsed
        .from()
        .and_then(|addr| addr.first())
        .and_then(|a| a.name())
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
}

/// Extract readable text from a parsed email: plain text part first,
/// stripped HTML as fallback.
pub fn extract_text(parsed: &mail_parser::Message) -> String {
    if let Some(text) = parsed.body_text(0) {
        return text.to_string();
    }
    if let Some(html) = parsed.body_html(0) {
        return strip_html(html.as_ref());
    }
    "(no readable content)".to_string()
}

/// Thread correlation value from the In-Reply-To header.
pub fn extract_thread_id(parsed: &mail_parser::Message) -> Option<String> {
    parsed
        .in_reply_to()
        .as_text_list()
        .and_then(|list| list.first().map(|s| s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── strip_quoted_text tests ─────────────────────────────────

    #[test]
    fn strip_basic_quoted_lines() {
        let body = "Hello!\n\n> This is quoted\n> Another quoted line\nThanks";
        assert_eq!(strip_quoted_text(body), "Hello!\n\nThanks");
    }

    #[test]
    fn strip_on_wrote_attribution() {
        let body = "Sounds good!\n\nOn Mon, Jan 1, 2026 at 10:00 AM Alice <alice@ex.com> wrote:\n> Original message";
        assert_eq!(strip_quoted_text(body), "Sounds good!");
    }

    #[test]
    fn strip_original_message_separator() {
        let body = "My reply\n\n--- Original Message ---\nOld stuff here";
        assert_eq!(strip_quoted_text(body), "My reply");
    }

    #[test]
    fn strip_no_quotes_passthrough() {
        let body = "Just a normal message\nWith multiple lines";
        assert_eq!(strip_quoted_text(body), body);
    }

    #[test]
    fn strip_trailing_blank_lines() {
        let body = "Hello\n\n> quoted\n\n\n";
        assert_eq!(strip_quoted_text(body), "Hello");
    }

    // ── strip_html tests ────────────────────────────────────────

    #[test]
    fn strip_html_basic() {
        assert_eq!(strip_html("<p>Hello</p>"), "Hello");
    }

    #[test]
    fn strip_html_nested_tags() {
        assert_eq!(
            strip_html("<div><b>Bold</b> and <i>italic</i></div>"),
            "Bold and italic"
        );
    }

    #[test]
    fn strip_html_whitespace_normalized() {
        assert_eq!(strip_html("<p>  Hello   World  </p>"), "Hello World");
    }

    // ── allowlist tests ─────────────────────────────────────────

    #[test]
    fn allowlist_empty_allows_all() {
        assert!(is_sender_allowed(&[], "anyone@example.com"));
    }

    #[test]
    fn allowlist_wildcard_allows_all() {
        let allowed = vec!["*".to_string()];
        assert!(is_sender_allowed(&allowed, "anyone@example.com"));
    }

    #[test]
    fn allowlist_exact_email_match() {
        let allowed = vec!["alice@example.com".to_string()];
        assert!(is_sender_allowed(&allowed, "alice@example.com"));
        assert!(is_sender_allowed(&allowed, "Alice@Example.com"));
        assert!(!is_sender_allowed(&allowed, "bob@example.com"));
    }

    #[test]
    fn allowlist_domain_with_at_prefix() {
        let allowed = vec!["@example.com".to_string()];
        assert!(is_sender_allowed(&allowed, "alice@example.com"));
        assert!(!is_sender_allowed(&allowed, "alice@other.com"));
    }

    #[test]
    fn allowlist_domain_without_at_prefix() {
        let allowed = vec!["example.com".to_string()];
        assert!(is_sender_allowed(&allowed, "bob@example.com"));
        assert!(!is_sender_allowed(&allowed, "bob@other.com"));
    }

    // ── FetchedMail serde ───────────────────────────────────────

    #[test]
    fn fetched_mail_serde_roundtrip() {
        let mail = FetchedMail {
            uid: "7".into(),
            message_id: "<abc@mail>".into(),
            sender: "alice@example.com".into(),
            sender_name: Some("Alice".into()),
            subject: "Hello".into(),
            body: "Quick question".into(),
            thread_id: None,
            timestamp: 1_700_000_000,
        };
        let json = serde_json::to_string(&mail).unwrap();
        let parsed: FetchedMail = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.message_id, "<abc@mail>");
        assert_eq!(parsed.sender_name.as_deref(), Some("Alice"));
    }
}
