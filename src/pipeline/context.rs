//! Prompt assembly — merges the normalized message with the resolved
//! customer record into a role-tagged payload.

use crate::config::ResponderConfig;
use crate::llm::ChatMessage;
use crate::pipeline::types::NormalizedMessage;
use crate::store::model::Customer;
use crate::store::{Direction, Interaction};

/// Build the system prompt: persona plus customer profile.
pub fn build_system_prompt(customer: &Customer, config: &ResponderConfig) -> String {
    let mut prompt = String::with_capacity(512);

    prompt.push_str(&format!(
        "You are {}, a customer support agent for {}. \
         Write a helpful, concise reply to the customer's email. \
         Plain text only — no greeting and no sign-off, those are added separately. \
         Do not invent prices, dates, or commitments.\n\n",
        config.agent_name, config.company_name
    ));

    prompt.push_str("Customer profile:\n");
    prompt.push_str(&format!("- Email: {}\n", customer.email));
    if let Some(ref name) = customer.display_name {
        prompt.push_str(&format!("- Name: {}\n", name));
    }
    if let Some(ref company) = customer.company {
        prompt.push_str(&format!("- Company: {}\n", company));
    }
    prompt.push_str(&format!("- Funnel stage: {}\n", customer.stage.as_str()));
    prompt.push_str(&format!(
        "- Previous interactions: {}\n",
        customer.interaction_count
    ));
    if let Some(ref notes) = customer.notes {
        prompt.push_str(&format!("- Notes: {}\n", notes));
    }

    prompt
}

/// Build the user prompt: intent signal, recent history, message body.
pub fn build_user_prompt(message: &NormalizedMessage, history: &[Interaction]) -> String {
    let mut prompt = String::with_capacity(512);

    prompt.push_str(&format!("Subject: {}\n", message.subject));
    prompt.push_str(&format!("Detected intent: {}\n", message.intent.as_str()));
    if message.urgent {
        prompt.push_str("Signals: marked urgent\n");
    }

    if !history.is_empty() {
        prompt.push_str("\nRecent history:\n");
        for interaction in history.iter().take(3) {
            let preview: String = interaction.body.chars().take(200).collect();
            let who = match interaction.direction {
                Direction::Inbound => "customer",
                Direction::Outbound => "us",
            };
            prompt.push_str(&format!("  [{}] {}\n", who, preview));
        }
    }

    // Body truncated for token efficiency
    let body_preview: String = message.body.chars().take(2000).collect();
    prompt.push_str(&format!("\nEmail:\n{}", body_preview));

    prompt
}

/// Assemble the full role-tagged payload for the completion request.
pub fn assemble_prompt(
    customer: &Customer,
    message: &NormalizedMessage,
    history: &[Interaction],
    config: &ResponderConfig,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(build_system_prompt(customer, config)),
        ChatMessage::user(build_user_prompt(message, history)),
    ]
}
