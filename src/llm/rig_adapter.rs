//! Bridges rig's `CompletionModel` to our `LlmProvider` trait.

use async_trait::async_trait;
use rig::completion::{AssistantContent, CompletionModel, Message as RigMessage};
use rust_decimal::Decimal;

use crate::error::LlmError;
use crate::llm::costs;
use crate::llm::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role,
};
use crate::llm::retry;

/// Adapter wrapping a rig completion model.
pub struct RigAdapter<M: CompletionModel> {
    model: M,
    model_name: String,
    rates: (Decimal, Decimal),
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: &str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            rates: costs::cost_per_token(model_name),
        }
    }

    async fn complete_once(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        // System messages become the preamble; the last user message is the
        // prompt; everything in between is chat history.
        let preamble: String = request
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut history: Vec<&ChatMessage> = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .collect();

        let prompt = match history.pop() {
            Some(m) if m.role == Role::User => m.content.clone(),
            Some(m) => {
                history.push(m);
                return Err(LlmError::InvalidResponse {
                    provider: self.model_name.clone(),
                    reason: "completion request must end with a user message".into(),
                });
            }
            None => {
                return Err(LlmError::InvalidResponse {
                    provider: self.model_name.clone(),
                    reason: "completion request has no user message".into(),
                });
            }
        };

        let mut builder = self.model.completion_request(RigMessage::user(prompt));

        if !preamble.is_empty() {
            builder = builder.preamble(preamble);
        }

        for message in history {
            let rig_message = match message.role {
                Role::User => RigMessage::user(message.content.clone()),
                Role::Assistant => RigMessage::assistant(message.content.clone()),
                Role::System => continue,
            };
            builder = builder.message(rig_message);
        }

        if let Some(temperature) = request.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }

        let response = builder.send().await.map_err(|e| LlmError::RequestFailed {
            provider: self.model_name.clone(),
            reason: e.to_string(),
        })?;

        let content: String = response
            .choice
            .iter()
            .filter_map(|part| match part {
                AssistantContent::Text(text) => Some(text.text.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");

        if content.is_empty() {
            return Err(LlmError::EmptyCompletion {
                provider: self.model_name.clone(),
            });
        }

        Ok(CompletionResponse {
            content,
            input_tokens: response.usage.input_tokens as u32,
            output_tokens: response.usage.output_tokens as u32,
            finish_reason: FinishReason::Stop,
            response_id: None,
        })
    }
}

#[async_trait]
impl<M: CompletionModel> LlmProvider for RigAdapter<M> {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn cost_per_token(&self) -> (Decimal, Decimal) {
        self.rates
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let response = retry::with_backoff(|| self.complete_once(&request)).await?;

        let cost = costs::request_cost(response.input_tokens, response.output_tokens, self.rates);
        tracing::debug!(
            model = %self.model_name,
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            cost = %cost,
            "Completion finished"
        );

        Ok(response)
    }
}
