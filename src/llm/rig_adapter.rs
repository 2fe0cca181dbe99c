//! Adapter from rig's `CompletionModel` to our `LlmProvider` trait.
//!
//! System messages become the rig preamble; the last user/assistant message
//! is the prompt and everything before it is chat history.

use async_trait::async_trait;
use rig::completion::{CompletionError, CompletionModel, Message};
use rig::message::AssistantContent;
use serde_json::Value;

use crate::error::LlmError;
use crate::llm::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role,
};

/// Builds provider-specific `additional_params` (sampling knobs rig has no
/// portable field for).
pub type ExtraParams = fn(&CompletionRequest) -> Option<Value>;

/// Wraps any rig completion model.
pub struct RigAdapter<M: CompletionModel> {
    model: M,
    model_name: String,
    provider: &'static str,
    extra_params: Option<ExtraParams>,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: &str, provider: &'static str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            provider,
            extra_params: None,
        }
    }

    pub fn with_extra_params(mut self, extra_params: ExtraParams) -> Self {
        self.extra_params = Some(extra_params);
        self
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let (preamble, mut history) = split_messages(&request.messages);
        let prompt = history.pop().ok_or_else(|| LlmError::RequestFailed {
            provider: self.provider.to_string(),
            reason: "request has no user message".to_string(),
        })?;

        let mut builder = self.model.completion_request(prompt).messages(history);
        if let Some(preamble) = preamble {
            builder = builder.preamble(preamble);
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(f64::from(temperature));
        }
        if let Some(max_tokens) = request.max_tokens {
            builder = builder.max_tokens(u64::from(max_tokens));
        }
        if let Some(params) = self.extra_params.and_then(|build| build(&request)) {
            builder = builder.additional_params(params);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| map_completion_error(self.provider, e))?;

        let content: String = response
            .choice
            .iter()
            .filter_map(|c| match c {
                AssistantContent::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect();

        if content.trim().is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: self.provider.to_string(),
                reason: "completion has no text".to_string(),
            });
        }

        let output_tokens = saturating_u32(response.usage.output_tokens);
        let finish_reason = if request.max_tokens.is_some_and(|max| output_tokens >= max) {
            FinishReason::Length
        } else {
            FinishReason::Stop
        };

        Ok(CompletionResponse {
            content,
            input_tokens: saturating_u32(response.usage.input_tokens),
            output_tokens,
            finish_reason,
        })
    }
}

/// Joined system text, then the remaining turns in order.
fn split_messages(messages: &[ChatMessage]) -> (Option<String>, Vec<Message>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();
    let preamble = (!system.is_empty()).then(|| system.join("\n\n"));

    let turns = messages
        .iter()
        .filter_map(|m| match m.role {
            Role::System => None,
            Role::User => Some(Message::user(m.content.clone())),
            Role::Assistant => Some(Message::assistant(m.content.clone())),
        })
        .collect();

    (preamble, turns)
}

fn map_completion_error(provider: &str, error: CompletionError) -> LlmError {
    classify_failure(provider, error.to_string())
}

/// Rig flattens HTTP status into its error text; recover the cases we act on.
fn classify_failure(provider: &str, message: String) -> LlmError {
    if message.contains("429") || message.contains("RESOURCE_EXHAUSTED") {
        LlmError::RateLimited {
            provider: provider.to_string(),
            retry_after: None,
        }
    } else if message.contains("401")
        || message.contains("403")
        || message.contains("API_KEY_INVALID")
        || message.contains("PERMISSION_DENIED")
    {
        LlmError::AuthFailed {
            provider: provider.to_string(),
        }
    } else {
        LlmError::RequestFailed {
            provider: provider.to_string(),
            reason: message,
        }
    }
}

fn saturating_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
