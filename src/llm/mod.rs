//! LLM integration for the placement agent.
//!
//! Supports:
//! - **Gemini**: `generateContent` via rig-core
//!
//! Uses the rig-core crate for HTTP transport and the `RigAdapter` to bridge
//! rig's `CompletionModel` trait to our `LlmProvider` trait. The classifier
//! and the report generator depend only on `LlmProvider`.

pub mod json;
pub mod provider;
mod rig_adapter;

pub use json::extract_json_object;
pub use provider::*;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;

use rig::client::CompletionClient;
use rig::providers::gemini::completion::gemini_api_types::{AdditionalParameters, GenerationConfig};
use secrecy::ExposeSecret;
use serde_json::Value;

use crate::error::LlmError;

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: secrecy::SecretString,
    pub model: String,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::gemini;

    let client: gemini::Client =
        gemini::Client::new(config.api_key.expose_secret()).map_err(|e| {
            LlmError::RequestFailed {
                provider: "gemini".to_string(),
                reason: format!("Failed to create Gemini client: {}", e),
            }
        })?;

    let model = client.completion_model(&config.model);
    tracing::info!("Using Gemini (model: {})", config.model);
    Ok(Arc::new(
        RigAdapter::new(model, &config.model, "gemini").with_extra_params(gemini_generation_params),
    ))
}

/// top-p and top-k only travel through Gemini's `generationConfig`.
fn gemini_generation_params(request: &CompletionRequest) -> Option<Value> {
    if request.top_p.is_none() && request.top_k.is_none() {
        return None;
    }

    let generation = GenerationConfig {
        temperature: request.temperature.map(|t| t as _),
        top_p: request.top_p.map(|p| p as _),
        top_k: request.top_k.map(|k| k as _),
        max_output_tokens: request.max_tokens.map(|m| m as _),
        ..Default::default()
    };
    match serde_json::to_value(AdditionalParameters::default().with_config(generation)) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(error = %e, "Could not encode Gemini generation config");
            None
        }
    }
}
