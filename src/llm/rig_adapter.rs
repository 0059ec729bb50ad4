//! Bridges a rig `CompletionModel` to our `LlmProvider` trait.

use async_trait::async_trait;
use rig::completion::CompletionModel;
use rig::completion::message::AssistantContent;

use crate::error::LlmError;

use super::provider::{CompletionRequest, CompletionResponse, LlmProvider};

/// Wraps any rig completion model.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
    provider: String,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: &str, provider: &str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            provider: provider.to_string(),
        }
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
        let mut builder = self.model.completion_request(request.prompt.as_str());
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(f64::from(temperature));
        }
        if let Some(max_tokens) = request.max_tokens {
            builder = builder.max_tokens(u64::from(max_tokens));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify_error(&self.provider, &e.to_string()))?;

        // No text parts (e.g. a null content) is an empty generation.
        let content: String = response
            .choice
            .iter()
            .filter_map(|part| match part {
                AssistantContent::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect();

        Ok(CompletionResponse {
            content,
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
        })
    }
}

/// Map a rig error message onto our error kinds. rig reports provider
/// failures as text carrying the status or the provider's error body.
fn classify_error(provider: &str, reason: &str) -> LlmError {
    let lower = reason.to_lowercase();
    if lower.contains("401")
        || lower.contains("unauthorized")
        || lower.contains("invalid api key")
        || lower.contains("invalid_api_key")
    {
        LlmError::AuthFailed {
            provider: provider.to_string(),
        }
    } else if lower.contains("429") || lower.contains("rate limit") || lower.contains("rate_limit")
    {
        LlmError::RateLimited {
            provider: provider.to_string(),
            retry_after: None,
        }
    } else {
        LlmError::RequestFailed {
            provider: provider.to_string(),
            reason: reason.to_string(),
        }
    }
}
