//! LLM integration for Hobby Guide.
//!
//! The hosted model is Groq, reached through rig-core. `RigAdapter` bridges
//! rig's `CompletionModel` to our `LlmProvider` trait, and `CompletionClient`
//! wraps any provider with the single-prompt, never-fails contract the
//! conversation relies on.

pub mod completion;
pub mod provider;
mod rig_adapter;

pub use completion::{Completion, CompletionClient, CompletionFailure, ERROR_MARKER};
pub use provider::*;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;

use rig::client::CompletionClient as _;
use secrecy::ExposeSecret;

use crate::config::LlmSettings;
use crate::error::LlmError;

/// Create an LLM provider from configuration.
///
/// Returns `Ok(None)` when no API key is configured. The service still
/// starts; every reply then carries the missing-credential message instead.
pub fn create_provider(settings: &LlmSettings) -> Result<Option<Arc<dyn LlmProvider>>, LlmError> {
    let Some(api_key) = settings.api_key.as_ref() else {
        tracing::warn!("No API key configured, replies will report the missing credential");
        return Ok(None);
    };

    use rig::providers::groq;

    let client = groq::Client::<rig::http_client::ReqwestClient>::builder()
        .api_key(api_key.expose_secret())
        .base_url(&settings.base_url)
        .build()
        .map_err(|e| LlmError::RequestFailed {
            provider: "groq".to_string(),
            reason: format!("Failed to create Groq client: {}", e),
        })?;

    let model = client.completion_model(&settings.model);
    tracing::info!(
        "Using Groq at {} (model: {})",
        settings.base_url,
        settings.model
    );
    Ok(Some(Arc::new(RigAdapter::new(model, &settings.model, "groq"))))
}
