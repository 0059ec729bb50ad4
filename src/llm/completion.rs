//! Single-prompt completion client with a typed failure channel.
//!
//! Nothing here returns `Err`: every provider failure is classified into a
//! [`CompletionFailure`] so a conversation turn always has something to show.
//! Only [`Completion::into_reply`] turns a failure into user-visible text.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{API_KEY_ENV, LlmSettings};
use crate::error::LlmError;

use super::provider::{CompletionRequest, LlmProvider};

/// Prefix carried by every rendered failure.
pub const ERROR_MARKER: &str = "❌ Error:";

/// Why a completion produced no text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionFailure {
    /// No credential was configured at startup.
    MissingCredential,
    /// The provider rejected the credential.
    InvalidCredential,
    RateLimited,
    TimedOut(Duration),
    /// Any other remote or transport failure.
    Remote(String),
}

impl CompletionFailure {
    /// Classify a provider error.
    pub fn from_llm_error(err: &LlmError) -> Self {
        match err {
            LlmError::AuthFailed { .. } => Self::InvalidCredential,
            LlmError::RateLimited { .. } => Self::RateLimited,
            other => {
                let text = other.to_string();
                let lower = text.to_lowercase();
                if lower.contains("authentication") || lower.contains("api key") {
                    Self::InvalidCredential
                } else {
                    Self::Remote(text)
                }
            }
        }
    }

    /// Human-readable message, prefixed with [`ERROR_MARKER`].
    pub fn render(&self) -> String {
        match self {
            Self::MissingCredential => format!(
                "{ERROR_MARKER} {API_KEY_ENV} not found in environment variables. Please set your API key."
            ),
            Self::InvalidCredential => {
                format!("{ERROR_MARKER} Invalid API key. Please check your {API_KEY_ENV}.")
            }
            Self::RateLimited => format!(
                "{ERROR_MARKER} The model service is rate limiting requests. Please try again shortly."
            ),
            Self::TimedOut(after) => format!(
                "{ERROR_MARKER} The model service did not respond within {}s.",
                after.as_secs()
            ),
            Self::Remote(reason) => format!("{ERROR_MARKER} {reason}"),
        }
    }
}

/// Outcome of a single completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Text(String),
    Failed(CompletionFailure),
}

impl Completion {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// The text to show the user: generated text verbatim, or the rendered failure.
    pub fn into_reply(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Failed(failure) => failure.render(),
        }
    }
}

/// Sends one prompt with fixed sampling settings.
#[derive(Clone)]
pub struct CompletionClient {
    provider: Option<Arc<dyn LlmProvider>>,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl CompletionClient {
    /// `provider` is `None` when no credential is configured.
    pub fn new(provider: Option<Arc<dyn LlmProvider>>, settings: &LlmSettings) -> Self {
        Self {
            provider,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            timeout: settings.request_timeout,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn complete(&self, prompt: &str) -> Completion {
        let Some(provider) = self.provider.as_ref() else {
            warn!("Completion requested without a configured API key");
            return Completion::Failed(CompletionFailure::MissingCredential);
        };

        let request = CompletionRequest::new(prompt)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        match tokio::time::timeout(self.timeout, provider.complete(request)).await {
            Ok(Ok(response)) => {
                debug!(
                    model = provider.model_name(),
                    input_tokens = response.input_tokens,
                    output_tokens = response.output_tokens,
                    "Completion finished"
                );
                Completion::Text(response.content)
            }
            Ok(Err(e)) => {
                warn!(model = provider.model_name(), error = %e, "Completion failed");
                Completion::Failed(CompletionFailure::from_llm_error(&e))
            }
            Err(_) => {
                warn!(
                    model = provider.model_name(),
                    timeout_secs = self.timeout.as_secs(),
                    "Completion timed out"
                );
                Completion::Failed(CompletionFailure::TimedOut(self.timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::llm::provider::CompletionResponse;

    enum FixedLlm {
        Text(&'static str),
        AuthFailed,
    }

    #[async_trait]
    impl LlmProvider for FixedLlm {
        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            assert_eq!(request.prompt, "hello");
            assert_eq!(request.temperature, Some(0.7));
            assert_eq!(request.max_tokens, Some(1000));
            match self {
                Self::Text(text) => Ok(CompletionResponse {
                    content: text.to_string(),
                    input_tokens: 0,
                    output_tokens: 0,
                }),
                Self::AuthFailed => Err(LlmError::AuthFailed {
                    provider: "groq".to_string(),
                }),
            }
        }
    }

    struct HangingLlm;

    #[async_trait]
    impl LlmProvider for HangingLlm {
        fn model_name(&self) -> &str {
            "hang"
        }

        async fn complete(&self, _: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            std::future::pending().await
        }
    }

    fn client(provider: Option<Arc<dyn LlmProvider>>) -> CompletionClient {
        CompletionClient::new(provider, &LlmSettings::default())
    }

    #[tokio::test]
    async fn missing_key_renders_marked_error() {
        let completion = client(None).complete("hello").await;
        assert_eq!(
            completion,
            Completion::Failed(CompletionFailure::MissingCredential)
        );
        let reply = completion.into_reply();
        assert!(reply.starts_with(ERROR_MARKER));
        assert!(reply.contains("GROQ_API_KEY"));
    }

    #[tokio::test]
    async fn text_is_returned_verbatim() {
        let llm: Arc<dyn LlmProvider> = Arc::new(FixedLlm::Text("  spaced \n"));
        let completion = client(Some(llm)).complete("hello").await;
        assert_eq!(completion, Completion::Text("  spaced \n".to_string()));
    }

    #[tokio::test]
    async fn auth_failure_is_classified() {
        let llm: Arc<dyn LlmProvider> = Arc::new(FixedLlm::AuthFailed);
        let completion = client(Some(llm)).complete("hello").await;
        assert_eq!(
            completion,
            Completion::Failed(CompletionFailure::InvalidCredential)
        );
        assert!(completion.into_reply().contains("Invalid API key"));
    }

    #[test]
    fn api_key_text_is_credential_related() {
        let err = LlmError::RequestFailed {
            provider: "groq".to_string(),
            reason: "HTTP 400: Invalid API Key provided".to_string(),
        };
        assert_eq!(
            CompletionFailure::from_llm_error(&err),
            CompletionFailure::InvalidCredential
        );
    }

    #[test]
    fn other_errors_keep_their_text() {
        let err = LlmError::RequestFailed {
            provider: "groq".to_string(),
            reason: "connection reset".to_string(),
        };
        let failure = CompletionFailure::from_llm_error(&err);
        assert!(matches!(failure, CompletionFailure::Remote(_)));
        let rendered = failure.render();
        assert!(rendered.starts_with(ERROR_MARKER));
        assert!(rendered.contains("connection reset"));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_provider_times_out() {
        let llm: Arc<dyn LlmProvider> = Arc::new(HangingLlm);
        let completion = client(Some(llm)).complete("hello").await;
        assert_eq!(
            completion,
            Completion::Failed(CompletionFailure::TimedOut(Duration::from_secs(60)))
        );
    }
}
