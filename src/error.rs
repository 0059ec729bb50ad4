//! Error types for Hobby Guide.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Session store errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session {id} not found")]
    NotFound { id: String },

    #[error("Turn for session {id} aborted: {reason}")]
    TurnAborted { id: String, reason: String },
}
