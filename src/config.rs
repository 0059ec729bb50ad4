//! Configuration types.
//!
//! Everything is read from the environment once at startup. Numeric values
//! that fail to parse fall back to their defaults. The CORS origin is
//! validated when the router's CORS layer is built.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default OpenAI-compatible endpoint (Groq).
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
/// Default model id.
pub const DEFAULT_MODEL: &str = "llama3-8b-8192";
/// Name of the environment variable holding the completion credential.
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

/// Settings for the completion service.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// `None` when no credential is configured; replies then degrade to an error message.
    pub api_key: Option<SecretString>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Upper bound on a single completion call.
    pub request_timeout: Duration,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl LlmSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(SecretString::from);

        let model = std::env::var("HOBBY_GUIDE_MODEL").unwrap_or(defaults.model);
        let base_url = std::env::var("HOBBY_GUIDE_BASE_URL").unwrap_or(defaults.base_url);

        let temperature: f32 = std::env::var("HOBBY_GUIDE_TEMPERATURE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.temperature);

        let max_tokens: u32 = std::env::var("HOBBY_GUIDE_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_tokens);

        // Zero would time out every call, so it falls back too.
        let request_timeout = std::env::var("HOBBY_GUIDE_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        Self {
            api_key,
            model,
            base_url,
            temperature,
            max_tokens,
            request_timeout,
        }
    }
}

/// Conversation tuning.
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Interests needed before the conversation moves on to dislikes.
    pub min_interests: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self { min_interests: 2 }
    }
}

impl ConversationConfig {
    pub fn from_env() -> Self {
        let min_interests = std::env::var("HOBBY_GUIDE_MIN_INTERESTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(Self::default().min_interests);
        Self { min_interests }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// The single browser origin allowed by CORS.
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8000,
            cors_origin: "http://localhost:3000".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = match std::env::var("HOBBY_GUIDE_HOST") {
            Ok(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
                key: "HOBBY_GUIDE_HOST".to_string(),
                message: format!("{e}"),
            })?,
            Err(_) => defaults.host,
        };

        let port: u16 = std::env::var("HOBBY_GUIDE_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        let cors_origin = std::env::var("HOBBY_GUIDE_CORS_ORIGIN").unwrap_or(defaults.cors_origin);

        Ok(Self {
            host,
            port,
            cors_origin,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub llm: LlmSettings,
    pub conversation: ConversationConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            llm: LlmSettings::from_env(),
            conversation: ConversationConfig::from_env(),
            server: ServerConfig::from_env()?,
        })
    }
}
