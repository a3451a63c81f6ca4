//! Endpoint configuration for the model vendors
//!
//! API keys are read from environment variables only. They are never part of
//! the config file format and are skipped by `to_toml()`.

use serde::Deserialize;

// ─────────────────────────────────────────────────────────────────────────────
// Authentication
// ─────────────────────────────────────────────────────────────────────────────

/// Authentication method for OpenAI-compatible endpoints
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMethod {
    /// `Authorization: Bearer {key}` (OpenAI, OpenRouter)
    #[default]
    Bearer,
    /// `api-key: {key}` (Azure)
    ApiKey,
}

impl AuthMethod {
    /// Convert to string for TOML serialization
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bearer => "bearer",
            Self::ApiKey => "api-key",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OpenAI-compatible endpoint
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiConfig {
    /// API key from `VAULTMIND_OPENAI_API_KEY` or `OPENAI_API_KEY`
    pub api_key: Option<String>,

    /// API base URL
    /// - OpenAI: "https://api.openai.com/v1" (default)
    /// - Azure v1: "https://{resource}.openai.azure.com/openai/v1"
    /// - OpenRouter: "https://openrouter.ai/api/v1"
    pub api_base: String,

    pub auth_method: AuthMethod,

    /// API version query parameter (Azure AI Foundry)
    pub api_version: Option<String>,

    /// Connect timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://api.openai.com/v1".to_string(),
            auth_method: AuthMethod::Bearer,
            api_version: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileOpenAiConfig {
    pub api_base: Option<String>,
    pub auth_method: Option<AuthMethod>,
    pub api_version: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl OpenAiConfig {
    /// Create from file config, with the API key from the environment
    pub fn from_file(file: Option<FileOpenAiConfig>, api_key: Option<String>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            api_base: file.api_base.unwrap_or(defaults.api_base),
            auth_method: file.auth_method.unwrap_or(defaults.auth_method),
            api_version: file.api_version.or(defaults.api_version),
            timeout_secs: file.timeout_secs.unwrap_or(defaults.timeout_secs),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Anthropic endpoint
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct AnthropicConfig {
    /// API key from `ANTHROPIC_API_KEY`
    pub api_key: Option<String>,
    pub api_base: String,
    /// Connect timeout in seconds
    pub timeout_secs: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://api.anthropic.com".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileAnthropicConfig {
    pub api_base: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl AnthropicConfig {
    pub fn from_file(file: Option<FileAnthropicConfig>, api_key: Option<String>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            api_base: file.api_base.unwrap_or(defaults.api_base),
            timeout_secs: file.timeout_secs.unwrap_or(defaults.timeout_secs),
        }
    }
}
