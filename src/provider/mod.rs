//! Model provider layer
//!
//! Every remote capability the crate uses (chat, embeddings, transcription and
//! speech) goes through the [`ModelProvider`] trait. The set of vendors is
//! closed: [`Provider`] is an enum over the supported clients and
//! [`ProviderKind::for_model`] picks the variant from a model identifier.
//!
//! # Architecture
//!
//! ```text
//! ModelProvider trait
//! ├── OpenAiProvider     (OpenAI, Azure v1, OpenRouter, any compatible endpoint)
//! └── AnthropicProvider  (chat only)
//! ```
//!
//! Streaming responses are decoded by [`sse`] into a [`TokenStream`] of text
//! fragments in network order.

mod anthropic;
mod error;
mod openai;
pub mod sse;

pub use anthropic::AnthropicProvider;
pub use error::ProviderError;
pub use openai::OpenAiProvider;

use crate::config::Config;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered stream of answer fragments from a streaming chat call
pub type TokenStream = BoxStream<'static, Result<String, ProviderError>>;

// ─────────────────────────────────────────────────────────────────────────────
// Request types
// ─────────────────────────────────────────────────────────────────────────────

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message of a chat prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A fully rendered chat request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Capability trait
// ─────────────────────────────────────────────────────────────────────────────

/// Capabilities a model vendor can offer
///
/// Vendors that lack an endpoint return [`ProviderError::Unsupported`] instead
/// of omitting the method, so callers can hold any provider behind one type.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Short vendor name for logs and error messages
    fn name(&self) -> &'static str;

    /// Non-streaming chat completion, returns the full answer text
    async fn complete_chat(&self, request: &ChatRequest) -> Result<String, ProviderError>;

    /// Streaming chat completion
    ///
    /// The returned future resolves once the response headers arrived; fragments
    /// are then delivered through the stream in the order the server sent them.
    async fn stream_chat(&self, request: &ChatRequest) -> Result<TokenStream, ProviderError>;

    /// Embed a single text
    async fn embed_text(&self, model: &str, text: &str) -> Result<Vec<f32>, ProviderError>;

    /// Speech to text for an audio file
    async fn transcribe_audio(
        &self,
        model: &str,
        file_name: &str,
        audio: Vec<u8>,
    ) -> Result<String, ProviderError>;

    /// Text to speech, returns encoded audio bytes
    async fn synthesize_speech(
        &self,
        model: &str,
        voice: &str,
        text: &str,
    ) -> Result<Vec<u8>, ProviderError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider selection
// ─────────────────────────────────────────────────────────────────────────────

/// Vendor family a model identifier belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    /// Select the vendor for a model identifier
    ///
    /// Claude models go to Anthropic. Everything else, including unknown
    /// identifiers, is sent to the OpenAI-compatible endpoint since that API
    /// shape is what self-hosted and proxy servers implement.
    pub fn for_model(model: &str) -> Self {
        if model.trim().to_ascii_lowercase().starts_with("claude") {
            Self::Anthropic
        } else {
            Self::OpenAi
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Closed set of supported vendors
pub enum Provider {
    OpenAi(OpenAiProvider),
    Anthropic(AnthropicProvider),
}

impl Provider {
    /// Build the client for the vendor serving `model`
    ///
    /// A missing API key does not fail here; the first call reports
    /// [`ProviderError::NotConfigured`] instead.
    pub fn for_model(model: &str, config: &Config) -> Result<Self, ProviderError> {
        Self::for_kind(ProviderKind::for_model(model), config)
    }

    pub fn for_kind(kind: ProviderKind, config: &Config) -> Result<Self, ProviderError> {
        match kind {
            ProviderKind::OpenAi => Ok(Self::OpenAi(OpenAiProvider::new(&config.openai)?)),
            ProviderKind::Anthropic => Ok(Self::Anthropic(AnthropicProvider::new(
                &config.anthropic,
            )?)),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::OpenAi(_) => ProviderKind::OpenAi,
            Self::Anthropic(_) => ProviderKind::Anthropic,
        }
    }
}

#[async_trait]
impl ModelProvider for Provider {
    fn name(&self) -> &'static str {
        match self {
            Self::OpenAi(p) => p.name(),
            Self::Anthropic(p) => p.name(),
        }
    }

    async fn complete_chat(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        match self {
            Self::OpenAi(p) => p.complete_chat(request).await,
            Self::Anthropic(p) => p.complete_chat(request).await,
        }
    }

    async fn stream_chat(&self, request: &ChatRequest) -> Result<TokenStream, ProviderError> {
        match self {
            Self::OpenAi(p) => p.stream_chat(request).await,
            Self::Anthropic(p) => p.stream_chat(request).await,
        }
    }

    async fn embed_text(&self, model: &str, text: &str) -> Result<Vec<f32>, ProviderError> {
        match self {
            Self::OpenAi(p) => p.embed_text(model, text).await,
            Self::Anthropic(p) => p.embed_text(model, text).await,
        }
    }

    async fn transcribe_audio(
        &self,
        model: &str,
        file_name: &str,
        audio: Vec<u8>,
    ) -> Result<String, ProviderError> {
        match self {
            Self::OpenAi(p) => p.transcribe_audio(model, file_name, audio).await,
            Self::Anthropic(p) => p.transcribe_audio(model, file_name, audio).await,
        }
    }

    async fn synthesize_speech(
        &self,
        model: &str,
        voice: &str,
        text: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        match self {
            Self::OpenAi(p) => p.synthesize_speech(model, voice, text).await,
            Self::Anthropic(p) => p.synthesize_speech(model, voice, text).await,
        }
    }
}
