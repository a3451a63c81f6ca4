// Anthropic Messages API client
//
// Chat only. The system prompt is a top-level field in this API rather than a
// message, so requests are reshaped before sending.

use super::sse::{parse_anthropic_data, token_stream};
use super::{error, ChatRequest, ModelProvider, ProviderError, Role, TokenStream};
use crate::config::AnthropicConfig;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// API version header sent with every request
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl AnthropicProvider {
    pub fn new(config: &AnthropicConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn post_messages(&self, body: &serde_json::Value) -> Result<reqwest::RequestBuilder, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::NotConfigured {
            provider: "anthropic",
        })?;

        Ok(self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body))
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, ProviderError> {
        let response = req.send().await?;
        if !response.status().is_success() {
            return Err(error::from_response(response).await);
        }
        Ok(response)
    }

    fn unsupported(capability: &'static str) -> ProviderError {
        ProviderError::Unsupported {
            provider: "anthropic",
            capability,
        }
    }
}

/// Reshape a chat request for the Messages API
///
/// System messages are joined into the `system` field; the rest keep their
/// order in `messages`.
fn messages_body(request: &ChatRequest, stream: bool) -> serde_json::Value {
    let system: Vec<&str> = request
        .messages
        .iter()
        .filter(|m| m.role == Role::System && !m.content.is_empty())
        .map(|m| m.content.as_str())
        .collect();

    let messages: Vec<serde_json::Value> = request
        .messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| serde_json::json!({ "role": m.role.as_str(), "content": m.content }))
        .collect();

    let mut body = serde_json::json!({
        "model": request.model,
        "messages": messages,
        "max_tokens": request.max_tokens,
        "temperature": request.temperature,
        "stream": stream,
    });
    if !system.is_empty() {
        body["system"] = serde_json::Value::String(system.join("\n\n"));
    }
    body
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl ModelProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn complete_chat(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let req = self.post_messages(&messages_body(request, false))?;
        let body: MessagesResponse = self.send(req).await?.json().await?;

        Ok(body
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect())
    }

    async fn stream_chat(&self, request: &ChatRequest) -> Result<TokenStream, ProviderError> {
        let req = self
            .post_messages(&messages_body(request, true))?
            .header("Accept", "text/event-stream");
        let response = self.send(req).await?;
        Ok(token_stream(response, parse_anthropic_data))
    }

    async fn embed_text(&self, _model: &str, _text: &str) -> Result<Vec<f32>, ProviderError> {
        Err(Self::unsupported("embeddings"))
    }

    async fn transcribe_audio(
        &self,
        _model: &str,
        _file_name: &str,
        _audio: Vec<u8>,
    ) -> Result<String, ProviderError> {
        Err(Self::unsupported("transcription"))
    }

    async fn synthesize_speech(
        &self,
        _model: &str,
        _voice: &str,
        _text: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        Err(Self::unsupported("speech synthesis"))
    }
}
