// ═══════════════════════════════════════════════════════════════════════════
// OpenAI-Compatible Provider
// ═══════════════════════════════════════════════════════════════════════════
//
// Works with:
// - OpenAI (https://api.openai.com/v1)
// - Azure AI Foundry v1 (https://{resource}.openai.azure.com/openai/v1)
// - OpenRouter (https://openrouter.ai/api/v1)
// - Any OpenAI-compatible endpoint
//
// This is the only vendor that serves every capability: chat, embeddings,
// transcription and speech.

use super::sse::{parse_openai_data, token_stream};
use super::{error, ChatRequest, ModelProvider, ProviderError, TokenStream};
use crate::config::{AuthMethod, OpenAiConfig};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    auth_method: AuthMethod,
    api_version: Option<String>,
}

impl OpenAiProvider {
    /// Create a client for an OpenAI-compatible endpoint
    ///
    /// Only the connect phase has a timeout. Streaming answers can take
    /// minutes, so an established request runs until the server or the
    /// transport gives up.
    pub fn new(config: &OpenAiConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {}", e)))?;

        tracing::debug!(
            "Initialized OpenAI-compatible provider: {} (auth: {:?}, key configured: {})",
            config.api_base,
            config.auth_method,
            config.api_key.is_some()
        );

        Ok(Self {
            client,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            auth_method: config.auth_method.clone(),
            api_version: config.api_version.clone(),
        })
    }

    /// Endpoint URL with the optional api-version query parameter (Azure)
    fn url(&self, path: &str) -> String {
        let base = format!("{}/{}", self.base_url, path);
        match &self.api_version {
            Some(version) => format!("{}?api-version={}", base, version),
            None => base,
        }
    }

    /// Authenticated POST request builder
    fn post(&self, path: &str) -> Result<reqwest::RequestBuilder, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured { provider: "openai" })?;

        let req = self.client.post(self.url(path));
        Ok(match self.auth_method {
            AuthMethod::Bearer => req.bearer_auth(api_key),
            AuthMethod::ApiKey => req.header("api-key", api_key),
        })
    }

    /// Send a request and turn non-success statuses into errors
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, ProviderError> {
        let response = req.send().await?;
        if !response.status().is_success() {
            return Err(error::from_response(response).await);
        }
        Ok(response)
    }
}

fn chat_body(request: &ChatRequest, stream: bool) -> serde_json::Value {
    serde_json::json!({
        "model": request.model,
        "messages": request.messages,
        "max_tokens": request.max_tokens,
        "temperature": request.temperature,
        "stream": stream,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Response formats
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete_chat(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let req = self.post("chat/completions")?.json(&chat_body(request, false));
        let body: ChatCompletionResponse = self.send(req).await?.json().await?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| ProviderError::Decode("No choices in chat response".to_string()))
    }

    async fn stream_chat(&self, request: &ChatRequest) -> Result<TokenStream, ProviderError> {
        let req = self
            .post("chat/completions")?
            .header("Accept", "text/event-stream")
            .json(&chat_body(request, true));
        let response = self.send(req).await?;
        Ok(token_stream(response, parse_openai_data))
    }

    async fn embed_text(&self, model: &str, text: &str) -> Result<Vec<f32>, ProviderError> {
        let req = self.post("embeddings")?.json(&serde_json::json!({
            "model": model,
            "input": [text],
        }));
        let body: EmbeddingResponse = self.send(req).await?.json().await?;

        let mut data = body.data;
        data.sort_by_key(|d| d.index);
        data.into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ProviderError::Decode("No embedding returned".to_string()))
    }

    async fn transcribe_audio(
        &self,
        model: &str,
        file_name: &str,
        audio: Vec<u8>,
    ) -> Result<String, ProviderError> {
        let file = reqwest::multipart::Part::bytes(audio).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .text("model", model.to_string())
            .part("file", file);

        let req = self.post("audio/transcriptions")?.multipart(form);
        let body: TranscriptionResponse = self.send(req).await?.json().await?;
        Ok(body.text)
    }

    async fn synthesize_speech(
        &self,
        model: &str,
        voice: &str,
        text: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        let req = self.post("audio/speech")?.json(&serde_json::json!({
            "model": model,
            "voice": voice,
            "input": text,
        }));
        let bytes = self.send(req).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}
