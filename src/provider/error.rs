//! Provider error type

/// Errors returned by model endpoints
///
/// The `Display` text matters beyond logging: the conversation engine
/// recognises authentication failures by matching substrings of it, so the
/// status code and the vendor's message are always part of the rendering.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// No API key was configured for the provider
    #[error("API key not configured for {provider}")]
    NotConfigured { provider: &'static str },

    /// Non-success HTTP status from the endpoint
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Rate limit exceeded (includes retry-after hint)
    #[error("rate limited (429){}", .retry_after_secs.map(|s| format!(", retry after {s} seconds")).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    /// Transport failure before or during a response
    #[error("network error: {0}")]
    Network(String),

    /// Error event delivered inside an otherwise successful stream
    #[error("stream error: {0}")]
    Stream(String),

    /// Response body did not have the expected shape
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The provider has no endpoint for this capability
    #[error("{provider} does not support {capability}")]
    Unsupported {
        provider: &'static str,
        capability: &'static str,
    },
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Build an error from a failed HTTP response
///
/// Vendors wrap the human-readable message in `{"error": {"message": ..}}`;
/// when the body has that shape only the message is kept, otherwise the raw
/// body is used.
pub(crate) async fn from_response(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();

    if status == 429 {
        let retry_after_secs = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        return ProviderError::RateLimited { retry_after_secs };
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    ProviderError::Api {
        status,
        message: error_message(&body),
    }
}

/// Extract `error.message` (plus `error.type`/`error.code` when present)
fn error_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    let Some(error) = json.get("error") else {
        return body.trim().to_string();
    };

    let message = error
        .get("message")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    let kind = error
        .get("code")
        .and_then(|v| v.as_str())
        .or_else(|| error.get("type").and_then(|v| v.as_str()));

    match kind {
        Some(kind) => format!("{} ({})", message, kind),
        None => message.to_string(),
    }
}
