//! Session-fatal errors and their user-facing wording

use super::prompt::TemplateError;
use crate::provider::ProviderError;

/// Shown for every authentication or missing-key failure
pub const INVALID_API_KEY_MESSAGE: &str = "Invalid API key. Check the API key in your settings.";

/// Error signatures that mean the credentials are wrong or absent
const AUTH_SIGNATURES: &[&str] = &[
    "401",
    "Incorrect API key",
    "invalid_api_key",
    "invalid x-api-key",
    "authentication_error",
    "API key not configured",
];

const MODEL_SIGNATURES: &[&str] = &["404", "model_not_found", "does not exist"];

#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    /// The model call failed; the session has been torn down
    #[error("{message}")]
    Model {
        message: String,
        #[source]
        source: ProviderError,
    },

    #[error("session '{0}' is already connecting")]
    AlreadyConnecting(String),

    /// `disconnect` ran while connecting or before a question started
    #[error("session '{0}' was disconnected")]
    Disconnected(String),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl ConversationError {
    /// The provider failure behind a model error
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::Model { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Map a provider failure to the message shown to the user
pub fn translate_error(err: &ProviderError) -> String {
    let raw = err.to_string();
    if AUTH_SIGNATURES.iter().any(|s| raw.contains(s)) {
        INVALID_API_KEY_MESSAGE.to_string()
    } else if MODEL_SIGNATURES.iter().any(|s| raw.contains(s)) {
        format!("The selected model is not available for this API key: {raw}")
    } else {
        format!("The model request failed: {raw}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, message: &str) -> ProviderError {
        ProviderError::Api {
            status,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_auth_failures() {
        for err in [
            api(401, "Unauthorized"),
            api(400, "Incorrect API key provided: sk-..."),
            api(403, "invalid x-api-key (authentication_error)"),
            ProviderError::NotConfigured { provider: "openai" },
        ] {
            assert_eq!(translate_error(&err), INVALID_API_KEY_MESSAGE, "{err}");
        }
    }

    #[test]
    fn test_missing_model() {
        let msg = translate_error(&api(404, "The model `gpt-9` does not exist (model_not_found)"));
        assert!(msg.starts_with("The selected model is not available"));
    }

    #[test]
    fn test_other_failures_keep_detail() {
        let msg = translate_error(&ProviderError::Network("connection reset".to_string()));
        assert_eq!(msg, "The model request failed: network error: connection reset");
    }

    #[test]
    fn test_model_error_displays_translated_message() {
        let source = api(401, "nope");
        let err = ConversationError::Model {
            message: translate_error(&source),
            source,
        };
        assert_eq!(err.to_string(), INVALID_API_KEY_MESSAGE);
        assert!(err.provider_error().is_some());
    }
}
