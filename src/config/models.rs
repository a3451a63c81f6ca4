//! Model configuration: chat, embeddings, speech
//!
//! Each section pairs a resolved struct with a `File*` struct whose fields are
//! all optional, so a config file only needs the keys it wants to change.

use serde::Deserialize;

// ─────────────────────────────────────────────────────────────────────────────
// Chat Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Default instruction sent as the system message of every conversation
pub const DEFAULT_SYSTEM_CONTEXT: &str = "You are a helpful assistant inside the user's note vault. \
Answer questions about their notes concisely and say so when you do not know.";

/// Conversation engine settings
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Chat model identifier; `claude*` models are sent to Anthropic
    pub model: String,
    /// Number of recent exchanges kept as conversation memory (at least 1)
    pub history_window: usize,
    /// Maximum tokens per answer
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Estimated answer cost (USD) above which the user is notified
    pub cost_notice_threshold: f64,
    /// Instruction text used as the system message
    pub system_context: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            history_window: 10,
            max_tokens: 1024,
            temperature: 0.7,
            cost_notice_threshold: 0.01,
            system_context: DEFAULT_SYSTEM_CONTEXT.to_string(),
        }
    }
}

/// Chat settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileChatConfig {
    pub model: Option<String>,
    pub history_window: Option<usize>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub cost_notice_threshold: Option<f64>,
    pub system_context: Option<String>,
}

impl ChatConfig {
    /// Create from file config with defaults
    ///
    /// A zero window is raised to 1 and a negative threshold is replaced by
    /// the default.
    pub fn from_file(file: Option<FileChatConfig>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            model: file.model.unwrap_or(defaults.model),
            history_window: file
                .history_window
                .unwrap_or(defaults.history_window)
                .max(1),
            max_tokens: file.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: file.temperature.unwrap_or(defaults.temperature),
            cost_notice_threshold: file
                .cost_notice_threshold
                .filter(|t| *t >= 0.0)
                .unwrap_or(defaults.cost_notice_threshold),
            system_context: file.system_context.unwrap_or(defaults.system_context),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Embeddings Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Embedding configuration for semantic note search
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingsConfig {
    /// Embedding model identifier
    pub model: String,
    /// Maximum note body size (bytes) sent for embedding
    pub max_content_length: usize,
    /// Default number of results for `search`
    pub search_results: usize,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            max_content_length: 8000,
            search_results: 5,
        }
    }
}

/// Embeddings config as loaded from file
#[derive(Debug, Deserialize, Default)]
pub struct FileEmbeddingsConfig {
    pub model: Option<String>,
    pub max_content_length: Option<usize>,
    pub search_results: Option<usize>,
}

impl EmbeddingsConfig {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileEmbeddingsConfig>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            model: file.model.unwrap_or(defaults.model),
            max_content_length: file
                .max_content_length
                .unwrap_or(defaults.max_content_length),
            search_results: file.search_results.unwrap_or(defaults.search_results),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Speech Configuration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechConfig {
    pub transcription_model: String,
    pub speech_model: String,
    pub voice: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            transcription_model: "whisper-1".to_string(),
            speech_model: "tts-1".to_string(),
            voice: "alloy".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileSpeechConfig {
    pub transcription_model: Option<String>,
    pub speech_model: Option<String>,
    pub voice: Option<String>,
}

impl SpeechConfig {
    pub fn from_file(file: Option<FileSpeechConfig>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            transcription_model: file
                .transcription_model
                .unwrap_or(defaults.transcription_model),
            speech_model: file.speech_model.unwrap_or(defaults.speech_model),
            voice: file.voice.unwrap_or(defaults.voice),
        }
    }
}
