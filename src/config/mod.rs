//! Configuration for vaultmind
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/vaultmind/config.toml)
//! 3. Built-in defaults (lowest priority)

use serde::Deserialize;
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod models;
mod observability;
mod providers;
mod serialization;

#[cfg(test)]
mod tests;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (maintain public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use models::{
    ChatConfig, EmbeddingsConfig, FileChatConfig, FileEmbeddingsConfig, FileSpeechConfig,
    SpeechConfig,
};
pub use observability::{FileLogging, LogRotation, LoggingConfig};
pub use providers::{
    AnthropicConfig, AuthMethod, FileAnthropicConfig, FileOpenAiConfig, OpenAiConfig,
};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Directory inside the vault that holds vaultmind's own data
pub const DATA_DIR_NAME: &str = ".vaultmind";

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Failure to load the config file
///
/// A missing file is not an error. A file that exists but cannot be read or
/// parsed is, so a broken config fails fast instead of silently falling back
/// to defaults while the user debugs the wrong thing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Root directory of the note vault
    pub vault_dir: PathBuf,

    /// Vector store file (defaults to `<vault_dir>/.vaultmind/vectors.json`)
    pub store_path: PathBuf,

    /// Conversation engine settings
    pub chat: ChatConfig,

    /// Embedding model and indexing limits
    pub embeddings: EmbeddingsConfig,

    /// Transcription and text-to-speech settings
    pub speech: SpeechConfig,

    /// OpenAI-compatible endpoint
    pub openai: OpenAiConfig,

    /// Anthropic endpoint
    pub anthropic: AnthropicConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        let vault_dir = PathBuf::from(".");
        Self {
            store_path: default_store_path(&vault_dir),
            vault_dir,
            chat: ChatConfig::default(),
            embeddings: EmbeddingsConfig::default(),
            speech: SpeechConfig::default(),
            openai: OpenAiConfig::default(),
            anthropic: AnthropicConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Vector store location for a vault
pub fn default_store_path(vault_dir: &Path) -> PathBuf {
    vault_dir.join(DATA_DIR_NAME).join("vectors.json")
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub vault_dir: Option<String>,
    pub store_path: Option<String>,

    /// Optional [chat] section
    pub chat: Option<FileChatConfig>,

    /// Optional [embeddings] section
    pub embeddings: Option<FileEmbeddingsConfig>,

    /// Optional [speech] section
    pub speech: Option<FileSpeechConfig>,

    /// Optional [openai] section
    pub openai: Option<FileOpenAiConfig>,

    /// Optional [anthropic] section
    pub anthropic: Option<FileAnthropicConfig>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: ~/.config/vaultmind/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("vaultmind").join("config.toml"))
    }

    /// Create config file with defaults if it doesn't exist
    /// Called during startup to help users discover configuration options
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        // Don't overwrite existing config
        if path.exists() {
            return;
        }

        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return; // config is optional
            }
        }

        // Use Config::default().to_toml() as single source of truth
        let _ = std::fs::write(&path, Self::default().to_toml());
    }

    /// Overwrite the config file with the default template
    pub fn reset_config_file() -> std::io::Result<Option<PathBuf>> {
        let Some(path) = Self::config_path() else {
            return Ok(None);
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, Self::default().to_toml())?;
        Ok(Some(path))
    }

    /// Read the config file, treating a missing file as empty
    fn load_file_config(path: Option<&Path>) -> Result<FileConfig, ConfigError> {
        let Some(path) = path else {
            return Ok(FileConfig::default());
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Load configuration: env vars > file > defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let file = Self::load_file_config(Self::config_path().as_deref())?;
        Ok(Self::resolve(file, |key| std::env::var(key).ok()))
    }

    /// Merge a parsed file with an environment lookup
    pub(crate) fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        // Vault directory: env > file > default
        let vault_dir = env("VAULTMIND_VAULT")
            .or(file.vault_dir)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        // Store path: env > file > derived from the vault
        let store_path = env("VAULTMIND_STORE")
            .or(file.store_path)
            .map(PathBuf::from)
            .unwrap_or_else(|| default_store_path(&vault_dir));

        let mut chat = ChatConfig::from_file(file.chat);
        if let Some(model) = env("VAULTMIND_CHAT_MODEL") {
            chat.model = model;
        }

        let mut embeddings = EmbeddingsConfig::from_file(file.embeddings);
        if let Some(model) = env("VAULTMIND_EMBEDDING_MODEL") {
            embeddings.model = model;
        }

        let speech = SpeechConfig::from_file(file.speech);

        // API keys come from the environment only
        let openai_key = env("VAULTMIND_OPENAI_API_KEY").or_else(|| env("OPENAI_API_KEY"));
        let openai = OpenAiConfig::from_file(file.openai, openai_key);
        let anthropic = AnthropicConfig::from_file(file.anthropic, env("ANTHROPIC_API_KEY"));

        let mut logging = LoggingConfig::from_file(file.logging);
        if let Some(level) = env("VAULTMIND_LOG_LEVEL") {
            logging.level = level;
        }

        Self {
            vault_dir,
            store_path,
            chat,
            embeddings,
            speech,
            openai,
            anthropic,
            logging,
        }
    }
}
