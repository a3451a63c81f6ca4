//! Config serialization to TOML
//!
//! Single source of truth for config file format. API keys are never written.

use super::Config;
use std::path::Path;

/// Quote a string as a TOML basic string (escapes quotes, backslashes, newlines)
fn quote(s: &str) -> String {
    toml::Value::String(s.to_string()).to_string()
}

fn quote_path(p: &Path) -> String {
    quote(&p.display().to_string())
}

impl Config {
    /// Serialize config to TOML string (single source of truth for format)
    pub fn to_toml(&self) -> String {
        let api_version = match &self.openai.api_version {
            Some(v) => format!("api_version = {}\n", quote(v)),
            None => "# api_version = \"2024-10-21\"   # Azure AI Foundry only\n".to_string(),
        };

        format!(
            r#"# vaultmind configuration
#
# API keys are read from the environment, never from this file:
#   OPENAI_API_KEY (or VAULTMIND_OPENAI_API_KEY), ANTHROPIC_API_KEY

# Root directory of the Markdown note vault
vault_dir = {vault_dir}

# Vector store file used by `index` and `search`
store_path = {store_path}

# ─────────────────────────────────────────────────────────────────────────────
# CONVERSATION
# ─────────────────────────────────────────────────────────────────────────────
# Models starting with "claude" are sent to Anthropic, everything else to the
# OpenAI-compatible endpoint below.
[chat]
model = {chat_model}
history_window = {history_window}        # exchanges kept as memory (min 1)
max_tokens = {max_tokens}
temperature = {temperature:?}
cost_notice_threshold = {cost_threshold:?}  # USD; notify when an answer costs more
system_context = {system_context}

# ─────────────────────────────────────────────────────────────────────────────
# SEMANTIC SEARCH EMBEDDINGS
# ─────────────────────────────────────────────────────────────────────────────
[embeddings]
model = {embed_model}
max_content_length = {embed_max_content}   # bytes of note body sent for embedding
search_results = {search_results}

[speech]
transcription_model = {transcription_model}
speech_model = {speech_model}
voice = {voice}

# ─────────────────────────────────────────────────────────────────────────────
# ENDPOINTS
# ─────────────────────────────────────────────────────────────────────────────
# OpenAI-compatible endpoint (OpenAI, Azure v1, OpenRouter, local servers)
[openai]
api_base = {openai_base}
auth_method = "{auth_method}"   # bearer, api-key (Azure)
{api_version}timeout_secs = {openai_timeout}      # connect timeout

[anthropic]
api_base = {anthropic_base}
timeout_secs = {anthropic_timeout}

# Logging configuration (RUST_LOG env var overrides)
[logging]
level = {log_level}
# JSON file logging (in addition to stderr)
file_enabled = {log_file_enabled}
file_dir = {log_file_dir}
file_rotation = "{log_file_rotation}"  # hourly, daily, never
file_prefix = {log_file_prefix}
"#,
            vault_dir = quote_path(&self.vault_dir),
            store_path = quote_path(&self.store_path),
            chat_model = quote(&self.chat.model),
            history_window = self.chat.history_window,
            max_tokens = self.chat.max_tokens,
            temperature = self.chat.temperature,
            cost_threshold = self.chat.cost_notice_threshold,
            system_context = quote(&self.chat.system_context),
            embed_model = quote(&self.embeddings.model),
            embed_max_content = self.embeddings.max_content_length,
            search_results = self.embeddings.search_results,
            transcription_model = quote(&self.speech.transcription_model),
            speech_model = quote(&self.speech.speech_model),
            voice = quote(&self.speech.voice),
            openai_base = quote(&self.openai.api_base),
            auth_method = self.openai.auth_method.as_str(),
            api_version = api_version,
            openai_timeout = self.openai.timeout_secs,
            anthropic_base = quote(&self.anthropic.api_base),
            anthropic_timeout = self.anthropic.timeout_secs,
            log_level = quote(&self.logging.level),
            log_file_enabled = self.logging.file_enabled,
            log_file_dir = quote_path(&self.logging.file_dir),
            log_file_rotation = self.logging.file_rotation.as_str(),
            log_file_prefix = quote(&self.logging.file_prefix),
        )
    }
}
