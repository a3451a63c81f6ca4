//! Configuration tests
//!
//! These guard the file format: every field `to_toml()` writes must parse back
//! into the same resolved config, and the env layer must win over the file.

use super::*;
use std::collections::HashMap;

fn no_env(_: &str) -> Option<String> {
    None
}

fn parse(toml_str: &str) -> FileConfig {
    toml::from_str(toml_str).unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Round-trip tests
// ─────────────────────────────────────────────────────────────────────────────

/// Verify that serialized config can be parsed back
#[test]
fn test_config_roundtrip_default() {
    let config = Config::default();
    let toml_str = config.to_toml();

    let parsed: Result<FileConfig, _> = toml::from_str(&toml_str);
    assert!(
        parsed.is_ok(),
        "Default config should round-trip.\nTOML:\n{}\nError: {:?}",
        toml_str,
        parsed.err()
    );
    assert_eq!(Config::resolve(parsed.unwrap(), no_env), config);
}

#[test]
fn test_config_roundtrip_customized() {
    let mut config = Config::default();
    config.vault_dir = PathBuf::from("/home/me/notes");
    config.store_path = PathBuf::from("/tmp/vectors.json");
    config.chat.model = "claude-3-5-haiku-latest".to_string();
    config.chat.temperature = 1.0;
    config.chat.system_context = "Answer in \"plain\" words.\nBe brief.".to_string();
    config.openai.auth_method = AuthMethod::ApiKey;
    config.openai.api_version = Some("2024-10-21".to_string());
    config.logging.file_rotation = LogRotation::Hourly;

    let parsed = parse(&config.to_toml());
    assert_eq!(Config::resolve(parsed, no_env), config);
}

#[test]
fn test_api_keys_never_serialized() {
    let mut config = Config::default();
    config.openai.api_key = Some("sk-secret-openai".to_string());
    config.anthropic.api_key = Some("sk-ant-secret".to_string());

    let toml_str = config.to_toml();
    assert!(!toml_str.contains("sk-secret-openai"));
    assert!(!toml_str.contains("sk-ant-secret"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Layering
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_empty_file_gives_defaults() {
    let config = Config::resolve(parse(""), no_env);
    assert_eq!(config, Config::default());
    assert_eq!(
        config.store_path,
        PathBuf::from(".").join(".vaultmind").join("vectors.json")
    );
}

#[test]
fn test_partial_section_keeps_other_defaults() {
    let file = parse(
        r#"
[chat]
model = "gpt-4o"

[embeddings]
search_results = 12
"#,
    );
    let config = Config::resolve(file, no_env);
    assert_eq!(config.chat.model, "gpt-4o");
    assert_eq!(config.chat.history_window, 10);
    assert_eq!(config.embeddings.search_results, 12);
    assert_eq!(config.embeddings.model, "text-embedding-3-small");
}

#[test]
fn test_env_overrides_file() {
    let file = parse(
        r#"
vault_dir = "/from/file"

[chat]
model = "gpt-4o"

[logging]
level = "warn"
"#,
    );
    let env: HashMap<&str, &str> = [
        ("VAULTMIND_VAULT", "/from/env"),
        ("VAULTMIND_CHAT_MODEL", "claude-3-haiku"),
        ("VAULTMIND_EMBEDDING_MODEL", "text-embedding-3-large"),
        ("VAULTMIND_LOG_LEVEL", "debug"),
        ("OPENAI_API_KEY", "sk-openai"),
        ("ANTHROPIC_API_KEY", "sk-ant"),
    ]
    .into_iter()
    .collect();

    let config = Config::resolve(file, |key| env.get(key).map(|v| v.to_string()));
    assert_eq!(config.vault_dir, PathBuf::from("/from/env"));
    // Store path follows the overridden vault
    assert_eq!(config.store_path, default_store_path(Path::new("/from/env")));
    assert_eq!(config.chat.model, "claude-3-haiku");
    assert_eq!(config.embeddings.model, "text-embedding-3-large");
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.openai.api_key.as_deref(), Some("sk-openai"));
    assert_eq!(config.anthropic.api_key.as_deref(), Some("sk-ant"));
}

#[test]
fn test_prefixed_openai_key_wins() {
    let config = Config::resolve(FileConfig::default(), |key| match key {
        "VAULTMIND_OPENAI_API_KEY" => Some("sk-prefixed".to_string()),
        "OPENAI_API_KEY" => Some("sk-plain".to_string()),
        _ => None,
    });
    assert_eq!(config.openai.api_key.as_deref(), Some("sk-prefixed"));
}

#[test]
fn test_blank_api_key_is_ignored() {
    let config = Config::resolve(FileConfig::default(), |key| {
        (key == "OPENAI_API_KEY").then(|| "  ".to_string())
    });
    assert!(config.openai.api_key.is_none());
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_history_window_clamped_to_one() {
    let file = parse("[chat]\nhistory_window = 0\n");
    assert_eq!(Config::resolve(file, no_env).chat.history_window, 1);
}

#[test]
fn test_negative_threshold_falls_back() {
    let file = parse("[chat]\ncost_notice_threshold = -1.0\n");
    assert_eq!(Config::resolve(file, no_env).chat.cost_notice_threshold, 0.01);
}

#[test]
fn test_auth_method_parsing() {
    let file = parse("[openai]\nauth_method = \"api-key\"\n");
    assert_eq!(
        Config::resolve(file, no_env).openai.auth_method,
        AuthMethod::ApiKey
    );
    assert!(toml::from_str::<FileConfig>("[openai]\nauth_method = \"basic\"\n").is_err());
}

#[test]
fn test_unknown_rotation_defaults_to_daily() {
    let file = parse("[logging]\nfile_rotation = \"weekly\"\n");
    assert_eq!(
        Config::resolve(file, no_env).logging.file_rotation,
        LogRotation::Daily
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// File loading
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_missing_file_is_empty_config() {
    let dir = tempfile::tempdir().unwrap();
    let file = Config::load_file_config(Some(&dir.path().join("absent.toml"))).unwrap();
    assert!(file.chat.is_none());
}

#[test]
fn test_broken_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[chat\nmodel = ").unwrap();

    let err = Config::load_file_config(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("config.toml"));
}
