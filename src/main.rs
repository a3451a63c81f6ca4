// vaultmind - AI chat and semantic search over a vault of Markdown notes
//
// The binary is a thin host around the library:
// - Config: layered env > ~/.config/vaultmind/config.toml > defaults
// - Logging: tracing to stderr, optional rolling JSON files
// - Runtime: single-threaded tokio; network calls are the only suspension points
// - Commands: see cli.rs

mod cli;

use anyhow::Result;
use clap::Parser;
use vaultmind::config::{Config, ConfigError};
use vaultmind::logging;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            print_config_error(&e);
            std::process::exit(1);
        }
    };

    // The guard must be kept alive for the duration of the program to ensure logs flush
    let _file_guard = logging::init(&config.logging);
    tracing::debug!(
        vault = %config.vault_dir.display(),
        store = %config.store_path.display(),
        "Starting vaultmind {}",
        vaultmind::config::VERSION
    );

    cli::run(cli.command, config).await
}

/// A broken config file is fatal; say exactly which file and why
fn print_config_error(err: &ConfigError) {
    eprintln!("╭─ vaultmind: configuration error ─────────────────────");
    for line in err.to_string().lines() {
        eprintln!("│ {}", line);
    }
    eprintln!("│");
    eprintln!("│ Fix the file or regenerate it with `vaultmind config --reset`.");
    eprintln!("╰──────────────────────────────────────────────────────");
}
