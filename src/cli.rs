// CLI module - command-line argument parsing and handlers
//
// Subcommands:
// - ask / chat: stream answers from the conversation engine (Ctrl-C aborts)
// - index / search / forget: maintain and query the note vector store
// - transcribe / speak: speech endpoints
// - config: show, locate or reset the config file

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;
use vaultmind::config::{Config, VERSION};
use vaultmind::conversation::{ConversationSession, QuestionOutcome, SessionRegistry};
use vaultmind::host::{front_matter, FsVault, Notifier, Vault};
use vaultmind::provider::{ModelProvider, Provider};
use vaultmind::search::NoteIndexer;
use vaultmind::util::truncate_utf8_safe;
use vaultmind::vector::VectorStore;

/// Session name used by `ask` and `chat`
const CHAT_SESSION: &str = "cli";

/// Largest note body attached as chat context
const NOTE_CONTEXT_BYTES: usize = 16_000;

/// vaultmind - chat with and search your Markdown notes
#[derive(Parser)]
#[command(name = "vaultmind")]
#[command(version = VERSION)]
#[command(about = "AI chat and semantic search over a vault of Markdown notes", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask one question and stream the answer
    Ask {
        question: String,

        /// Note (relative to the vault) to use as context
        #[arg(long)]
        note: Option<PathBuf>,
    },

    /// Interactive chat; type /reset to start over, /quit to leave
    Chat {
        /// Note (relative to the vault) to use as context
        #[arg(long)]
        note: Option<PathBuf>,
    },

    /// Embed every note that changed since the last run
    Index,

    /// Find the notes closest to a query
    Search {
        query: String,

        /// Number of results (defaults to embeddings.search_results)
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Remove a note id from the vector store
    Forget { id: u64 },

    /// Transcribe an audio file
    Transcribe { file: PathBuf },

    /// Synthesize speech from text
    Speak {
        text: String,

        /// Output file (defaults to speech-<timestamp>.mp3)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,

        /// Reset config file to defaults
        #[arg(long)]
        reset: bool,
    },
}

/// Notices go to stderr so they never mix into a streamed answer
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notice(&self, message: &str) {
        eprintln!("\n[vaultmind] {}", message);
    }
}

pub async fn run(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Ask { question, note } => run_ask(&config, &question, note.as_deref()).await,
        Commands::Chat { note } => run_chat(&config, note.as_deref()).await,
        Commands::Index => run_index(&config).await,
        Commands::Search { query, k } => run_search(&config, &query, k).await,
        Commands::Forget { id } => run_forget(&config, id),
        Commands::Transcribe { file } => run_transcribe(&config, &file).await,
        Commands::Speak { text, out } => run_speak(&config, &text, out).await,
        Commands::Config { show, path, reset } => run_config(&config, show, path, reset),
    }
}

fn provider_for(model: &str, config: &Config) -> Result<Arc<dyn ModelProvider>> {
    let provider = Provider::for_model(model, config)
        .with_context(|| format!("Failed to create client for model {}", model))?;
    Ok(Arc::new(provider))
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat
// ─────────────────────────────────────────────────────────────────────────────

fn chat_registry(config: &Config) -> Result<SessionRegistry> {
    Ok(SessionRegistry::new(
        provider_for(&config.chat.model, config)?,
        (&config.chat).into(),
        Arc::new(StderrNotifier),
    ))
}

/// System context, optionally followed by the body of one note
fn chat_context(config: &Config, note: Option<&Path>) -> Result<String> {
    let base = config.chat.system_context.clone();
    let Some(note) = note else {
        return Ok(base);
    };

    let vault = FsVault::new(&config.vault_dir);
    let content = vault
        .read(note)
        .with_context(|| format!("Failed to read note {}", note.display()))?;
    let body = truncate_utf8_safe(front_matter::body(&content).trim(), NOTE_CONTEXT_BYTES);
    Ok(format!(
        "{}\n\nThe user is looking at the note \"{}\":\n\n{}",
        base,
        note.display(),
        body
    ))
}

/// Stream one answer to stdout; Ctrl-C aborts it, a second Ctrl-C exits
async fn stream_answer(session: &ConversationSession, question: &str) -> Result<()> {
    let mut stdout = std::io::stdout();
    let ask = session.ask_question(
        question,
        |token| {
            let _ = write!(stdout, "{}", token);
            let _ = stdout.flush();
        },
        || eprintln!("\n[aborted]"),
    );
    tokio::pin!(ask);

    let mut aborting = false;
    let outcome = loop {
        tokio::select! {
            outcome = &mut ask => break outcome?,
            _ = tokio::signal::ctrl_c() => {
                if aborting {
                    std::process::exit(130);
                }
                aborting = true;
                session.abort_current_question();
            }
        }
    };

    match outcome {
        QuestionOutcome::Answered(_) => println!(),
        QuestionOutcome::Aborted(_) => {}
        QuestionOutcome::Rejected => eprintln!("A question is already in progress"),
    }
    Ok(())
}

async fn run_ask(config: &Config, question: &str, note: Option<&Path>) -> Result<()> {
    let registry = chat_registry(config)?;
    let session = registry.session(CHAT_SESSION, &chat_context(config, note)?);
    stream_answer(&session, question).await
}

async fn run_chat(config: &Config, note: Option<&Path>) -> Result<()> {
    let registry = chat_registry(config)?;
    let context = chat_context(config, note)?;
    let mut session = registry.session(CHAT_SESSION, &context);

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = LinesStream::new(stdin.lines());

    eprintln!(
        "Chatting with {} (/reset to start over, /quit to leave)",
        config.chat.model
    );
    loop {
        eprint!("> ");
        let _ = std::io::stderr().flush();

        let line = tokio::select! {
            line = lines.next() => line,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };
        let line = line.context("Failed to read from stdin")?;

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                registry.remove(CHAT_SESSION);
                session = registry.session(CHAT_SESSION, &context);
                eprintln!("Conversation reset");
            }
            question => {
                // Session-fatal errors were already shown by the notifier
                if let Err(e) = stream_answer(&session, question).await {
                    tracing::debug!("Question failed: {:#}", e);
                }
            }
        }
    }

    registry.disconnect_all();
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Vector store
// ─────────────────────────────────────────────────────────────────────────────

fn note_indexer(config: &Config) -> Result<NoteIndexer<FsVault>> {
    if !config.vault_dir.is_dir() {
        bail!("Vault directory {} does not exist", config.vault_dir.display());
    }
    Ok(NoteIndexer::new(
        FsVault::new(&config.vault_dir),
        provider_for(&config.embeddings.model, config)?,
        VectorStore::open(&config.store_path),
        &config.embeddings,
    ))
}

async fn run_index(config: &Config) -> Result<()> {
    let mut indexer = note_indexer(config)?;
    let summary = indexer.index_all().await.context("Indexing failed")?;
    indexer.save().context("Failed to save vector store")?;

    println!(
        "Embedded {}, unchanged {}, empty {}, skipped {}",
        summary.embedded, summary.unchanged, summary.empty, summary.skipped
    );
    Ok(())
}

async fn run_search(config: &Config, query: &str, k: Option<usize>) -> Result<()> {
    let mut indexer = note_indexer(config)?;
    let k = k.unwrap_or(config.embeddings.search_results);
    let hits = indexer.search(query, k).await.context("Search failed")?;

    if hits.is_empty() {
        println!("No indexed notes. Run `vaultmind index` first.");
    }
    for hit in hits {
        match hit.note {
            Some(note) => println!("{:>6}  {}", hit.id, note.display()),
            None => println!("{:>6}  (no note carries this id)", hit.id),
        }
    }
    Ok(())
}

fn run_forget(config: &Config, id: u64) -> Result<()> {
    let mut store = VectorStore::open(&config.store_path);
    if store.remove_id(id).context("Failed to load vector store")? {
        store.save_store().context("Failed to save vector store")?;
        println!("Removed note {} from the vector store", id);
    } else {
        println!("Note {} is not in the vector store", id);
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Speech
// ─────────────────────────────────────────────────────────────────────────────

async fn run_transcribe(config: &Config, file: &Path) -> Result<()> {
    let audio = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());

    let model = &config.speech.transcription_model;
    let text = provider_for(model, config)?
        .transcribe_audio(model, &file_name, audio)
        .await
        .context("Transcription failed")?;
    println!("{}", text);
    Ok(())
}

async fn run_speak(config: &Config, text: &str, out: Option<PathBuf>) -> Result<()> {
    let out = out.unwrap_or_else(|| {
        PathBuf::from(format!("speech-{}.mp3", Local::now().format("%Y%m%d-%H%M%S")))
    });

    let model = &config.speech.speech_model;
    let audio = provider_for(model, config)?
        .synthesize_speech(model, &config.speech.voice, text)
        .await
        .context("Speech synthesis failed")?;
    tokio::fs::write(&out, &audio)
        .await
        .with_context(|| format!("Failed to write {}", out.display()))?;

    println!("Wrote {} bytes to {}", audio.len(), out.display());
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

fn run_config(config: &Config, show: bool, path: bool, reset: bool) -> Result<()> {
    if path {
        let path = Config::config_path().context("Could not determine config path")?;
        println!("{}", path.display());
    } else if show {
        println!("# Effective configuration (env > file > defaults)");
        println!(
            "# openai api key: {}",
            if config.openai.api_key.is_some() { "set" } else { "not set" }
        );
        println!(
            "# anthropic api key: {}",
            if config.anthropic.api_key.is_some() { "set" } else { "not set" }
        );
        println!();
        print!("{}", config.to_toml());
    } else if reset {
        let path = Config::reset_config_file()
            .context("Failed to write config file")?
            .context("Could not determine config path")?;
        println!("Config reset to defaults: {}", path.display());
    } else {
        println!("Usage: vaultmind config [--show|--path|--reset]");
        println!();
        println!("Options:");
        println!("  --show    Display effective configuration");
        println!("  --path    Show config file path");
        println!("  --reset   Reset config file to defaults");
    }
    Ok(())
}
