//! Host capability surface
//!
//! Everything the engine needs from the application that owns the notes:
//! reading and writing note text, per-note metadata, change notifications and
//! a way to show a short notice to the user. Hosts implement [`Vault`] and
//! [`Notifier`]; this crate ships a filesystem vault for Markdown folders and
//! an in-memory vault.

pub mod front_matter;
mod fs_vault;
mod memory;

pub use fs_vault::FsVault;
pub use memory::MemoryVault;

use std::path::{Path, PathBuf};

/// Vault-relative path of a note
pub type NotePath = PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("note not found: {}", .0.display())]
    NotFound(NotePath),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no note ids left above {0}")]
    IdSpaceExhausted(u64),

    #[error("bad front matter in {}: {source}", .path.display())]
    FrontMatter {
        path: NotePath,
        #[source]
        source: front_matter::FrontMatterError,
    },
}

/// Note storage provided by the host
pub trait Vault: Send + Sync {
    /// All notes in the vault, in a stable order
    fn list_notes(&self) -> Result<Vec<NotePath>, VaultError>;

    /// Full note text, including any front matter
    fn read(&self, note: &Path) -> Result<String, VaultError>;

    fn write(&self, note: &Path, content: &str) -> Result<(), VaultError>;

    /// One structured-metadata value, `None` when the key is absent
    fn get_metadata(&self, note: &Path, key: &str) -> Result<Option<serde_json::Value>, VaultError>;

    fn set_metadata(
        &self,
        note: &Path,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), VaultError>;
}

/// Change notification delivered by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultEvent {
    Created(NotePath),
    Modified(NotePath),
    Deleted(NotePath),
    Renamed { from: NotePath, to: NotePath },
}

/// User-visible notices (errors, cost warnings)
pub trait Notifier: Send + Sync {
    fn notice(&self, message: &str);
}

/// Notifier that drops every notice
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notice(&self, _message: &str) {}
}

/// Shared metadata helpers for vaults that keep metadata in front matter
pub(crate) fn metadata_from_text(
    note: &Path,
    content: &str,
    key: &str,
) -> Result<Option<serde_json::Value>, VaultError> {
    front_matter::get(content, key).map_err(|source| VaultError::FrontMatter {
        path: note.to_path_buf(),
        source,
    })
}

pub(crate) fn text_with_metadata(
    note: &Path,
    content: &str,
    key: &str,
    value: serde_json::Value,
) -> Result<String, VaultError> {
    front_matter::set(content, key, value).map_err(|source| VaultError::FrontMatter {
        path: note.to_path_buf(),
        source,
    })
}
