//! Semantic note search
//!
//! [`NoteIndexer`] connects a [`Vault`] to the [`VectorStore`]: it gives every
//! note a stable id, embeds note bodies that changed since they were last
//! embedded, and answers "which notes are closest to this text" queries.
//!
//! # Flow
//!
//! ```text
//! VaultEvent ──▶ NoteIndexer::handle_event
//!                    │
//!                    ├──▶ assign_note_id   (front matter `id`)
//!                    ├──▶ VectorStore::has_changed
//!                    ├──▶ ModelProvider::embed_text   (only when changed)
//!                    └──▶ VectorStore::set_vector
//! ```
//!
//! Deleted notes are left in the store. Their vectors stay searchable until
//! `forget` is called with the id.

use crate::config::EmbeddingsConfig;
use crate::host::front_matter;
use crate::host::{NotePath, Vault, VaultError, VaultEvent};
use crate::ids::{assign_note_id, parse_note_id, NoteIdAllocator, VaultIdScanner, ID_KEY};
use crate::provider::{ModelProvider, ProviderError};
use crate::util::truncate_utf8_safe;
use crate::vector::{VectorStore, VectorStoreError};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Store(#[from] VectorStoreError),

    #[error("embedding request failed: {0}")]
    Provider(#[from] ProviderError),
}

/// What indexing a single note did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// A new embedding was computed and stored
    Embedded(u64),
    /// The stored embedding already matches the note body
    Unchanged(u64),
    /// The note has no body text to embed
    Empty(u64),
}

impl IndexOutcome {
    pub fn id(&self) -> u64 {
        match self {
            Self::Embedded(id) | Self::Unchanged(id) | Self::Empty(id) => *id,
        }
    }
}

/// Totals for a full vault pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexSummary {
    pub embedded: usize,
    pub unchanged: usize,
    pub empty: usize,
    /// Notes whose front matter could not be parsed
    pub skipped: usize,
}

/// One search result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub id: u64,
    /// Note currently carrying the id, if any
    pub note: Option<NotePath>,
}

pub struct NoteIndexer<V: Vault + Clone> {
    vault: V,
    provider: Arc<dyn ModelProvider>,
    store: VectorStore,
    allocator: NoteIdAllocator<VaultIdScanner<V>>,
    model: String,
    max_content_length: usize,
}

impl<V: Vault + Clone> NoteIndexer<V> {
    pub fn new(
        vault: V,
        provider: Arc<dyn ModelProvider>,
        store: VectorStore,
        config: &EmbeddingsConfig,
    ) -> Self {
        Self {
            allocator: NoteIdAllocator::new(VaultIdScanner::new(vault.clone())),
            vault,
            provider,
            store,
            model: config.model.clone(),
            max_content_length: config.max_content_length,
        }
    }

    pub fn vault(&self) -> &V {
        &self.vault
    }

    pub fn store_mut(&mut self) -> &mut VectorStore {
        &mut self.store
    }

    /// Bring one note's embedding up to date
    pub async fn index_note(&mut self, note: &Path) -> Result<IndexOutcome, IndexerError> {
        let id = assign_note_id(&self.vault, &mut self.allocator, note)?;
        let content = self.vault.read(note)?;
        let text = truncate_utf8_safe(front_matter::body(&content).trim(), self.max_content_length);

        if text.is_empty() {
            tracing::debug!(note = %note.display(), id, "Skipping empty note");
            return Ok(IndexOutcome::Empty(id));
        }
        if !self.store.has_changed(id, text)? {
            return Ok(IndexOutcome::Unchanged(id));
        }

        let embedding = self.provider.embed_text(&self.model, text).await?;
        self.store.set_vector(id, embedding, text)?;
        tracing::debug!(note = %note.display(), id, bytes = text.len(), "Embedded note");
        Ok(IndexOutcome::Embedded(id))
    }

    /// Index every note in the vault
    ///
    /// Notes with unreadable front matter are skipped; any other failure
    /// stops the pass.
    pub async fn index_all(&mut self) -> Result<IndexSummary, IndexerError> {
        let mut summary = IndexSummary::default();
        for note in self.vault.list_notes()? {
            match self.index_note(&note).await {
                Ok(IndexOutcome::Embedded(_)) => summary.embedded += 1,
                Ok(IndexOutcome::Unchanged(_)) => summary.unchanged += 1,
                Ok(IndexOutcome::Empty(_)) => summary.empty += 1,
                Err(IndexerError::Vault(VaultError::FrontMatter { path, source })) => {
                    tracing::warn!(note = %path.display(), "Skipping note: {}", source);
                    summary.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        tracing::info!(
            embedded = summary.embedded,
            unchanged = summary.unchanged,
            empty = summary.empty,
            skipped = summary.skipped,
            "Indexed vault"
        );
        Ok(summary)
    }

    /// React to a host change notification
    pub async fn handle_event(
        &mut self,
        event: &VaultEvent,
    ) -> Result<Option<IndexOutcome>, IndexerError> {
        match event {
            VaultEvent::Created(note) | VaultEvent::Modified(note) => {
                self.index_note(note).await.map(Some)
            }
            VaultEvent::Renamed { from, to } => {
                tracing::debug!(from = %from.display(), to = %to.display(), "Note renamed");
                self.index_note(to).await.map(Some)
            }
            VaultEvent::Deleted(note) => {
                tracing::debug!(note = %note.display(), "Note deleted, vector kept");
                Ok(None)
            }
        }
    }

    /// The `k` notes closest to `query`, nearest first
    pub async fn search(&mut self, query: &str, k: usize) -> Result<Vec<SearchHit>, IndexerError> {
        let query = truncate_utf8_safe(query.trim(), self.max_content_length);
        if query.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let embedding = self.provider.embed_text(&self.model, query).await?;
        let ids = self.store.search_for_closest_vectors(&embedding, k)?;
        let mut paths = self.paths_by_id()?;
        Ok(ids
            .into_iter()
            .map(|id| SearchHit {
                id,
                note: paths.remove(&id),
            })
            .collect())
    }

    fn paths_by_id(&self) -> Result<HashMap<u64, NotePath>, VaultError> {
        let mut paths = HashMap::new();
        for note in self.vault.list_notes()? {
            match self.vault.get_metadata(&note, ID_KEY) {
                Ok(Some(value)) => {
                    if let Some(id) = parse_note_id(&value) {
                        paths.entry(id).or_insert(note);
                    }
                }
                Ok(None) | Err(VaultError::FrontMatter { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(paths)
    }

    /// Drop the stored vector for `id`
    pub fn forget(&mut self, id: u64) -> Result<bool, IndexerError> {
        Ok(self.store.remove_id(id)?)
    }

    pub fn save(&mut self) -> Result<(), IndexerError> {
        Ok(self.store.save_store()?)
    }
}
