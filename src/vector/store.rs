//! Persisted note vectors
//!
//! File format: a single JSON document
//!
//! ```json
//! {
//!   "version": 1,
//!   "idsToVectors": { "12": "<base64 of little-endian f32 values>" },
//!   "idsToLastModified": { "12": "<sha-256 hex of the embedded text>" }
//! }
//! ```
//!
//! The file is read lazily on first use. Loading replays every vector into
//! the [`NearestNeighborIndex`] before any query is answered, and every later
//! `set_vector` updates both the records and the index.

use super::codec::{content_hash, decode_embedding, encode_embedding, CodecError};
use super::index::{IndexError, NearestNeighborIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Current file format version
pub const STORE_VERSION: u64 = 1;

#[derive(Debug, thiserror::Error)]
pub enum VectorStoreError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid vector store {}: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported vector store version {0}, expected 1 or later")]
    UnsupportedVersion(u64),

    #[error("Corrupt embedding for note {id}: {source}")]
    Embedding {
        id: u64,
        #[source]
        source: CodecError,
    },

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Embedding plus the hash of the text it was computed from
#[derive(Debug, Clone, PartialEq)]
pub struct NoteVectorRecord {
    pub embedding: Vec<f32>,
    pub content_hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreFile {
    version: u64,
    #[serde(default)]
    ids_to_vectors: BTreeMap<u64, String>,
    #[serde(default)]
    ids_to_last_modified: BTreeMap<u64, String>,
}

#[derive(Debug, Default)]
struct Loaded {
    records: BTreeMap<u64, NoteVectorRecord>,
    index: NearestNeighborIndex,
}

/// Owner of the vector file and its in-memory index
///
/// One instance per vault; all mutations go through it.
#[derive(Debug)]
pub struct VectorStore {
    path: PathBuf,
    loaded: Option<Loaded>,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> VectorStoreError {
    let path = path.to_path_buf();
    move |source| VectorStoreError::Io { path, source }
}

impl VectorStore {
    /// Point at a store file without reading it
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            loaded: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Read the file if that has not happened yet
    pub fn ensure_loaded(&mut self) -> Result<(), VectorStoreError> {
        self.state().map(|_| ())
    }

    fn state(&mut self) -> Result<&mut Loaded, VectorStoreError> {
        if self.loaded.is_none() {
            let loaded = Self::load(&self.path)?;
            tracing::info!(
                path = %self.path.display(),
                vectors = loaded.records.len(),
                "Loaded vector store"
            );
            self.loaded = Some(loaded);
        }
        Ok(self.loaded.get_or_insert_with(Loaded::default))
    }

    fn load(path: &Path) -> Result<Loaded, VectorStoreError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No vector store yet, starting empty");
                return Ok(Loaded::default());
            }
            Err(e) => return Err(io_err(path)(e)),
        };

        let file: StoreFile =
            serde_json::from_slice(&bytes).map_err(|source| VectorStoreError::Format {
                path: path.to_path_buf(),
                source,
            })?;
        if file.version < STORE_VERSION {
            return Err(VectorStoreError::UnsupportedVersion(file.version));
        }

        let mut hashes = file.ids_to_last_modified;
        let mut loaded = Loaded::default();
        for (id, encoded) in file.ids_to_vectors {
            let embedding = decode_embedding(&encoded)
                .map_err(|source| VectorStoreError::Embedding { id, source })?;
            loaded.index.insert(id, embedding.clone())?;
            loaded.records.insert(
                id,
                NoteVectorRecord {
                    embedding,
                    // A vector without a hash is treated as stale
                    content_hash: hashes.remove(&id).unwrap_or_default(),
                },
            );
        }
        Ok(loaded)
    }

    /// Store the embedding for `id` together with the hash of `source_text`
    ///
    /// Overwrites any previous record and updates the search index in the
    /// same call. A vector of the wrong dimension is rejected before anything
    /// changes.
    pub fn set_vector(
        &mut self,
        id: u64,
        embedding: Vec<f32>,
        source_text: &str,
    ) -> Result<(), VectorStoreError> {
        let state = self.state()?;
        state.index.insert(id, embedding.clone())?;
        state.records.insert(
            id,
            NoteVectorRecord {
                embedding,
                content_hash: content_hash(source_text),
            },
        );
        Ok(())
    }

    /// True when `id` has no record or was embedded from different text
    pub fn has_changed(&mut self, id: u64, source_text: &str) -> Result<bool, VectorStoreError> {
        let state = self.state()?;
        Ok(match state.records.get(&id) {
            Some(record) => record.content_hash != content_hash(source_text),
            None => true,
        })
    }

    /// Delete the stored vector and hash for `id`
    ///
    /// The search index keeps its copy of the vector, so the id can still be
    /// returned by [`search_for_closest_vectors`](Self::search_for_closest_vectors)
    /// until the store is reloaded.
    pub fn remove_id(&mut self, id: u64) -> Result<bool, VectorStoreError> {
        let state = self.state()?;
        Ok(state.records.remove(&id).is_some())
    }

    /// The `k` ids closest to `query`, nearest first
    pub fn search_for_closest_vectors(
        &mut self,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<u64>, VectorStoreError> {
        let state = self.state()?;
        let neighbors = state.index.search(query, k)?;
        tracing::debug!(k, hits = neighbors.len(), "Vector search");
        Ok(neighbors.into_iter().map(|n| n.id).collect())
    }

    /// Write all records to disk
    ///
    /// Writes a temp file next to the store and renames it over the old one.
    /// Nothing is written when the store was never loaded.
    pub fn save_store(&mut self) -> Result<(), VectorStoreError> {
        let Some(state) = self.loaded.as_ref() else {
            return Ok(());
        };

        let file = StoreFile {
            version: STORE_VERSION,
            ids_to_vectors: state
                .records
                .iter()
                .map(|(id, r)| (*id, encode_embedding(&r.embedding)))
                .collect(),
            ids_to_last_modified: state
                .records
                .iter()
                .map(|(id, r)| (*id, r.content_hash.clone()))
                .collect(),
        };
        // Serializing maps with integer keys and strings cannot fail
        let json = serde_json::to_vec(&file).map_err(|source| VectorStoreError::Format {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err(parent))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        if let Err(e) = std::fs::write(&temp_path, &json) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(io_err(&temp_path)(e));
        }
        std::fs::rename(&temp_path, &self.path).map_err(io_err(&self.path))?;

        tracing::debug!(
            path = %self.path.display(),
            vectors = state.records.len(),
            bytes = json.len(),
            "Saved vector store"
        );
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read-only helpers
    // ─────────────────────────────────────────────────────────────────────────

    pub fn len(&mut self) -> Result<usize, VectorStoreError> {
        Ok(self.state()?.records.len())
    }

    pub fn is_empty(&mut self) -> Result<bool, VectorStoreError> {
        Ok(self.state()?.records.is_empty())
    }

    pub fn contains(&mut self, id: u64) -> Result<bool, VectorStoreError> {
        Ok(self.state()?.records.contains_key(&id))
    }

    pub fn content_hash_of(&mut self, id: u64) -> Result<Option<String>, VectorStoreError> {
        Ok(self
            .state()?
            .records
            .get(&id)
            .map(|r| r.content_hash.clone()))
    }

    pub fn embedding(&mut self, id: u64) -> Result<Option<Vec<f32>>, VectorStoreError> {
        Ok(self.state()?.records.get(&id).map(|r| r.embedding.clone()))
    }

    /// Ids with a stored record, ascending
    pub fn ids(&mut self) -> Result<Vec<u64>, VectorStoreError> {
        Ok(self.state()?.records.keys().copied().collect())
    }
}
