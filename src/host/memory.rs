// In-memory vault for embedding hosts and tests

use super::{metadata_from_text, text_with_metadata, NotePath, Vault, VaultError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Notes held in a map; clones share the same notes
#[derive(Debug, Clone, Default)]
pub struct MemoryVault {
    notes: Arc<Mutex<BTreeMap<NotePath, String>>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a note
    pub fn insert(&self, note: impl Into<PathBuf>, content: impl Into<String>) {
        self.lock().insert(note.into(), content.into());
    }

    pub fn remove(&self, note: &Path) -> Option<String> {
        self.lock().remove(note)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<NotePath, String>> {
        self.notes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Vault for MemoryVault {
    fn list_notes(&self) -> Result<Vec<NotePath>, VaultError> {
        Ok(self.lock().keys().cloned().collect())
    }

    fn read(&self, note: &Path) -> Result<String, VaultError> {
        self.lock()
            .get(note)
            .cloned()
            .ok_or_else(|| VaultError::NotFound(note.to_path_buf()))
    }

    fn write(&self, note: &Path, content: &str) -> Result<(), VaultError> {
        self.insert(note, content);
        Ok(())
    }

    fn get_metadata(&self, note: &Path, key: &str) -> Result<Option<serde_json::Value>, VaultError> {
        let content = self.read(note)?;
        metadata_from_text(note, &content, key)
    }

    fn set_metadata(
        &self,
        note: &Path,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), VaultError> {
        let content = self.read(note)?;
        let updated = text_with_metadata(note, &content, key, value)?;
        self.write(note, &updated)
    }
}
