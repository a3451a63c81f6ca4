//! Stable note identity
//!
//! Each note carries an integer `id` in its front matter so vectors survive
//! renames. New ids come from a [`NoteIdAllocator`]: the first allocation
//! scans the vault once for the highest existing id, later allocations just
//! count up from there. The scan is injectable so the policy can be tested
//! without a vault.

use crate::host::{Vault, VaultError};
use std::path::Path;

/// Front matter key holding the note id
pub const ID_KEY: &str = "id";

/// Source of the highest id currently in use
pub trait MaxIdScanner {
    fn scan_max_id(&mut self) -> Result<Option<u64>, VaultError>;
}

impl<F> MaxIdScanner for F
where
    F: FnMut() -> Result<Option<u64>, VaultError>,
{
    fn scan_max_id(&mut self) -> Result<Option<u64>, VaultError> {
        self()
    }
}

/// Hands out ids that are unique for the allocator's lifetime
#[derive(Debug)]
pub struct NoteIdAllocator<S> {
    scanner: S,
    next: Option<u64>,
}

impl<S: MaxIdScanner> NoteIdAllocator<S> {
    pub fn new(scanner: S) -> Self {
        Self {
            scanner,
            next: None,
        }
    }

    /// Next unused id
    ///
    /// The scan runs on the first call only. If it fails nothing is cached
    /// and the next call scans again. Running out of ids is an error, never
    /// a wrap-around.
    pub fn allocate(&mut self) -> Result<u64, VaultError> {
        let id = match self.next {
            Some(next) => next,
            None => {
                let max = self.scanner.scan_max_id()?;
                tracing::debug!(?max, "Scanned vault for highest note id");
                match max {
                    Some(max) => max
                        .checked_add(1)
                        .ok_or(VaultError::IdSpaceExhausted(max))?,
                    None => 1,
                }
            }
        };
        // u64::MAX is never handed out so the counter cannot wrap onto used ids
        self.next = Some(id.checked_add(1).ok_or(VaultError::IdSpaceExhausted(id))?);
        Ok(id)
    }

    /// Whether the vault scan has already happened
    pub fn has_scanned(&self) -> bool {
        self.next.is_some()
    }
}

/// Interpret a front matter `id` value: an integer or a string of digits
pub fn parse_note_id(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Return the note's id, allocating and writing one if it has none
///
/// A value that is not a valid id is replaced.
pub fn assign_note_id<V, S>(
    vault: &V,
    allocator: &mut NoteIdAllocator<S>,
    note: &Path,
) -> Result<u64, VaultError>
where
    V: Vault + ?Sized,
    S: MaxIdScanner,
{
    if let Some(id) = vault.get_metadata(note, ID_KEY)?.as_ref().and_then(parse_note_id) {
        return Ok(id);
    }

    let id = allocator.allocate()?;
    vault.set_metadata(note, ID_KEY, serde_json::Value::from(id))?;
    tracing::debug!(note = %note.display(), id, "Assigned note id");
    Ok(id)
}

/// Scanner that reads the `id` of every note in a vault
#[derive(Debug, Clone)]
pub struct VaultIdScanner<V> {
    vault: V,
}

impl<V: Vault> VaultIdScanner<V> {
    pub fn new(vault: V) -> Self {
        Self { vault }
    }
}

impl<V: Vault> MaxIdScanner for VaultIdScanner<V> {
    fn scan_max_id(&mut self) -> Result<Option<u64>, VaultError> {
        let mut max = None;
        for note in self.vault.list_notes()? {
            let value = match self.vault.get_metadata(&note, ID_KEY) {
                Ok(value) => value,
                // One unreadable header should not block id assignment everywhere
                Err(VaultError::FrontMatter { path, source }) => {
                    tracing::warn!(note = %path.display(), "Skipping note with bad front matter: {}", source);
                    continue;
                }
                Err(e) => return Err(e),
            };
            if let Some(id) = value.as_ref().and_then(parse_note_id) {
                max = max.max(Some(id));
            }
        }
        Ok(max)
    }
}
