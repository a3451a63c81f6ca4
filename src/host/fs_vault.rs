// Filesystem vault: a directory tree of Markdown notes
//
// Every `*.md` file below the root is a note. Hidden directories (including
// our own `.vaultmind` data directory) are skipped. Metadata lives in YAML
// front matter inside the note itself.

use super::{metadata_from_text, text_with_metadata, NotePath, Vault, VaultError};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn absolute(&self, note: &Path) -> PathBuf {
        self.root.join(note)
    }

    fn io_error(path: &Path, source: std::io::Error) -> VaultError {
        VaultError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn collect(&self, dir: &Path, notes: &mut Vec<NotePath>) -> Result<(), VaultError> {
        let entries = std::fs::read_dir(dir).map_err(|e| Self::io_error(dir, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| Self::io_error(dir, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| Self::io_error(&path, e))?;
            let hidden = entry.file_name().to_string_lossy().starts_with('.');

            if file_type.is_dir() {
                if !hidden {
                    self.collect(&path, notes)?;
                }
            } else if file_type.is_file() && path.extension().is_some_and(|ext| ext == "md") {
                if let Ok(relative) = path.strip_prefix(&self.root) {
                    notes.push(relative.to_path_buf());
                }
            }
        }
        Ok(())
    }
}

impl Vault for FsVault {
    fn list_notes(&self) -> Result<Vec<NotePath>, VaultError> {
        let mut notes = Vec::new();
        self.collect(&self.root, &mut notes)?;
        notes.sort();
        Ok(notes)
    }

    fn read(&self, note: &Path) -> Result<String, VaultError> {
        let path = self.absolute(note);
        std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => VaultError::NotFound(note.to_path_buf()),
            _ => Self::io_error(&path, e),
        })
    }

    fn write(&self, note: &Path, content: &str) -> Result<(), VaultError> {
        let path = self.absolute(note);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Self::io_error(parent, e))?;
        }
        std::fs::write(&path, content).map_err(|e| Self::io_error(&path, e))
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lists_markdown_recursively_skipping_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("projects/rust")).unwrap();
        std::fs::create_dir_all(root.join(".vaultmind")).unwrap();
        std::fs::create_dir_all(root.join(".obsidian")).unwrap();
        std::fs::write(root.join("inbox.md"), "a").unwrap();
        std::fs::write(root.join("projects/rust/ownership.md"), "b").unwrap();
        std::fs::write(root.join("projects/image.png"), "c").unwrap();
        std::fs::write(root.join(".obsidian/workspace.md"), "d").unwrap();
        std::fs::write(root.join(".vaultmind/notes.md"), "e").unwrap();

        let vault = FsVault::new(root);
        let notes = vault.list_notes().unwrap();
        assert_eq!(
            notes,
            vec![
                PathBuf::from("inbox.md"),
                PathBuf::from("projects/rust/ownership.md")
            ]
        );
    }

    #[test]
    fn test_read_missing_note() {
        let dir = tempfile::tempdir().unwrap();
        let vault = FsVault::new(dir.path());
        assert!(matches!(
            vault.read(Path::new("nope.md")),
            Err(VaultError::NotFound(_))
        ));
    }

    #[test]
    fn test_metadata_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let vault = FsVault::new(dir.path());
        let note = Path::new("daily/2024-05-01.md");
        vault.write(note, "Went climbing.\n").unwrap();

        assert_eq!(vault.get_metadata(note, "id").unwrap(), None);
        vault.set_metadata(note, "id", json!(4)).unwrap();
        assert_eq!(vault.get_metadata(note, "id").unwrap(), Some(json!(4)));

        let content = std::fs::read_to_string(dir.path().join(note)).unwrap();
        assert_eq!(content, "---\nid: 4\n---\nWent climbing.\n");
    }
}
