use crate::storage::note::Note;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// File name of the durable slot inside the data directory.
pub const STORAGE_FILE: &str = "notes.json";

/// Data directory: `$JOTTER_DATA`, else `~/.jotter`.
pub fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("JOTTER_DATA") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".jotter")
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access note storage")]
    Io(#[from] io::Error),

    #[error("failed to serialize notes")]
    Serialize(#[from] serde_json::Error),
}

/// Persistence adapter for the note collection. `load` and `save` operate on
/// a single durable slot holding the full collection; implementations carry
/// no business logic.
pub trait NoteStorage {
    /// Read the slot. `Ok(None)` means no usable prior data: the slot is
    /// absent, or its contents failed to parse (a recoverable condition the
    /// caller handles by reseeding, never a crash).
    fn load(&self) -> Result<Option<Vec<Note>>, StorageError>;

    /// Serialize `notes` and overwrite the slot.
    fn save(&mut self, notes: &[Note]) -> Result<(), StorageError>;
}

/// Pretty-printed JSON snapshot of `notes`, for export. No side effects.
pub fn export_json(notes: &[Note]) -> Result<String, StorageError> {
    Ok(serde_json::to_string_pretty(notes)?)
}

/// File-backed storage: one JSON file under a data directory.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        FileStorage {
            path: data_dir.as_ref().join(STORAGE_FILE),
        }
    }
}

impl NoteStorage for FileStorage {
    fn load(&self) -> Result<Option<Vec<Note>>, StorageError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&contents) {
            Ok(notes) => Ok(Some(notes)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "stored notes are unreadable, falling back to defaults");
                Ok(None)
            }
        }
    }

    fn save(&mut self, notes: &[Note]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(notes)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

/// In-memory storage for tests: same contract as [`FileStorage`], slot held
/// as a string so malformed contents can be staged too.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStorage {
    slot: Option<String>,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }

    /// Start with raw bytes already in the slot, valid JSON or not.
    pub fn with_contents(contents: impl Into<String>) -> Self {
        MemoryStorage {
            slot: Some(contents.into()),
        }
    }
}

#[cfg(test)]
impl NoteStorage for MemoryStorage {
    fn load(&self) -> Result<Option<Vec<Note>>, StorageError> {
        let Some(contents) = &self.slot else {
            return Ok(None);
        };
        match serde_json::from_str(contents) {
            Ok(notes) => Ok(Some(notes)),
            Err(e) => {
                warn!(error = %e, "stored notes are unreadable, falling back to defaults");
                Ok(None)
            }
        }
    }

    fn save(&mut self, notes: &[Note]) -> Result<(), StorageError> {
        self.slot = Some(serde_json::to_string(notes)?);
        Ok(())
    }
}
