//! Key/value backends for ring-lock entries.
//!
//! Two implementations:
//!
//! - [`MemoryStore`]: one map per process. Every UI instance in the same process
//!   shares it by holding the same `Arc`.
//! - [`FileStore`]: a JSON file re-read on every access, so separate processes
//!   see each other's writes.
//!
//! # File Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": {
//!     "call-ring-alice": "1704067200000"
//!   }
//! }
//! ```
//!
//! Empty files, corrupt JSON and unknown versions read as an empty store (with a
//! warning). The file is rewritten through temp file + rename so a concurrent
//! reader never sees a partial write. There is no locking between
//! read-modify-write cycles of different processes; last writer wins.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{CallError, Result};

const STORE_VERSION: u32 = 1;

/// A string key/value store visible to every context that should share ring locks.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.remove(key);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    entries: HashMap<String, String>,
}

impl Default for StoreFile {
    fn default() -> Self {
        StoreFile {
            version: STORE_VERSION,
            entries: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileStore {
    file_path: PathBuf,
}

impl FileStore {
    pub fn new(file_path: &Path) -> Self {
        FileStore {
            file_path: file_path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// All entries currently on disk.
    pub fn entries(&self) -> Result<HashMap<String, String>> {
        Ok(self.read_file()?.entries)
    }

    fn read_file(&self) -> Result<StoreFile> {
        if !self.file_path.exists() {
            return Ok(StoreFile::default());
        }

        let content = fs_err::read_to_string(&self.file_path)
            .map_err(|e| CallError::io("reading ring-lock store", e))?;

        if content.trim().is_empty() {
            tracing::warn!(path = %self.file_path.display(), "Empty ring-lock store");
            return Ok(StoreFile::default());
        }

        match serde_json::from_str::<StoreFile>(&content) {
            Ok(file) if file.version == STORE_VERSION => Ok(file),
            Ok(file) => {
                tracing::warn!(
                    version = file.version,
                    expected = STORE_VERSION,
                    "Unsupported ring-lock store version, treating as empty"
                );
                Ok(StoreFile::default())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Corrupt ring-lock store, treating as empty");
                Ok(StoreFile::default())
            }
        }
    }

    fn write_file(&self, file: &StoreFile) -> Result<()> {
        let parent_dir = self.file_path.parent().ok_or_else(|| {
            CallError::io(
                "ring-lock store path has no parent directory",
                std::io::Error::from(std::io::ErrorKind::InvalidInput),
            )
        })?;
        fs_err::create_dir_all(parent_dir)
            .map_err(|e| CallError::io("creating ring-lock store directory", e))?;

        let content = serde_json::to_string_pretty(file)
            .map_err(|e| CallError::json("serializing ring-lock store", e))?;

        let mut temp_file = NamedTempFile::new_in(parent_dir)
            .map_err(|e| CallError::io("creating temp ring-lock store", e))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| CallError::io("writing temp ring-lock store", e))?;
        temp_file
            .flush()
            .map_err(|e| CallError::io("flushing temp ring-lock store", e))?;
        temp_file
            .persist(&self.file_path)
            .map_err(|e| CallError::io("replacing ring-lock store", e.error))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_file()?.entries.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut file = self.read_file()?;
        file.entries.insert(key.to_string(), value.to_string());
        self.write_file(&file)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut file = self.read_file()?;
        if file.entries.remove(key).is_none() {
            return Ok(());
        }
        self.write_file(&file)
    }
}
