//! Storage configuration and path management.
//!
//! `StorageConfig` is the single place that decides where call-core keeps its
//! files: the cross-process ring-lock store, the provider configuration and the
//! CLI log directory.
//!
//! Production code uses [`StorageConfig::new`], which points to `~/.call-ring/`.
//! Tests use [`StorageConfig::with_root`] for isolation.

use std::path::{Path, PathBuf};

use crate::error::{CallError, Result};

const ROOT_DIR_NAME: &str = ".call-ring";

/// Central configuration for all call-core storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    root: PathBuf,
}

impl StorageConfig {
    /// Resolves the default root under the user's home directory.
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir().ok_or(CallError::HomeDirNotFound)?;
        Ok(Self {
            root: home.join(ROOT_DIR_NAME),
        })
    }

    /// Creates a StorageConfig with a custom root directory.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to ring-locks.json (ring-lock entries shared across processes).
    pub fn ring_locks_file(&self) -> PathBuf {
        self.root.join("ring-locks.json")
    }

    /// Path to provider.json (persisted provider configuration).
    pub fn provider_config_file(&self) -> PathBuf {
        self.root.join("provider.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Creates the root directory if it does not exist yet.
    pub fn ensure_root(&self) -> Result<()> {
        fs_err::create_dir_all(&self.root)
            .map_err(|e| CallError::io("creating storage root", e))
    }
}
