//! Configuration types and persistence.
//!
//! Handles:
//! - Ring-lock tuning (key prefix, staleness threshold)
//! - Locale bundle addressing
//! - Provider configuration (`provider.json`)

use std::io::Write;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{CallError, Result};
use crate::storage::StorageConfig;

/// Entries older than this are treated as abandoned by a crashed or closed context.
pub const DEFAULT_STALE_AFTER_MS: i64 = 5_000;

pub const DEFAULT_RING_KEY_PREFIX: &str = "call-ring";

pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingLockConfig {
    pub key_prefix: String,
    pub stale_after_ms: i64,
}

impl Default for RingLockConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_RING_KEY_PREFIX.to_string(),
            stale_after_ms: DEFAULT_STALE_AFTER_MS,
        }
    }
}

/// Where localization bundles live and which language to ask for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleConfig {
    pub language: String,
    pub portal_context: String,
    pub rest_context: String,
    pub locale_portlet: String,
    pub button_bundle: String,
    pub admin_bundle: String,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            portal_context: "/portal".to_string(),
            rest_context: "rest".to_string(),
            locale_portlet: "locale.call".to_string(),
            button_bundle: "CallButton".to_string(),
            admin_bundle: "CallAdmin".to_string(),
        }
    }
}

impl LocaleConfig {
    /// The configured language, or `en` when none is set.
    pub fn effective_language(&self) -> &str {
        let trimmed = self.language.trim();
        if trimmed.is_empty() {
            DEFAULT_LANGUAGE
        } else {
            trimmed
        }
    }
}

/// Configuration handed to [`crate::CallUi`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallUiConfig {
    pub ring: RingLockConfig,
    pub locale: LocaleConfig,
}

/// Provider settings editable from the admin dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default)]
    pub log_enabled: bool,
}

/// Loads the provider configuration, returning defaults if the file is missing or corrupt.
pub fn load_provider_config(storage: &StorageConfig) -> ProviderConfig {
    let path = storage.provider_config_file();
    let content = match fs_err::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return ProviderConfig::default(),
    };

    match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Provider configuration unreadable, using defaults"
            );
            ProviderConfig::default()
        }
    }
}

/// Saves the provider configuration (temp file + rename).
pub fn save_provider_config(storage: &StorageConfig, config: &ProviderConfig) -> Result<()> {
    storage.ensure_root()?;
    let path = storage.provider_config_file();
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| CallError::json("serializing provider configuration", e))?;

    let write_failed = |details: String| CallError::ConfigWriteFailed {
        path: path.clone(),
        details,
    };

    let mut temp_file =
        NamedTempFile::new_in(storage.root()).map_err(|e| write_failed(e.to_string()))?;
    temp_file
        .write_all(content.as_bytes())
        .map_err(|e| write_failed(e.to_string()))?;
    temp_file
        .persist(&path)
        .map_err(|e| write_failed(e.error.to_string()))?;

    tracing::info!(log_enabled = config.log_enabled, "Provider configuration saved");
    Ok(())
}
