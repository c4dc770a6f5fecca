//! Error types for call-core operations.

use std::path::PathBuf;

use crate::popup::PopupState;

/// All errors that can occur in call-core operations.
///
/// Lookup misses (broadcasting to a call nobody registered, reading a state that
/// was never set) are not errors and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Home directory not found; cannot resolve storage root")]
    HomeDirNotFound,

    #[error("Configuration write failed: {path}: {details}")]
    ConfigWriteFailed { path: PathBuf, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Collaborator Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Locale bundle {bundle} failed to load: {details}")]
    LocaleLoad { bundle: String, details: String },

    #[error("Render failed: {0}")]
    Render(String),

    // ─────────────────────────────────────────────────────────────────────
    // Popup Lifecycle Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Popup for call {call_id} already resolved as {state}")]
    PopupResolved { call_id: String, state: PopupState },

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CallError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        CallError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        CallError::Json {
            context: context.into(),
            source,
        }
    }
}

/// Convenience type alias for Results using CallError.
pub type Result<T> = std::result::Result<T, CallError>;

impl From<CallError> for String {
    fn from(err: CallError) -> String {
        err.to_string()
    }
}
