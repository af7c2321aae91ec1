//! Error handling module for the setup wizard
//!
//! Provides centralized error types using thiserror. Manifest load failures are
//! terminal for a session, persist failures are recoverable, and settings/restart
//! failures never escape the orchestrator (they are only logged).

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the setup wizard
#[derive(Error, Debug)]
pub enum SetupError {
    /// The manifest file does not exist at the expected path
    #[error("manifest not found at {}", path.display())]
    ManifestNotFound { path: PathBuf },

    /// The manifest could not be read or is not a usable JSON document
    #[error("failed to parse manifest {}: {reason}", path.display())]
    ManifestParse { path: PathBuf, reason: String },

    /// The manifest lacks a section the requested mutation needs
    #[error("manifest has no `{section}` section")]
    MissingSection { section: &'static str },

    /// Writing the manifest back to storage failed (in-memory state is kept)
    #[error("failed to persist manifest to {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single project setting could not be applied
    #[error("failed to apply setting {setting}: {reason}")]
    SettingsApply { setting: String, reason: String },

    /// The environment restart could not be requested
    #[error("failed to request restart: {0}")]
    RestartRequest(String),

    /// The host version could not be determined
    #[error("host version unavailable: {0}")]
    HostVersion(String),

    /// Wizard transition or gated action rejected
    #[error("wizard transition error: {0}")]
    Transition(String),

    /// IO errors outside the manifest paths above
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for setup wizard operations
pub type Result<T> = std::result::Result<T, SetupError>;

impl SetupError {
    /// Create a settings application error
    pub fn settings_apply(setting: impl ToString, reason: impl Into<String>) -> Self {
        Self::SettingsApply {
            setting: setting.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a restart request error
    pub fn restart_request(msg: impl Into<String>) -> Self {
        Self::RestartRequest(msg.into())
    }

    /// Returns true for errors that freeze the session (manifest unusable)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ManifestNotFound { .. } | Self::ManifestParse { .. }
        )
    }
}
