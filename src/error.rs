//! Error types for the feedly client.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The main error type for the feedly client.
#[derive(Debug, Error)]
pub enum Error {
    // ── Configuration ────────────────────────────────────────────────────────
    /// Missing or invalid construction-time setting (e.g. no client secret).
    #[error("Configuration error: {0}")]
    Config(String),

    // ── Authentication ───────────────────────────────────────────────────────
    /// Authorization was denied, or a token exchange/refresh was rejected.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The local callback listener could not bind its port.
    #[error("Failed to bind OAuth callback listener on port {port}: {source}")]
    Bind {
        /// Port that was requested (0 means "any").
        port: u16,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// No redirect arrived at the callback listener in time.
    #[error("Timed out after {0:?} waiting for the OAuth redirect")]
    CallbackTimeout(Duration),

    /// The callback listener stopped before a redirect arrived.
    #[error("OAuth callback listener closed before a redirect arrived")]
    CallbackClosed,

    /// A user-scoped identifier was needed but the profile id is unknown.
    #[error("User id unknown - authenticate before using user-scoped identifiers")]
    MissingUserId,

    // ── Transport ────────────────────────────────────────────────────────────
    /// The API answered with a non-success status.
    #[error("API error {status}: {body}")]
    Transport {
        /// HTTP status code.
        status: u16,
        /// Raw response body, kept for diagnostics.
        body: String,
    },

    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Storage ──────────────────────────────────────────────────────────────
    /// Token file could not be written.
    #[error("Storage I/O error at {path}: {message}")]
    StorageIo {
        /// Path that caused the error.
        path: PathBuf,
        /// Error description.
        message: String,
    },

    /// General I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if the caller should run a fresh authorization.
    #[must_use]
    pub fn requires_reauth(&self) -> bool {
        matches!(
            self,
            Error::Auth(_) | Error::Transport { status: 401, .. } | Error::MissingUserId
        )
    }

    /// Creates a storage I/O error.
    #[must_use]
    pub fn storage_io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::StorageIo {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Convenience type alias.
pub type Result<T> = std::result::Result<T, Error>;
