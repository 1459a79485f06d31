//! File-based token storage.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use crate::auth::tokens::Credentials;
use crate::error::{Error, Result};

/// File permissions for token files (Unix only): owner read/write.
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Directory permissions (Unix only): owner read/write/execute.
#[cfg(unix)]
const DIR_MODE: u32 = 0o700;

/// Persists [`Credentials`] as a single JSON file.
///
/// A store built without a path is disabled: `load` returns empty
/// credentials and `save` succeeds without touching the filesystem.
///
/// # Security
/// - File permissions are set to 0600 (owner read/write only) on Unix
/// - Missing parent directories are created with 0700 permissions
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    path: Option<PathBuf>,
}

impl TokenStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// A store that never persists anything.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    /// Read the token file.
    ///
    /// Absent, unreadable, empty or malformed files all mean "never
    /// authenticated" and produce empty credentials.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Credentials {
        let Some(path) = &self.path else {
            return Credentials::default();
        };

        let content = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No token file");
                return Credentials::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read token file");
                return Credentials::default();
            }
        };

        if content.trim().is_empty() {
            return Credentials::default();
        }

        match serde_json::from_str(&content) {
            Ok(credentials) => {
                debug!(path = %path.display(), "Loaded token file");
                credentials
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unparseable token file");
                Credentials::default()
            }
        }
    }

    /// Write the credentials, replacing the previous file.
    ///
    /// The content goes to a sibling temp file created with owner-only
    /// permissions and is then renamed over the target.
    #[instrument(skip(self, credentials))]
    pub async fn save(&self, credentials: &Credentials) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        ensure_parent_dir(path).await?;

        let content = serde_json::to_string_pretty(credentials)?;
        let temp_path = path.with_extension("tmp");

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(FILE_MODE);

        let mut file = options.open(&temp_path).await.map_err(|e| {
            Error::storage_io(&temp_path, format!("failed to create temp file: {e}"))
        })?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| Error::storage_io(&temp_path, format!("failed to write temp file: {e}")))?;
        file.sync_all()
            .await
            .map_err(|e| Error::storage_io(&temp_path, format!("failed to sync temp file: {e}")))?;
        drop(file);

        if let Err(e) = tokio::fs::rename(&temp_path, path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(Error::storage_io(
                path,
                format!("failed to rename {}: {e}", temp_path.display()),
            ));
        }

        debug!(path = %path.display(), "Saved token file");
        Ok(())
    }
}

async fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return Ok(());
    };
    if tokio::fs::try_exists(dir).await.unwrap_or(false) {
        return Ok(());
    }

    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(DIR_MODE);
    builder
        .create(dir)
        .await
        .map_err(|e| Error::storage_io(dir, format!("failed to create token directory: {e}")))
}
