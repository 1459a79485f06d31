//! Shared authentication traits.

use tracing::warn;

use crate::error::Result;

/// Trait for providing access tokens.
///
/// This abstracts the source of tokens (e.g. [`super::AuthController`], a
/// static token) from the consumers (e.g. [`crate::FeedlyClient`]).
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Get a currently valid access token, authenticating if necessary.
    async fn access_token(&self) -> Result<String>;

    /// Id of the authenticated user, if known.
    async fn user_id(&self) -> Option<String>;
}

/// Opens the authorization URL for the user.
pub trait Browser: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

/// Launches the platform's default browser.
///
/// A launch failure is not fatal: the URL is logged so the user can open it
/// by hand while the callback listener keeps waiting.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        if let Err(e) = open::that(url) {
            warn!(error = %e, url = %url, "Could not launch a browser; open the URL manually");
        }
        Ok(())
    }
}
