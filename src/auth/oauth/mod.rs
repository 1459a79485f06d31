//! OAuth authorization-code flow and token lifecycle.
//!
//! [`AuthController`] owns the [`Credentials`] for one client configuration
//! and is the single place other code asks for a usable access token. It
//! decides between returning the stored token, refreshing it, or running the
//! full browser flow:
//!
//! 1. start a [`CallbackServer`] on the configured port
//! 2. send the user's browser to `<base>/v3/auth/auth`
//! 3. wait for the redirect carrying `code` (or `error`)
//! 4. exchange the code at `<base>/v3/auth/token`
//! 5. persist the new credentials through the [`TokenStore`]
//!
//! All state-changing operations hold the credentials lock for their whole
//! duration, so overlapping callers never race into duplicate exchanges.

pub mod callback;
pub mod grant;

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard, OnceCell};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::auth::store::TokenStore;
use crate::auth::tokens::{Credentials, TokenGrant, TokenState};
use crate::auth::traits::{Browser, SystemBrowser, TokenProvider};
use crate::config::{expand_tilde, ClientConfig};
use crate::error::{Error, Result};
use crate::net::{ApiRequest, HttpTransport, Transport};

pub use callback::{CallbackParams, CallbackServer};
pub use grant::{build_authorization_url, TokenRequest};

/// Token lifecycle state machine for one client configuration.
pub struct AuthController {
    config: Arc<ClientConfig>,
    store: TokenStore,
    transport: Arc<dyn Transport>,
    browser: Arc<dyn Browser>,
    credentials: Mutex<Credentials>,
    /// Tokens were handed over in the config; the token file is not read.
    preloaded: bool,
    /// Completed once the token file and consent page have been read.
    startup: OnceCell<Arc<str>>,
}

impl std::fmt::Debug for AuthController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthController")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("preloaded", &self.preloaded)
            .field("started", &self.startup.initialized())
            .finish_non_exhaustive()
    }
}

impl AuthController {
    /// Create a controller using the reqwest transport and the system browser.
    ///
    /// Fails with [`Error::Config`] when the client id or secret is missing.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let transport = HttpTransport::builder()
            .request_timeout(config.request_timeout())
            .build();
        let store = TokenStore::new(config.token_path()?);
        let supplied = Credentials::from_supplied(
            config.access_token.as_deref(),
            config.refresh_token.as_deref(),
            config.access_token_expires,
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            transport: Arc::new(transport),
            browser: Arc::new(SystemBrowser),
            preloaded: supplied.is_some(),
            credentials: Mutex::new(supplied.unwrap_or_default()),
            startup: OnceCell::new(),
        })
    }

    /// Replace the transport used for token-endpoint requests.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Replace the browser launcher.
    pub fn with_browser(mut self, browser: Arc<dyn Browser>) -> Self {
        self.browser = browser;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Run the one-time startup load and return the consent page.
    async fn started(&self) -> Arc<str> {
        self.startup
            .get_or_init(|| async {
                if !self.preloaded {
                    let loaded = self.store.load().await;
                    *self.credentials.lock().await = loaded;
                }
                self.load_consent_page().await
            })
            .await
            .clone()
    }

    async fn load_consent_page(&self) -> Arc<str> {
        if let Some(path) = &self.config.consent_page_file {
            let read = match expand_tilde(path) {
                Ok(path) => tokio::fs::read_to_string(&path).await.map_err(Error::from),
                Err(e) => Err(e),
            };
            match read {
                Ok(html) => return Arc::from(html),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Consent page unreadable; using fallback text"
                    )
                }
            }
        }
        Arc::from(self.config.consent_page_text.as_str())
    }

    /// Lock the credentials after the startup load has completed.
    async fn lock(&self) -> (MutexGuard<'_, Credentials>, Arc<str>) {
        let page = self.started().await;
        (self.credentials.lock().await, page)
    }

    fn classify(&self, credentials: &Credentials) -> TokenState {
        let state = credentials.state(Utc::now(), self.config.refresh_slop());
        debug!(%state, "Classified credentials");
        state
    }

    // =========================================================================
    // Public operations
    // =========================================================================

    /// Return a usable access token.
    ///
    /// A valid token is returned without any request. A token inside the
    /// slop window is refreshed; a refresh failure is returned as-is and does
    /// not fall back to the browser flow. Missing or expired credentials run
    /// the full authorization.
    #[instrument(skip(self))]
    pub async fn valid_access_token(&self) -> Result<String> {
        let (mut credentials, page) = self.lock().await;
        match self.classify(&credentials) {
            TokenState::Valid => current_token(&credentials),
            TokenState::ExpiringSoon => self.refresh_locked(&mut credentials).await,
            TokenState::NoCredentials | TokenState::Expired => {
                self.authorize_locked(&mut credentials, page).await
            }
        }
    }

    /// Run the full browser authorization regardless of the current state.
    #[instrument(skip(self))]
    pub async fn authorize(&self) -> Result<String> {
        let (mut credentials, page) = self.lock().await;
        self.authorize_locked(&mut credentials, page).await
    }

    /// Force a refresh when the current token is usable; otherwise authorize.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<String> {
        let (mut credentials, page) = self.lock().await;
        if self.classify(&credentials).is_usable() {
            self.refresh_locked(&mut credentials).await
        } else {
            self.authorize_locked(&mut credentials, page).await
        }
    }

    /// Revoke the refresh token (best effort) and clear local credentials.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let (mut credentials, _) = self.lock().await;

        let revoke_response = match credentials.refresh_token.clone() {
            Some(refresh_token) => {
                let body = TokenRequest::revoke(&self.config, &refresh_token).to_value();
                match self.post_token(body).await {
                    Ok(value) => TokenGrant::from_value(value)
                        .inspect_err(|e| warn!(error = %e, "Ignoring unreadable revoke response"))
                        .ok(),
                    Err(e) => {
                        warn!(
                            error = %e,
                            "Token revocation failed; clearing local credentials anyway"
                        );
                        None
                    }
                }
            }
            None => None,
        };

        *credentials = Credentials::cleared(revoke_response);
        self.store.save(&credentials).await?;
        info!("Logged out");
        Ok(())
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> TokenState {
        let (credentials, _) = self.lock().await;
        self.classify(&credentials)
    }

    /// Snapshot of the current credentials.
    pub async fn credentials(&self) -> Credentials {
        self.lock().await.0.clone()
    }

    /// Id of the authenticated user, if known.
    pub async fn user_id(&self) -> Option<String> {
        self.lock().await.0.user_id.clone()
    }

    /// Body served to the browser on the OAuth redirect.
    pub async fn consent_page(&self) -> String {
        self.started().await.to_string()
    }

    // =========================================================================
    // Flows (credentials lock held)
    // =========================================================================

    async fn authorize_locked(
        &self,
        credentials: &mut Credentials,
        page: Arc<str>,
    ) -> Result<String> {
        let server = CallbackServer::start(self.config.callback_port, page).await?;
        let redirect_uri = server.redirect_uri();
        let state = Uuid::new_v4().to_string();
        let url = build_authorization_url(&self.config, &redirect_uri, &state);

        info!(redirect_uri = %redirect_uri, "Waiting for browser authorization");
        if let Err(e) = self.browser.open(&url) {
            warn!(error = %e, url = %url, "Could not open the authorization URL; open it manually");
        }

        let params = server.wait(self.config.callback_timeout()).await?;

        if let Some(error) = params.error() {
            warn!(
                error = %error,
                description = params.error_description().unwrap_or(""),
                "Authorization refused"
            );
            return Err(Error::Auth(error.to_string()));
        }
        if params.state() != Some(state.as_str()) {
            warn!("OAuth state mismatch on redirect");
            return Err(Error::Auth("state mismatch in authorization redirect".into()));
        }
        let code = params
            .code()
            .ok_or_else(|| Error::Auth("authorization redirect carried no code".into()))?;

        let body = TokenRequest::authorization_code(&self.config, code, &redirect_uri).to_value();
        let token = self.exchange(credentials, body).await?;
        info!(user_id = credentials.user_id.as_deref().unwrap_or(""), "Authorized");
        Ok(token)
    }

    async fn refresh_locked(&self, credentials: &mut Credentials) -> Result<String> {
        let refresh_token = credentials
            .refresh_token
            .clone()
            .ok_or_else(|| Error::Auth("no refresh token available".into()))?;

        let body = TokenRequest::refresh(&self.config, &refresh_token).to_value();
        let token = self.exchange(credentials, body).await?;
        info!(expires_at = ?credentials.expires_at, "Access token refreshed");
        Ok(token)
    }

    /// POST a grant, then save and commit the merged credentials.
    ///
    /// `credentials` is only replaced once the new state is on disk.
    async fn exchange(&self, credentials: &mut Credentials, body: Value) -> Result<String> {
        let value = self.post_token(body).await.map_err(|e| match e {
            Error::Transport { status, body } => {
                Error::Auth(format!("token endpoint returned {status}: {body}"))
            }
            other => Error::Auth(format!("token request failed: {other}")),
        })?;
        let grant = TokenGrant::from_value(value)
            .map_err(|e| Error::Auth(format!("unreadable token response: {e}")))?;

        let next = credentials.with_grant(grant, Utc::now())?;
        self.store.save(&next).await?;
        *credentials = next;
        current_token(credentials)
    }

    async fn post_token(&self, body: Value) -> Result<Value> {
        let request = ApiRequest::post(grant::token_url(&self.config)).with_body(body);
        self.transport.send(request).await
    }
}

fn current_token(credentials: &Credentials) -> Result<String> {
    credentials
        .access_token
        .clone()
        .ok_or_else(|| Error::Auth("no access token available".into()))
}

#[async_trait::async_trait]
impl TokenProvider for AuthController {
    async fn access_token(&self) -> Result<String> {
        self.valid_access_token().await
    }

    async fn user_id(&self) -> Option<String> {
        AuthController::user_id(self).await
    }
}
