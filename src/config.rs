use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Environment override tracking
// ---------------------------------------------------------------------------

/// Tracks which configuration settings are overridden by environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    overrides: HashMap<String, String>,
}

impl EnvOverrides {
    /// Check whether a setting key (e.g. "client.base_url") is overridden by an env var.
    pub fn is_overridden(&self, key: &str) -> bool {
        self.overrides.contains_key(key)
    }

    /// Get the env var name that overrides the given setting key.
    pub fn env_var_for(&self, key: &str) -> Option<&str> {
        self.overrides.get(key).map(String::as_str)
    }

    /// Get all overrides as a map of setting key -> env var name.
    pub fn all(&self) -> &HashMap<String, String> {
        &self.overrides
    }

    fn record(&mut self, key: &str, env_var: &str) {
        self.overrides.insert(key.to_string(), env_var.to_string());
    }
}

// ---------------------------------------------------------------------------
// Client configuration
// ---------------------------------------------------------------------------

/// Construction-time settings for [`crate::FeedlyClient`] and
/// [`crate::auth::AuthController`].
///
/// `client_id` and `client_secret` are required; everything else has a
/// default. The struct maps onto the `[client]` table of the TOML config file
/// and also offers a builder-style API:
///
/// ```
/// use feedly::ClientConfig;
///
/// let config = ClientConfig::new("my-id", "my-secret")
///     .with_base_url("https://sandbox7.feedly.com")
///     .with_token_file(None::<std::path::PathBuf>)
///     .with_callback_port(8080);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Port for the OAuth callback listener. 0 lets the OS pick one.
    #[serde(default)]
    pub callback_port: u16,
    /// Where tokens are persisted. `None` (or an empty path) disables persistence.
    #[serde(default = "default_token_file")]
    pub token_file: Option<PathBuf>,
    /// Refresh proactively when the token expires within this many milliseconds.
    #[serde(default = "default_refresh_slop_ms")]
    pub refresh_slop_ms: u64,
    #[serde(default = "default_scope")]
    pub scope: String,
    /// HTML page served to the browser once the redirect arrives.
    #[serde(default)]
    pub consent_page_file: Option<PathBuf>,
    /// Served instead when `consent_page_file` is unset or unreadable.
    #[serde(default = "default_consent_page_text")]
    pub consent_page_text: String,
    /// Give up on the browser after this many seconds. 0 waits forever.
    #[serde(default = "default_callback_timeout_secs")]
    pub callback_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Expiry of the pre-supplied access token, epoch milliseconds.
    #[serde(default)]
    pub access_token_expires: Option<i64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            base_url: default_base_url(),
            callback_port: 0,
            token_file: default_token_file(),
            refresh_slop_ms: default_refresh_slop_ms(),
            scope: default_scope(),
            consent_page_file: None,
            consent_page_text: default_consent_page_text(),
            callback_timeout_secs: default_callback_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            access_token: None,
            refresh_token: None,
            access_token_expires: None,
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"********")
            .field("base_url", &self.base_url)
            .field("callback_port", &self.callback_port)
            .field("token_file", &self.token_file)
            .field("refresh_slop_ms", &self.refresh_slop_ms)
            .field("scope", &self.scope)
            .field("consent_page_file", &self.consent_page_file)
            .field("callback_timeout_secs", &self.callback_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("has_access_token", &self.access_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

impl ClientConfig {
    /// Create a configuration with the required credentials and defaults for
    /// everything else.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_callback_port(mut self, port: u16) -> Self {
        self.callback_port = port;
        self
    }

    pub fn with_token_file<P: Into<PathBuf>>(mut self, path: Option<P>) -> Self {
        self.token_file = path.map(Into::into);
        self
    }

    pub fn with_refresh_slop(mut self, slop: Duration) -> Self {
        self.refresh_slop_ms = u64::try_from(slop.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_consent_page_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.consent_page_file = Some(path.into());
        self
    }

    pub fn with_consent_page_text(mut self, text: impl Into<String>) -> Self {
        self.consent_page_text = text.into();
        self
    }

    /// `None` waits for the browser indefinitely.
    pub fn with_callback_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.callback_timeout_secs = timeout.map(|t| t.as_secs().max(1)).unwrap_or(0);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs();
        self
    }

    /// Seed the client with tokens obtained elsewhere. All three values are
    /// needed for them to be used; the token file is then not read at startup.
    pub fn with_tokens(
        mut self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at_ms: i64,
    ) -> Self {
        self.access_token = Some(access_token.into());
        self.refresh_token = Some(refresh_token.into());
        self.access_token_expires = Some(expires_at_ms);
        self
    }

    /// Fail unless both client credentials are present and the base URL parses.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::Config("client_id is required".to_string()));
        }
        if self.client_secret.trim().is_empty() {
            return Err(Error::Config("client_secret is required".to_string()));
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("Invalid base_url '{}': {}", self.base_url, e)))?;
        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn refresh_slop(&self) -> Duration {
        Duration::from_millis(self.refresh_slop_ms)
    }

    pub fn callback_timeout(&self) -> Option<Duration> {
        match self.callback_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The expanded token file path, or `None` when persistence is disabled.
    pub fn token_path(&self) -> Result<Option<PathBuf>> {
        match &self.token_file {
            Some(path) if !path.as_os_str().is_empty() => expand_tilde(path).map(Some),
            _ => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// File configuration (CLI)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Env var overrides are not serialized to TOML.
    #[serde(skip)]
    pub env_overrides: EnvOverrides,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_base_url() -> String {
    "https://cloud.feedly.com".to_string()
}
fn default_token_file() -> Option<PathBuf> {
    Some(PathBuf::from("~/.feedly"))
}
const fn default_refresh_slop_ms() -> u64 {
    3_600_000
}
fn default_scope() -> String {
    "https://cloud.feedly.com/subscriptions".to_string()
}
fn default_consent_page_text() -> String {
    "No HTML found".to_string()
}
const fn default_callback_timeout_secs() -> u64 {
    300
}
const fn default_request_timeout_secs() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}

// ---------------------------------------------------------------------------
// Config loading and env overrides
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a TOML file, then apply environment variable
    /// overrides. Any setting prefixed with `FEEDLY_` takes precedence over the
    /// file value and is tracked in `env_overrides`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            config
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        let mut ov = EnvOverrides::default();

        macro_rules! env_str {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = val;
                    ov.record($key, $env);
                }
            };
        }
        macro_rules! env_bool {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
                    ov.record($key, $env);
                }
            };
        }
        macro_rules! env_parse {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    if let Ok(parsed) = val.parse() {
                        $field = parsed;
                        ov.record($key, $env);
                    }
                }
            };
        }
        macro_rules! env_opt_path {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = if val.is_empty() { None } else { Some(PathBuf::from(val)) };
                    ov.record($key, $env);
                }
            };
        }

        // -- Client --
        env_str!("client.client_id", "FEEDLY_CLIENT_ID", self.client.client_id);
        env_str!("client.client_secret", "FEEDLY_CLIENT_SECRET", self.client.client_secret);
        env_str!("client.base_url", "FEEDLY_BASE_URL", self.client.base_url);
        env_parse!("client.callback_port", "FEEDLY_CALLBACK_PORT", self.client.callback_port);
        env_opt_path!("client.token_file", "FEEDLY_TOKEN_FILE", self.client.token_file);
        env_parse!(
            "client.refresh_slop_ms",
            "FEEDLY_REFRESH_SLOP_MS",
            self.client.refresh_slop_ms
        );
        env_str!("client.scope", "FEEDLY_SCOPE", self.client.scope);
        env_opt_path!(
            "client.consent_page_file",
            "FEEDLY_CONSENT_PAGE",
            self.client.consent_page_file
        );
        env_parse!(
            "client.callback_timeout_secs",
            "FEEDLY_CALLBACK_TIMEOUT_SECS",
            self.client.callback_timeout_secs
        );

        // -- Logging --
        env_str!("logging.level", "FEEDLY_LOG_LEVEL", self.logging.level);
        env_bool!("logging.json", "FEEDLY_LOG_JSON", self.logging.json);

        self.env_overrides = ov;
    }
}

/// Expand `~` prefix to user's home directory.
pub(crate) fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let path_str = path.to_string_lossy();
    if let Some(rest) = path_str.strip_prefix('~') {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Cannot determine home directory".into()))?;
        if rest.is_empty() {
            Ok(home)
        } else {
            let rest = rest.strip_prefix('/').unwrap_or(rest);
            Ok(home.join(rest))
        }
    } else {
        Ok(path.to_path_buf())
    }
}
