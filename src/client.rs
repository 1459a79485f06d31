//! Main client entry point.

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::auth::{AuthController, Browser};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::net::{ApiRequest, HttpTransport, Transport};

/// Feedly cloud API client.
///
/// Every call asks the [`AuthController`] for a usable access token first,
/// which may refresh it or run the browser authorization, and then sends the
/// request with `Authorization: OAuth <token>`.
///
/// # Examples
///
/// ```rust,no_run
/// use feedly::{ClientConfig, FeedlyClient};
///
/// # async fn example() -> feedly::Result<()> {
/// let client = FeedlyClient::new(ClientConfig::new("my-client-id", "my-client-secret"))?;
///
/// for category in client.categories().await? {
///     println!("{}", category.label);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct FeedlyClient {
    auth: Arc<AuthController>,
    transport: Arc<dyn Transport>,
    base_url: String,
}

impl std::fmt::Debug for FeedlyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedlyClient")
            .field("base_url", &self.base_url)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl FeedlyClient {
    /// Create a client with the default transport and browser.
    pub fn new(config: ClientConfig) -> Result<Self> {
        FeedlyClientBuilder::new(config).build()
    }

    /// Create a builder for configuring the client.
    pub fn builder(config: ClientConfig) -> FeedlyClientBuilder {
        FeedlyClientBuilder::new(config)
    }

    /// The auth controller backing this client.
    pub fn auth(&self) -> &Arc<AuthController> {
        &self.auth
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send an authenticated request and return the raw JSON body.
    ///
    /// `path` is relative to the base URL (e.g. `/v3/profile`). An empty
    /// response body comes back as [`Value::Null`].
    pub async fn request_value(
        &self,
        method: Method,
        path: &str,
        query: Vec<(String, String)>,
        body: Option<Value>,
    ) -> Result<Value> {
        let token = self.auth.valid_access_token().await?;
        debug!(method = %method, path, "API request");

        let mut request = ApiRequest::new(method, format!("{}{}", self.base_url, path))
            .with_token(token)
            .with_query(query);
        if let Some(body) = body {
            request = request.with_body(body);
        }
        self.transport.send(request).await
    }

    /// Send an authenticated request and deserialize the response.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Vec<(String, String)>,
        body: Option<Value>,
    ) -> Result<T> {
        let value = self.request_value(method, path, query, body).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<T> {
        self.request(Method::GET, path, query, None).await
    }

    /// Send a request whose response body is not needed.
    pub(crate) async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<()> {
        self.request_value(method, path, Vec::new(), body).await?;
        Ok(())
    }

    // =========================================================================
    // User-scoped identifiers
    // =========================================================================

    /// Fully qualified category id for `label`
    /// (`user/<id>/category/<label>`). Ids that already start with `user/`
    /// are returned unchanged.
    pub async fn category_id(&self, label: &str) -> Result<String> {
        self.qualify("category", label).await
    }

    /// Fully qualified tag id for `label` (`user/<id>/tag/<label>`).
    pub async fn tag_id(&self, label: &str) -> Result<String> {
        self.qualify("tag", label).await
    }

    /// Stream of every entry in the user's subscriptions.
    pub async fn all_stream(&self) -> Result<String> {
        self.category_id("global.all").await
    }

    /// Stream of the user's saved entries.
    pub async fn saved_stream(&self) -> Result<String> {
        self.tag_id("global.saved").await
    }

    async fn qualify(&self, kind: &str, label: &str) -> Result<String> {
        if label.starts_with("user/") {
            return Ok(label.to_string());
        }
        let user_id = match self.auth.user_id().await {
            Some(id) => id,
            None => {
                // The id arrives with the token grant.
                self.auth.valid_access_token().await?;
                self.auth.user_id().await.ok_or(Error::MissingUserId)?
            }
        };
        Ok(format!("user/{user_id}/{kind}/{label}"))
    }

    pub(crate) async fn qualify_all(&self, kind: &str, labels: &[&str]) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(labels.len());
        for label in labels {
            ids.push(self.qualify(kind, label).await?);
        }
        Ok(ids)
    }
}

/// Percent-encode one path segment.
pub(crate) fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

/// Percent-encode several ids into one comma-separated path segment.
pub(crate) fn segments<S: AsRef<str>>(ids: &[S]) -> String {
    ids.iter()
        .map(|id| segment(id.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Builder for [`FeedlyClient`].
pub struct FeedlyClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    browser: Option<Arc<dyn Browser>>,
}

impl FeedlyClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            browser: None,
        }
    }

    /// Use a custom transport for both API and token-endpoint requests.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom browser launcher for the authorization flow.
    pub fn browser(mut self, browser: Arc<dyn Browser>) -> Self {
        self.browser = Some(browser);
        self
    }

    /// Build the client. Fails with [`Error::Config`] on invalid settings.
    pub fn build(self) -> Result<FeedlyClient> {
        let base_url = self.config.base().to_string();
        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(
                HttpTransport::builder()
                    .request_timeout(self.config.request_timeout())
                    .build(),
            ),
        };

        let mut auth = AuthController::new(self.config)?.with_transport(transport.clone());
        if let Some(browser) = self.browser {
            auth = auth.with_browser(browser);
        }

        Ok(FeedlyClient {
            auth: Arc::new(auth),
            transport,
            base_url,
        })
    }
}
