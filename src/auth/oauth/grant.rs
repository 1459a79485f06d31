//! Authorization URL and token-endpoint request bodies.
//!
//! All three grants (`authorization_code`, `refresh_token`, `revoke_token`)
//! go to the same endpoint, `POST <base>/v3/auth/token`, with a JSON body.

use serde::Serialize;

use crate::config::ClientConfig;

/// Path of the browser-facing authorization endpoint.
pub const AUTH_PATH: &str = "/v3/auth/auth";

/// Path of the token endpoint.
pub const TOKEN_PATH: &str = "/v3/auth/token";

/// Build the URL the user's browser is sent to.
///
/// # Example
///
/// ```
/// use feedly::ClientConfig;
/// use feedly::auth::oauth::grant::build_authorization_url;
///
/// let config = ClientConfig::new("my-client", "secret");
/// let url = build_authorization_url(&config, "http://localhost:8080", "xyz");
///
/// assert!(url.starts_with("https://cloud.feedly.com/v3/auth/auth?"));
/// assert!(url.contains("response_type=code"));
/// assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080"));
/// ```
pub fn build_authorization_url(config: &ClientConfig, redirect_uri: &str, state: &str) -> String {
    format!(
        "{}{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
        config.base(),
        AUTH_PATH,
        urlencoding::encode(&config.client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(&config.scope),
        urlencoding::encode(state),
    )
}

pub fn token_url(config: &ClientConfig) -> String {
    format!("{}{}", config.base(), TOKEN_PATH)
}

/// JSON body for the token endpoint.
#[derive(Serialize)]
pub struct TokenRequest<'a> {
    pub grant_type: &'static str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<&'a str>,
}

impl<'a> TokenRequest<'a> {
    fn base(config: &'a ClientConfig, grant_type: &'static str) -> Self {
        Self {
            grant_type,
            client_id: &config.client_id,
            client_secret: &config.client_secret,
            code: None,
            refresh_token: None,
            redirect_uri: None,
        }
    }

    pub fn authorization_code(
        config: &'a ClientConfig,
        code: &'a str,
        redirect_uri: &'a str,
    ) -> Self {
        Self {
            code: Some(code),
            redirect_uri: Some(redirect_uri),
            ..Self::base(config, "authorization_code")
        }
    }

    pub fn refresh(config: &'a ClientConfig, refresh_token: &'a str) -> Self {
        Self {
            refresh_token: Some(refresh_token),
            ..Self::base(config, "refresh_token")
        }
    }

    pub fn revoke(config: &'a ClientConfig, refresh_token: &'a str) -> Self {
        Self {
            refresh_token: Some(refresh_token),
            ..Self::base(config, "revoke_token")
        }
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl std::fmt::Debug for TokenRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRequest")
            .field("grant_type", &self.grant_type)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}
