//! reqwest-backed [`Transport`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use tracing::{debug, instrument};

use super::traits::{ApiRequest, Transport};
use crate::error::{Error, Result};

/// Default user agent for the client.
pub const USER_AGENT: &str = concat!("feedly-rs/", env!("CARGO_PKG_VERSION"));

/// Default connection timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP transport with a standard configuration (User-Agent, timeouts).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    inner: Client,
}

impl HttpTransport {
    /// Create a new transport with default settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a new builder.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let mut builder = self.inner.request(request.method, &request.url);
        if let Some(token) = &request.token {
            builder = builder.header(reqwest::header::AUTHORIZATION, format!("OAuth {token}"));
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "Request failed");
            return Err(Error::Transport {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Builder for [`HttpTransport`].
pub struct HttpTransportBuilder {
    builder: ClientBuilder,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self {
            builder: Client::builder()
                .user_agent(USER_AGENT)
                .connect_timeout(CONNECT_TIMEOUT)
                .timeout(REQUEST_TIMEOUT),
        }
    }
}

impl HttpTransportBuilder {
    /// Set request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.builder = self.builder.timeout(timeout);
        self
    }

    /// Build the transport.
    pub fn build(self) -> HttpTransport {
        let inner = match self.builder.build() {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(
                    "Failed to build HTTP client with custom config: {}; using defaults",
                    e
                );
                Client::default()
            }
        };
        HttpTransport { inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_send_attaches_oauth_header_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/streams/ids"))
            .and(header("authorization", "OAuth tok"))
            .and(query_param("streamId", "feed/x"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ids": ["a"]})))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new();
        let request = ApiRequest::get(format!("{}/v3/streams/ids", server.uri()))
            .with_token("tok")
            .with_query(vec![("streamId".into(), "feed/x".into())]);
        let value = transport.send(request).await.unwrap();
        assert_eq!(value["ids"][0], "a");
    }

    #[tokio::test]
    async fn test_send_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/markers"))
            .and(body_json(json!({"action": "markAsRead"})))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let transport = HttpTransport::new();
        let request = ApiRequest::post(format!("{}/v3/markers", server.uri()))
            .with_body(json!({"action": "markAsRead"}));
        let value = transport.send(request).await.unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn test_non_success_embeds_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("{\"errorMessage\":\"nope\"}"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new();
        let err = transport
            .send(ApiRequest::get(format!("{}/v3/profile", server.uri())))
            .await
            .unwrap_err();
        match err {
            Error::Transport { status, body } => {
                assert_eq!(status, 403);
                assert!(body.contains("nope"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_request_timeout_applies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let transport = HttpTransport::builder()
            .request_timeout(Duration::from_millis(100))
            .build();
        let err = transport
            .send(ApiRequest::get(format!("{}/v3/profile", server.uri())))
            .await
            .unwrap_err();
        match err {
            Error::Network(e) => assert!(e.is_timeout()),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
