//! End-to-end tests of the token lifecycle using wiremock for the API and a
//! scripted browser that plays the user's side of the consent redirect.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use serde_json::{json, Value};
use wiremock::matchers::{any, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feedly::auth::Browser;
use feedly::{ClientConfig, Credentials, Error, FeedlyClient, TokenState};

/// Follows the authorization URL straight to the redirect, appending `reply`
/// (e.g. `code=abc` or `error=access_denied`) and echoing the state unless a
/// forged one is set.
struct ScriptedBrowser {
    reply: &'static str,
    forged_state: Option<&'static str>,
    opened: Mutex<Vec<String>>,
}

impl ScriptedBrowser {
    fn new(reply: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply,
            forged_state: None,
            opened: Mutex::new(Vec::new()),
        })
    }

    fn with_forged_state(reply: &'static str, state: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply,
            forged_state: Some(state),
            opened: Mutex::new(Vec::new()),
        })
    }

    fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl Browser for ScriptedBrowser {
    fn open(&self, url: &str) -> feedly::Result<()> {
        self.opened.lock().unwrap().push(url.to_string());

        let parsed = url::Url::parse(url).map_err(|e| Error::Config(e.to_string()))?;
        let param = |name: &str| {
            parsed
                .query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
                .unwrap_or_default()
        };
        let redirect = param("redirect_uri");
        let state = self.forged_state.map_or_else(|| param("state"), str::to_string);
        let target = format!("{redirect}/?{}&state={state}", self.reply);

        tokio::spawn(async move {
            let _ = reqwest::get(target).await;
        });
        Ok(())
    }
}

fn config(server: &MockServer, token_file: Option<&Path>) -> ClientConfig {
    ClientConfig::new("client-x", "secret-y")
        .with_base_url(server.uri())
        .with_token_file(token_file.map(Path::to_path_buf))
        .with_callback_timeout(Some(Duration::from_secs(10)))
}

fn write_tokens(path: &Path, access: &str, expires_in: TimeDelta) {
    let body = json!({
        "access_token": access,
        "refresh_token": "refresh-1",
        "expires": (Utc::now() + expires_in).timestamp_millis(),
        "id": "user-1"
    });
    std::fs::write(path, body.to_string()).unwrap();
}

fn read_file(path: &PathBuf) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_full_authorization_persists_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/token"))
        .and(body_partial_json(json!({
            "grant_type": "authorization_code",
            "code": "the-code",
            "client_id": "client-x",
            "client_secret": "secret-y"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3600,
            "id": "user-1",
            "token_type": "Bearer",
            "plan": "standard"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/profile"))
        .and(header("authorization", "OAuth access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user-1",
            "email": "ada@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("feedly.json");
    let browser = ScriptedBrowser::new("code=the-code");
    let client = FeedlyClient::builder(config(&server, Some(token_file.as_path())))
        .browser(browser.clone())
        .build()
        .unwrap();

    let before = Utc::now().timestamp_millis();
    let profile = client.profile().await.unwrap();
    let after = Utc::now().timestamp_millis();
    assert_eq!(profile.email.as_deref(), Some("ada@example.com"));

    let opened = browser.opened();
    assert_eq!(opened.len(), 1);
    let expected_prefix = format!(
        "{}/v3/auth/auth?response_type=code&client_id=client-x",
        server.uri()
    );
    assert!(opened[0].starts_with(&expected_prefix));

    let stored = read_file(&token_file);
    assert_eq!(stored["access_token"], "access-1");
    assert_eq!(stored["refresh_token"], "refresh-1");
    assert_eq!(stored["id"], "user-1");
    let expires = stored["expires"].as_i64().unwrap();
    assert!(expires >= before + 3_600_000 && expires <= after + 3_600_000);

    assert_eq!(client.auth().state().await, TokenState::Valid);
    assert_eq!(client.auth().user_id().await.as_deref(), Some("user-1"));
}

#[tokio::test]
async fn test_access_denied_leaves_credentials_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("feedly.json");
    write_tokens(&token_file, "stale", TimeDelta::hours(-1));
    let on_disk = std::fs::read_to_string(&token_file).unwrap();

    let client = FeedlyClient::builder(config(&server, Some(token_file.as_path())))
        .browser(ScriptedBrowser::new("error=access_denied"))
        .build()
        .unwrap();
    let before = client.auth().credentials().await;
    assert_eq!(client.auth().state().await, TokenState::Expired);

    let err = client.auth().valid_access_token().await.unwrap_err();
    match &err {
        Error::Auth(message) => assert_eq!(message, "access_denied"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.requires_reauth());

    assert_eq!(client.auth().credentials().await, before);
    assert_eq!(std::fs::read_to_string(&token_file).unwrap(), on_disk);
}

#[tokio::test]
async fn test_refresh_updates_expiry_and_keeps_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/token"))
        .and(body_partial_json(json!({
            "grant_type": "refresh_token",
            "refresh_token": "refresh-1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("feedly.json");
    write_tokens(&token_file, "old", TimeDelta::minutes(10));

    let client = FeedlyClient::new(config(&server, Some(token_file.as_path()))).unwrap();
    assert_eq!(client.auth().state().await, TokenState::ExpiringSoon);

    let before = Utc::now();
    assert_eq!(client.auth().valid_access_token().await.unwrap(), "new");
    let after = Utc::now();

    let creds = client.auth().credentials().await;
    assert_eq!(creds.access_token.as_deref(), Some("new"));
    assert_eq!(creds.refresh_token.as_deref(), Some("refresh-1"));
    let expires = creds.expires_at.unwrap();
    assert!(expires >= before + TimeDelta::milliseconds(3_600_000));
    assert!(expires <= after + TimeDelta::milliseconds(3_600_000));

    let stored = read_file(&token_file);
    assert_eq!(stored["access_token"], "new");
    assert_eq!(stored["refresh_token"], "refresh-1");
    assert_eq!(stored["expires"].as_i64(), Some(expires.timestamp_millis()));
}

#[tokio::test]
async fn test_manual_refresh_forces_exchange_for_valid_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/token"))
        .and(body_partial_json(json!({"grant_type": "refresh_token"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "forced",
            "refresh_token": "refresh-2",
            "expires_in": 7200
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cfg = config(&server, None).with_tokens(
        "current",
        "refresh-1",
        (Utc::now() + TimeDelta::days(30)).timestamp_millis(),
    );
    let client = FeedlyClient::new(cfg).unwrap();

    assert_eq!(client.auth().refresh().await.unwrap(), "forced");
    let creds = client.auth().credentials().await;
    assert_eq!(creds.refresh_token.as_deref(), Some("refresh-2"));
}

#[tokio::test]
async fn test_manual_refresh_authorizes_when_expired() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/token"))
        .and(body_partial_json(json!({
            "grant_type": "authorization_code",
            "code": "fresh-code"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "reauthorized",
            "refresh_token": "refresh-2",
            "expires_in": 3600,
            "id": "user-1"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/token"))
        .and(body_partial_json(json!({"grant_type": "refresh_token"})))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("feedly.json");
    write_tokens(&token_file, "stale", TimeDelta::hours(-1));

    let browser = ScriptedBrowser::new("code=fresh-code");
    let client = FeedlyClient::builder(config(&server, Some(token_file.as_path())))
        .browser(browser.clone())
        .build()
        .unwrap();
    assert_eq!(client.auth().state().await, TokenState::Expired);

    assert_eq!(client.auth().refresh().await.unwrap(), "reauthorized");
    assert_eq!(browser.opened().len(), 1);
    assert_eq!(read_file(&token_file)["access_token"], "reauthorized");
    assert_eq!(client.auth().state().await, TokenState::Valid);
}

#[tokio::test]
async fn test_state_mismatch_is_rejected_without_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("feedly.json");
    let client = FeedlyClient::builder(config(&server, Some(token_file.as_path())))
        .browser(ScriptedBrowser::with_forged_state("code=stolen", "not-ours"))
        .build()
        .unwrap();

    let err = client.auth().authorize().await.unwrap_err();
    match &err {
        Error::Auth(message) => assert!(message.contains("state mismatch")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(client.auth().credentials().await, Credentials::default());
    assert!(!token_file.exists());
}

#[tokio::test]
async fn test_presupplied_token_makes_no_requests() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let cfg = config(&server, None).with_tokens(
        "supplied",
        "refresh-1",
        (Utc::now() + TimeDelta::days(365)).timestamp_millis(),
    );
    let browser = ScriptedBrowser::new("code=unused");
    let client = FeedlyClient::builder(cfg).browser(browser.clone()).build().unwrap();

    assert_eq!(client.auth().valid_access_token().await.unwrap(), "supplied");
    assert!(browser.opened().is_empty());
}

#[tokio::test]
async fn test_logout_clears_state_when_revoke_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/token"))
        .and(body_partial_json(json!({
            "grant_type": "revoke_token",
            "refresh_token": "refresh-1"
        })))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("feedly.json");
    write_tokens(&token_file, "access", TimeDelta::days(1));

    let client = FeedlyClient::new(config(&server, Some(token_file.as_path()))).unwrap();
    assert_eq!(client.auth().state().await, TokenState::Valid);

    client.auth().logout().await.unwrap();

    assert_eq!(client.auth().credentials().await, Credentials::default());
    assert_eq!(client.auth().state().await, TokenState::NoCredentials);
    assert_eq!(read_file(&token_file), json!({}));
}

#[tokio::test]
async fn test_logout_merges_revoke_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user-1",
            "access_token": "should-not-survive",
            "expires_in": 0
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("feedly.json");
    write_tokens(&token_file, "access", TimeDelta::days(1));

    let client = FeedlyClient::new(config(&server, Some(token_file.as_path()))).unwrap();
    client.auth().logout().await.unwrap();

    let stored = read_file(&token_file);
    assert_eq!(stored, json!({"id": "user-1"}));
}

#[tokio::test]
async fn test_token_endpoint_rejection_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/auth/token"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"errorMessage": "invalid code"})),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("feedly.json");
    let client = FeedlyClient::builder(config(&server, Some(token_file.as_path())))
        .browser(ScriptedBrowser::new("code=bad"))
        .build()
        .unwrap();

    let err = client.auth().authorize().await.unwrap_err();
    match err {
        Error::Auth(message) => assert!(message.contains("invalid code")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(client.auth().credentials().await, Credentials::default());
    assert!(!token_file.exists());
}

#[tokio::test]
async fn test_callback_timeout_surfaces() {
    struct SilentBrowser;
    impl Browser for SilentBrowser {
        fn open(&self, _url: &str) -> feedly::Result<()> {
            Ok(())
        }
    }

    let server = MockServer::start().await;
    let cfg = config(&server, None).with_callback_timeout(Some(Duration::from_secs(1)));
    let client = FeedlyClient::builder(cfg)
        .browser(Arc::new(SilentBrowser))
        .build()
        .unwrap();

    let err = client.auth().authorize().await.unwrap_err();
    assert!(matches!(err, Error::CallbackTimeout(_)));
}
