//! REST surface tests: paths, query strings, bodies and the auth header.

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feedly::api::{MarkOptions, Ranked, SearchOptions, StreamOptions, SubscribeOptions};
use feedly::{ClientConfig, Error, FeedlyClient};

/// Client whose token file holds a long-lived token for `user-1`.
fn client_for(server: &MockServer, dir: &tempfile::TempDir) -> FeedlyClient {
    let token_file = dir.path().join("feedly.json");
    let body = json!({
        "access_token": "tok",
        "refresh_token": "refresh",
        "expires": (Utc::now() + TimeDelta::days(7)).timestamp_millis(),
        "id": "user-1"
    });
    std::fs::write(&token_file, body.to_string()).unwrap();

    FeedlyClient::new(
        ClientConfig::new("x", "y")
            .with_base_url(server.uri())
            .with_token_file(Some(token_file)),
    )
    .unwrap()
}

#[tokio::test]
async fn test_categories_sends_oauth_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/categories"))
        .and(header("authorization", "OAuth tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "user/user-1/category/tech", "label": "tech"},
            {"id": "user/user-1/category/news", "label": "news", "description": "daily"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let categories = client_for(&server, &dir).categories().await.unwrap();
    assert_eq!(categories.len(), 2);
    assert_eq!(categories[1].description.as_deref(), Some("daily"));
}

#[tokio::test]
async fn test_tag_labels_are_qualified_and_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v3/tags/user%2Fuser-1%2Ftag%2Flater,user%2Fuser-1%2Ftag%2Fgood"))
        .and(body_json(json!({"entryIds": ["e1", "e2"]})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v3/tags/user%2Fuser-1%2Ftag%2Flater/e%2F1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = client_for(&server, &dir);
    client
        .tag_entries(&["later", "user/user-1/tag/good"], &["e1", "e2"])
        .await
        .unwrap();
    client.untag_entries(&["later"], &["e/1"]).await.unwrap();
}

#[tokio::test]
async fn test_unknown_user_id_is_reported() {
    let server = MockServer::start().await;
    let config = ClientConfig::new("x", "y")
        .with_base_url(server.uri())
        .with_token_file(None::<std::path::PathBuf>)
        .with_tokens("tok", "refresh", (Utc::now() + TimeDelta::days(7)).timestamp_millis());
    let client = FeedlyClient::new(config).unwrap();

    let err = client.tag_id("later").await.unwrap_err();
    assert!(matches!(err, Error::MissingUserId));
    assert!(client.tag_id("user/u/tag/later").await.is_ok());
}

#[tokio::test]
async fn test_stream_contents_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/streams/contents"))
        .and(query_param("streamId", "user/user-1/category/global.all"))
        .and(query_param("count", "5"))
        .and(query_param("ranked", "newest"))
        .and(query_param("unreadOnly", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user/user-1/category/global.all",
            "items": [{"id": "e1", "title": "One", "unread": true}],
            "continuation": "next"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = client_for(&server, &dir);
    let stream = client.all_stream().await.unwrap();
    let options = StreamOptions {
        count: Some(5),
        ranked: Some(Ranked::Newest),
        unread_only: Some(true),
        ..Default::default()
    };
    let contents = client.stream_contents(&stream, &options).await.unwrap();
    assert_eq!(contents.items[0].title.as_deref(), Some("One"));
    assert_eq!(contents.continuation.as_deref(), Some("next"));
}

#[tokio::test]
async fn test_markers_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/markers"))
        .and(body_json(json!({
            "action": "markAsSaved",
            "type": "entries",
            "entryIds": ["e1"]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v3/markers"))
        .and(body_json(json!({
            "action": "markAsRead",
            "type": "categories",
            "categoryIds": ["user/user-1/category/tech"],
            "asOf": 1_700_000_000_000i64
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = client_for(&server, &dir);
    client.mark_entries_saved(&["e1"]).await.unwrap();
    client
        .mark_categories_read(
            &["tech"],
            &MarkOptions {
                as_of: DateTime::from_timestamp_millis(1_700_000_000_000),
                last_read_entry_id: None,
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_subscribe_and_unsubscribe() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/subscriptions"))
        .and(body_json(json!({
            "id": "feed/https://blog.example/rss",
            "title": "Example",
            "categories": [{"id": "user/user-1/category/tech", "label": "tech"}]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v3/subscriptions/feed%2Fhttps%3A%2F%2Fblog.example%2Frss"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = client_for(&server, &dir);
    let options = SubscribeOptions {
        title: Some("Example".into()),
        categories: vec!["tech".into()],
    };
    client
        .subscribe("feed/https://blog.example/rss", &options)
        .await
        .unwrap();
    client.unsubscribe("feed/https://blog.example/rss").await.unwrap();
}

#[tokio::test]
async fn test_search_and_entry_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/search/feeds"))
        .and(query_param("query", "rust"))
        .and(query_param("locale", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"feedId": "feed/https://this-week-in-rust.org/rss.xml", "title": "TWiR"}],
            "hint": "rust"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/entries/abc%3D%3D"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": "abc==", "title": "T"}])),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = client_for(&server, &dir);
    let results = client
        .search_feeds(
            "rust",
            &SearchOptions {
                count: None,
                locale: Some("en".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(results.results[0].title.as_deref(), Some("TWiR"));

    let entry = client.entry("abc==").await.unwrap().unwrap();
    assert_eq!(entry.title.as_deref(), Some("T"));
}

#[tokio::test]
async fn test_api_error_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/profile"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let err = client_for(&server, &dir).profile().await.unwrap_err();
    match &err {
        Error::Transport { status, body } => {
            assert_eq!(*status, 401);
            assert_eq!(body, "token expired");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.requires_reauth());
}
