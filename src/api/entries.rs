//! `/v3/entries` and `/v3/feeds`

use reqwest::Method;
use serde_json::{json, Value};

use crate::client::{segment, FeedlyClient};
use crate::error::Result;
use crate::models::{Entry, Feed};

impl FeedlyClient {
    /// Fetch one entry. The endpoint answers with a list; `None` when empty.
    pub async fn entry(&self, entry_id: &str) -> Result<Option<Entry>> {
        let path = format!("/v3/entries/{}", segment(entry_id));
        let value = self.request_value(Method::GET, &path, Vec::new(), None).await?;
        let entry = match value {
            Value::Array(items) => items
                .into_iter()
                .next()
                .map(serde_json::from_value)
                .transpose()?,
            Value::Null => None,
            other => Some(serde_json::from_value(other)?),
        };
        Ok(entry)
    }

    /// Fetch several entries in one request.
    pub async fn entries(&self, entry_ids: &[&str]) -> Result<Vec<Entry>> {
        self.request(Method::POST, "/v3/entries/.mget", Vec::new(), Some(json!(entry_ids)))
            .await
    }

    /// Create an entry (e.g. a saved web page); returns the new entry ids.
    pub async fn create_entry(&self, entry: Value) -> Result<Vec<String>> {
        self.request(Method::POST, "/v3/entries", Vec::new(), Some(entry)).await
    }

    /// Feed metadata. `feed_id` looks like `feed/http://example.com/rss`.
    pub async fn feed(&self, feed_id: &str) -> Result<Feed> {
        self.get(&format!("/v3/feeds/{}", segment(feed_id)), Vec::new())
            .await
    }

    pub async fn feeds(&self, feed_ids: &[&str]) -> Result<Vec<Feed>> {
        self.request(Method::POST, "/v3/feeds/.mget", Vec::new(), Some(json!(feed_ids)))
            .await
    }
}
