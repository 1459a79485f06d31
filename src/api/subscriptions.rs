//! `/v3/subscriptions`

use reqwest::Method;
use serde_json::{json, Map, Value};

use super::SubscribeOptions;
use crate::client::{segment, FeedlyClient};
use crate::error::Result;
use crate::models::Subscription;

impl FeedlyClient {
    pub async fn subscriptions(&self) -> Result<Vec<Subscription>> {
        self.get("/v3/subscriptions", Vec::new()).await
    }

    /// Subscribe to (or update) a feed. `feed_id` looks like `feed/<url>`.
    pub async fn subscribe(&self, feed_id: &str, options: &SubscribeOptions) -> Result<()> {
        let mut body = Map::new();
        body.insert("id".into(), json!(feed_id));
        if let Some(title) = &options.title {
            body.insert("title".into(), json!(title));
        }
        if !options.categories.is_empty() {
            let mut categories = Vec::with_capacity(options.categories.len());
            for category in &options.categories {
                let id = self.category_id(category).await?;
                let label = id.rsplit('/').next().unwrap_or(category.as_str()).to_string();
                categories.push(json!({ "id": id, "label": label }));
            }
            body.insert("categories".into(), Value::Array(categories));
        }
        self.send(Method::POST, "/v3/subscriptions", Some(Value::Object(body)))
            .await
    }

    pub async fn unsubscribe(&self, feed_id: &str) -> Result<()> {
        self.send(
            Method::DELETE,
            &format!("/v3/subscriptions/{}", segment(feed_id)),
            None,
        )
        .await
    }
}
