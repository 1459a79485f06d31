//! `/v3/categories`

use reqwest::Method;
use serde_json::json;

use crate::client::{segment, FeedlyClient};
use crate::error::Result;
use crate::models::Category;

impl FeedlyClient {
    /// List the user's categories.
    pub async fn categories(&self) -> Result<Vec<Category>> {
        self.get("/v3/categories", Vec::new()).await
    }

    /// Rename a category. `category` is a label or a qualified id.
    pub async fn category_rename(&self, category: &str, label: &str) -> Result<()> {
        let id = self.category_id(category).await?;
        self.send(
            Method::POST,
            &format!("/v3/categories/{}", segment(&id)),
            Some(json!({ "label": label })),
        )
        .await
    }

    /// Delete a category; its feeds stay subscribed.
    pub async fn category_delete(&self, category: &str) -> Result<()> {
        let id = self.category_id(category).await?;
        self.send(Method::DELETE, &format!("/v3/categories/{}", segment(&id)), None)
            .await
    }
}
