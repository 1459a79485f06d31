//! `/v3/tags`
//!
//! Tag arguments are labels (`"later"`) or qualified ids
//! (`"user/<id>/tag/later"`); labels are qualified with the user id.

use reqwest::Method;
use serde_json::json;

use crate::client::{segment, segments, FeedlyClient};
use crate::error::Result;
use crate::models::Tag;

impl FeedlyClient {
    pub async fn tags(&self) -> Result<Vec<Tag>> {
        self.get("/v3/tags", Vec::new()).await
    }

    /// Apply every tag in `tags` to every entry in `entry_ids`.
    pub async fn tag_entries(&self, tags: &[&str], entry_ids: &[&str]) -> Result<()> {
        let ids = self.qualify_all("tag", tags).await?;
        self.send(
            Method::PUT,
            &format!("/v3/tags/{}", segments(&ids)),
            Some(json!({ "entryIds": entry_ids })),
        )
        .await
    }

    pub async fn untag_entries(&self, tags: &[&str], entry_ids: &[&str]) -> Result<()> {
        let ids = self.qualify_all("tag", tags).await?;
        self.send(
            Method::DELETE,
            &format!("/v3/tags/{}/{}", segments(&ids), segments(entry_ids)),
            None,
        )
        .await
    }

    pub async fn tag_rename(&self, tag: &str, label: &str) -> Result<()> {
        let id = self.tag_id(tag).await?;
        self.send(
            Method::POST,
            &format!("/v3/tags/{}", segment(&id)),
            Some(json!({ "label": label })),
        )
        .await
    }

    pub async fn tag_delete(&self, tags: &[&str]) -> Result<()> {
        let ids = self.qualify_all("tag", tags).await?;
        self.send(Method::DELETE, &format!("/v3/tags/{}", segments(&ids)), None)
            .await
    }
}
