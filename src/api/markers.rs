//! `/v3/markers`: read/unread/saved state.

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Map, Value};

use super::{MarkOptions, UnreadCountOptions};
use crate::client::FeedlyClient;
use crate::error::Result;
use crate::models::{ReadOperations, UnreadCounts};

impl FeedlyClient {
    pub async fn unread_counts(&self, options: &UnreadCountOptions) -> Result<UnreadCounts> {
        self.get("/v3/markers/counts", options.to_query()).await
    }

    /// Read/unread operations since `newer_than` (all recent ones when `None`).
    pub async fn reads(&self, newer_than: Option<chrono::DateTime<Utc>>) -> Result<ReadOperations> {
        let query = newer_than
            .map(|t| vec![("newerThan".to_string(), t.timestamp_millis().to_string())])
            .unwrap_or_default();
        self.get("/v3/markers/reads", query).await
    }

    pub async fn mark_entries_read(&self, entry_ids: &[&str]) -> Result<()> {
        self.mark_entries("markAsRead", entry_ids).await
    }

    pub async fn mark_entries_unread(&self, entry_ids: &[&str]) -> Result<()> {
        self.mark_entries("keepUnread", entry_ids).await
    }

    pub async fn mark_entries_saved(&self, entry_ids: &[&str]) -> Result<()> {
        self.mark_entries("markAsSaved", entry_ids).await
    }

    pub async fn mark_entries_unsaved(&self, entry_ids: &[&str]) -> Result<()> {
        self.mark_entries("markAsUnsaved", entry_ids).await
    }

    pub async fn mark_feeds_read(&self, feed_ids: &[&str], options: &MarkOptions) -> Result<()> {
        let ids = feed_ids.iter().map(|s| s.to_string()).collect();
        let body = mark_bulk_body("feeds", "feedIds", ids, options);
        self.send(Method::POST, "/v3/markers", Some(body)).await
    }

    /// `categories` are labels or qualified ids.
    pub async fn mark_categories_read(
        &self,
        categories: &[&str],
        options: &MarkOptions,
    ) -> Result<()> {
        let ids = self.qualify_all("category", categories).await?;
        let body = mark_bulk_body("categories", "categoryIds", ids, options);
        self.send(Method::POST, "/v3/markers", Some(body)).await
    }

    async fn mark_entries(&self, action: &str, entry_ids: &[&str]) -> Result<()> {
        let body = json!({
            "action": action,
            "type": "entries",
            "entryIds": entry_ids,
        });
        self.send(Method::POST, "/v3/markers", Some(body)).await
    }
}

fn mark_bulk_body(kind: &str, ids_key: &str, ids: Vec<String>, options: &MarkOptions) -> Value {
    let mut body = Map::new();
    body.insert("action".into(), json!("markAsRead"));
    body.insert("type".into(), json!(kind));
    body.insert(ids_key.into(), json!(ids));
    match (&options.last_read_entry_id, options.as_of) {
        (Some(entry_id), _) => {
            body.insert("lastReadEntryId".into(), json!(entry_id));
        }
        (None, as_of) => {
            let as_of = as_of.unwrap_or_else(Utc::now);
            body.insert("asOf".into(), json!(as_of.timestamp_millis()));
        }
    }
    Value::Object(body)
}
