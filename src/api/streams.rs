//! `/v3/streams` and `/v3/search`

use super::{SearchOptions, StreamOptions};
use crate::client::FeedlyClient;
use crate::error::Result;
use crate::models::{FeedSearchResults, StreamContents, StreamIds};

impl FeedlyClient {
    /// Entry ids of a stream (a feed, category or tag id).
    pub async fn stream_ids(&self, stream_id: &str, options: &StreamOptions) -> Result<StreamIds> {
        self.get("/v3/streams/ids", options.to_query(stream_id)).await
    }

    /// Full entries of a stream.
    pub async fn stream_contents(
        &self,
        stream_id: &str,
        options: &StreamOptions,
    ) -> Result<StreamContents> {
        self.get("/v3/streams/contents", options.to_query(stream_id))
            .await
    }

    /// Search feeds by title, URL or `#topic`.
    pub async fn search_feeds(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<FeedSearchResults> {
        let mut q = vec![("query".to_string(), query.to_string())];
        if let Some(count) = options.count {
            q.push(("count".into(), count.to_string()));
        }
        if let Some(locale) = &options.locale {
            q.push(("locale".into(), locale.clone()));
        }
        self.get("/v3/search/feeds", q).await
    }
}
