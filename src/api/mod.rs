//! REST endpoints, grouped by resource.
//!
//! Each submodule adds methods to [`crate::FeedlyClient`]. Optional request
//! parameters are passed as explicit option structs defined here.

pub mod categories;
pub mod entries;
pub mod markers;
pub mod profile;
pub mod streams;
pub mod subscriptions;
pub mod tags;

use chrono::{DateTime, Utc};

/// Sort order for stream requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ranked {
    Newest,
    Oldest,
}

impl Ranked {
    fn as_str(self) -> &'static str {
        match self {
            Ranked::Newest => "newest",
            Ranked::Oldest => "oldest",
        }
    }
}

/// Options for `stream_ids` and `stream_contents`.
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    /// Page size (the API caps this at 10 000 for ids, 1 000 for contents).
    pub count: Option<u32>,
    pub ranked: Option<Ranked>,
    pub unread_only: Option<bool>,
    pub newer_than: Option<DateTime<Utc>>,
    /// Continuation token from the previous page.
    pub continuation: Option<String>,
}

impl StreamOptions {
    pub(crate) fn to_query(&self, stream_id: &str) -> Vec<(String, String)> {
        let mut q = vec![("streamId".to_string(), stream_id.to_string())];
        if let Some(count) = self.count {
            q.push(("count".into(), count.to_string()));
        }
        if let Some(ranked) = self.ranked {
            q.push(("ranked".into(), ranked.as_str().into()));
        }
        if let Some(unread_only) = self.unread_only {
            q.push(("unreadOnly".into(), unread_only.to_string()));
        }
        if let Some(newer_than) = self.newer_than {
            q.push(("newerThan".into(), newer_than.timestamp_millis().to_string()));
        }
        if let Some(continuation) = &self.continuation {
            q.push(("continuation".into(), continuation.clone()));
        }
        q
    }
}

/// Options for `unread_counts`.
#[derive(Debug, Clone, Default)]
pub struct UnreadCountOptions {
    pub autorefresh: Option<bool>,
    pub newer_than: Option<DateTime<Utc>>,
    /// Restrict counts to one stream.
    pub stream_id: Option<String>,
}

impl UnreadCountOptions {
    pub(crate) fn to_query(&self) -> Vec<(String, String)> {
        let mut q = Vec::new();
        if let Some(autorefresh) = self.autorefresh {
            q.push(("autorefresh".into(), autorefresh.to_string()));
        }
        if let Some(newer_than) = self.newer_than {
            q.push(("newerThan".into(), newer_than.timestamp_millis().to_string()));
        }
        if let Some(stream_id) = &self.stream_id {
            q.push(("streamId".into(), stream_id.clone()));
        }
        q
    }
}

/// Options for `search_feeds`.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub count: Option<u32>,
    /// e.g. `en` or `fr`.
    pub locale: Option<String>,
}

/// Bound for marking whole feeds or categories as read.
///
/// With neither field set, everything up to now is marked.
#[derive(Debug, Clone, Default)]
pub struct MarkOptions {
    pub as_of: Option<DateTime<Utc>>,
    pub last_read_entry_id: Option<String>,
}

/// A subscription request for `subscribe`.
#[derive(Debug, Clone, Default)]
pub struct SubscribeOptions {
    /// Title override.
    pub title: Option<String>,
    /// Category labels or fully qualified category ids.
    pub categories: Vec<String>,
}
