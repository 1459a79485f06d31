//! `/v3/profile` and `/v3/preferences`

use reqwest::Method;
use serde_json::Value;

use crate::client::FeedlyClient;
use crate::error::Result;
use crate::models::{Preferences, Profile};

impl FeedlyClient {
    pub async fn profile(&self) -> Result<Profile> {
        self.get("/v3/profile", Vec::new()).await
    }

    /// Update profile fields (e.g. `{"givenName": "Ada"}`); returns the new profile.
    pub async fn update_profile(&self, changes: Value) -> Result<Profile> {
        self.request(Method::POST, "/v3/profile", Vec::new(), Some(changes))
            .await
    }

    pub async fn preferences(&self) -> Result<Preferences> {
        self.get("/v3/preferences", Vec::new()).await
    }

    /// Set preferences. A value of `"==DELETE=="` removes the key.
    pub async fn update_preferences(&self, changes: Preferences) -> Result<Preferences> {
        self.request(
            Method::POST,
            "/v3/preferences",
            Vec::new(),
            Some(Value::Object(changes)),
        )
        .await
    }
}
