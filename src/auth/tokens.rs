//! Credentials held by the auth controller and their lifecycle classification.
//!
//! [`Credentials`] is also the persisted token file format:
//!
//! ```text
//! { "access_token": "...", "refresh_token": "...", "expires": 1700000000000, "id": "...", ... }
//! ```
//!
//! `expires` is stored as epoch milliseconds. Fields the token endpoint
//! returns that are not modelled here are kept in `extra` so nothing is lost
//! across a save/load cycle.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// OAuth credentials for one client configuration.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// When the access token stops being accepted.
    #[serde(
        rename = "expires",
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<DateTime<Utc>>,

    /// Subject identifier of the authenticated user.
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Any other provider fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at", &self.expires_at)
            .field("user_id", &self.user_id)
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    /// Credentials built from tokens handed over at construction time.
    ///
    /// Returns `None` unless all three values are present.
    pub fn from_supplied(
        access_token: Option<&str>,
        refresh_token: Option<&str>,
        expires_at_ms: Option<i64>,
    ) -> Option<Self> {
        let expires_at = DateTime::from_timestamp_millis(expires_at_ms?)?;
        Some(Self {
            access_token: Some(access_token?.to_string()),
            refresh_token: Some(refresh_token?.to_string()),
            expires_at: Some(expires_at),
            ..Self::default()
        })
    }

    /// Classify these credentials at `now`.
    pub fn state(&self, now: DateTime<Utc>, slop: Duration) -> TokenState {
        TokenState::classify(self, now, slop)
    }

    /// Time left before expiry, or `None` when unknown or already past.
    pub fn expires_in(&self, now: DateTime<Utc>) -> Option<Duration> {
        (self.expires_at? - now).to_std().ok()
    }

    /// Apply a successful token-endpoint response, producing the new credentials.
    ///
    /// The grant must carry an access token and `expires_in`; otherwise it is
    /// rejected and `self` is untouched. A refresh token is carried forward
    /// unless the grant supplies a new one.
    pub fn with_grant(&self, grant: TokenGrant, now: DateTime<Utc>) -> Result<Self> {
        let access_token = grant
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Auth("token response has no access_token".into()))?;
        let expires_in = grant
            .expires_in
            .ok_or_else(|| Error::Auth("token response has no expires_in".into()))?;

        let expires_at = TimeDelta::try_milliseconds(expires_in.saturating_mul(1000))
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| Error::Auth("token response has out-of-range expires_in".into()))?;

        let mut next = self.clone();
        next.access_token = Some(access_token);
        next.expires_at = Some(expires_at);
        if let Some(refresh) = grant.refresh_token.filter(|t| !t.is_empty()) {
            next.refresh_token = Some(refresh);
        }
        next.merge_profile_fields(
            grant.id,
            grant.token_type,
            grant.plan,
            grant.provider,
            grant.extra,
        );
        Ok(next)
    }

    /// Drop every token and provider field, then merge in the non-token
    /// fields of a revoke response.
    pub fn cleared(revoke_response: Option<TokenGrant>) -> Self {
        let mut next = Self::default();
        if let Some(r) = revoke_response {
            next.merge_profile_fields(r.id, r.token_type, r.plan, r.provider, r.extra);
        }
        next
    }

    fn merge_profile_fields(
        &mut self,
        id: Option<String>,
        token_type: Option<String>,
        plan: Option<String>,
        provider: Option<String>,
        extra: Map<String, Value>,
    ) {
        if id.is_some() {
            self.user_id = id;
        }
        if token_type.is_some() {
            self.token_type = token_type;
        }
        if plan.is_some() {
            self.plan = plan;
        }
        if provider.is_some() {
            self.provider = provider;
        }
        self.extra.extend(extra);
    }
}

/// Response body of `POST /v3/auth/token`.
#[derive(Clone, Default, Deserialize)]
pub struct TokenGrant {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("expires_in", &self.expires_in)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl TokenGrant {
    /// Parse a grant from a JSON body. `null` (empty body) is an empty grant.
    pub fn from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Lifecycle state of a set of credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenState {
    /// Access token, refresh token or expiry is missing.
    NoCredentials,
    /// Expiry is now or in the past.
    Expired,
    /// Expiry falls inside the refresh slop window.
    ExpiringSoon,
    Valid,
}

impl TokenState {
    pub fn classify(credentials: &Credentials, now: DateTime<Utc>, slop: Duration) -> Self {
        let (Some(_), Some(_), Some(expires_at)) = (
            credentials.access_token.as_ref(),
            credentials.refresh_token.as_ref(),
            credentials.expires_at,
        ) else {
            return Self::NoCredentials;
        };

        let remaining = expires_at - now;
        if remaining <= TimeDelta::zero() {
            return Self::Expired;
        }
        let slop = TimeDelta::from_std(slop).unwrap_or(TimeDelta::MAX);
        if remaining <= slop {
            Self::ExpiringSoon
        } else {
            Self::Valid
        }
    }

    /// True when the stored access token can be used as-is.
    pub fn is_usable(self) -> bool {
        matches!(self, Self::Valid | Self::ExpiringSoon)
    }
}

impl std::fmt::Display for TokenState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NoCredentials => "no credentials",
            Self::Expired => "expired",
            Self::ExpiringSoon => "expiring soon",
            Self::Valid => "valid",
        };
        f.write_str(s)
    }
}
