//! Client library for the Feedly cloud API.
//!
//! The interesting part is authentication: [`auth::AuthController`] runs the
//! OAuth2 authorization-code flow through a one-shot local callback listener,
//! persists tokens to a file, and refreshes them shortly before they expire.
//! [`FeedlyClient`] layers the REST endpoints on top of it.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod net;

pub use auth::{AuthController, Credentials, TokenState};
pub use client::{FeedlyClient, FeedlyClientBuilder};
pub use config::ClientConfig;
pub use error::{Error, Result};
