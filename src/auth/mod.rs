//! Authentication: credentials, their persistence, and the OAuth flow.

pub mod oauth;
pub mod store;
pub mod tokens;
pub mod traits;

pub use oauth::{AuthController, CallbackParams, CallbackServer};
pub use store::TokenStore;
pub use tokens::{Credentials, TokenGrant, TokenState};
pub use traits::{Browser, SystemBrowser, TokenProvider};
