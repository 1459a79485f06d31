//! Request transport.

pub mod client;
pub mod traits;

pub use client::{HttpTransport, HttpTransportBuilder};
pub use traits::{ApiRequest, Transport};
