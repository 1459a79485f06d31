//! Token storage.

pub mod file;

pub use file::TokenStore;
