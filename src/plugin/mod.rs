//! Remote plugin content
//!
//! - [`cache`] - TTL content cache with single-flight computation
//! - [`auth`] - Authorization header redaction for logs and errors
//! - [`github`] - Plugin source backed by GitHub raw content

pub mod auth;
pub mod cache;
pub mod github;

pub use cache::ContentCache;
pub use github::{GithubPlugin, GithubPluginSource, GithubSettings};
