//! Error types for the cache binary and setup paths.
//!
//! Fetch failures never surface here; they are stored per table in
//! [`crate::state::TableStatus`].

use crate::api_client::ApiClientError;
use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiClientError),
    #[error("Logging setup failed: {0}")]
    Logging(String),
    #[error("Usage: {0}")]
    Usage(String),
}
