//! Hermes client cache library exports.

pub mod api_client;
pub mod config;
pub mod context;
pub mod error;
pub mod join;
pub mod lookup;
pub mod refresh;
pub mod state;
pub mod store;
pub mod table;
pub mod telemetry;

pub use api_client::{ApiClientError, RestClient, TableSource};
pub use config::{CacheConfig, LogFormat, LoggingConfig, StaleResponsePolicy};
pub use context::CacheContext;
pub use error::CacheError;
pub use refresh::{RefreshOrchestrator, RefreshReport};
pub use state::{CacheState, TableStatus};
pub use store::{FetchOutcome, TableStore};
