//! Listing-Harvest: a resumable crawler for capped, paginated listing catalogs
//!
//! This crate splits over-large catalog queries into partitions that stay under the
//! site's page cap, walks every partition page by page while backing off from
//! anti-bot responses, and appends newly discovered listings to a deduplicated,
//! append-only destination so that a crawl can be stopped and resumed at any time.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod output;
pub mod record;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Listing-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("Failed to initialise fetcher for {query}: {message}")]
    FetcherInit { query: String, message: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid query URL in config: {0}")]
    InvalidQuery(String),
}

/// Result type alias for Listing-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use catalog::{Query, Transmission};
pub use config::Config;
pub use crawler::{CrawlOrchestrator, PageWalker, PartitionPlanner};
pub use record::{Fingerprint, Record};
pub use state::{CrawlState, StopReason};
pub use storage::ResultStore;
