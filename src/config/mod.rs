//! Configuration module for Listing-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use listing_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawler will use page cap: {}", config.crawler.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, FetcherConfig, OutputConfig, QueryEntry, SelectorConfig, WalkerConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;

use crate::storage::OutputTarget;
use std::path::Path;

impl OutputConfig {
    /// Default destination of the `index`-th base query (0-based), named with a 1-based suffix
    pub fn default_target(&self, index: usize) -> OutputTarget {
        let file = format!(
            "{}_{}.{}",
            self.file_prefix,
            index + 1,
            self.format.extension()
        );
        OutputTarget::new(Path::new(&self.directory).join(file), self.format)
    }
}

impl Config {
    /// Destination of the `index`-th configured base query
    pub fn target_for(&self, index: usize) -> OutputTarget {
        match self.query.get(index).and_then(|q| q.destination.as_deref()) {
            Some(path) => OutputTarget::from_path(path),
            None => self.output.default_target(index),
        }
    }
}
