//! State tracking for partition walks
//!
//! This module defines:
//! - Per-partition walk counters
//! - The reasons a partition walk ends

mod crawl_state;

pub use crawl_state::{CrawlState, StopReason};
