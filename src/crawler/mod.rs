//! Crawler module for partitioned catalog crawls
//!
//! This module contains the core crawling logic, including:
//! - Splitting over-large queries into partitions under the page cap
//! - Walking a partition page by page with block, empty-page and stagnation rules
//! - Running base queries concurrently and persisting their new records

mod orchestrator;
mod planner;
mod walker;

#[cfg(test)]
pub(crate) mod testing;

pub use orchestrator::{CrawlOrchestrator, OrchestratorSettings};
pub use planner::{current_year, Partition, PartitionPlanner, Plan, PlannerConfig};
pub use walker::{PageWalker, WalkPolicy, WalkStats, WalkedPage};
