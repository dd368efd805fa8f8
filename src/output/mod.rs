//! Output module for crawl summaries and reports
//!
//! This module handles:
//! - Per-base-query crawl statistics
//! - The final console report
//! - The partition listing printed by dry runs

pub mod stats;

pub use stats::{print_report, CrawlReport, QuerySummary};

use crate::crawler::Plan;

/// Prints the partitions planned for one base query
///
/// # Arguments
///
/// * `query` - The base query that was planned
/// * `plan` - Its partitions
pub fn print_plan(query: &str, plan: &Plan) {
    println!("{}", query);
    for (index, partition) in plan.partitions.iter().enumerate() {
        let pages = partition
            .page_count
            .map(|n| n.to_string())
            .unwrap_or_else(|| "?".to_string());
        println!(
            "  {:>3}. {} ({} pages)",
            index + 1,
            partition.query.label(),
            pages
        );
    }
    if plan.page_count_failures > 0 {
        println!(
            "  {} page counts could not be determined",
            plan.page_count_failures
        );
    }
    println!();
}
