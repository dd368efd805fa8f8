//! Crawl statistics
//!
//! Per-base-query summaries collected by the orchestrator and their console rendering.
//! The numbers are observational; no control decision reads them.

use crate::crawler::WalkStats;
use crate::state::StopReason;
use std::collections::BTreeMap;

/// Counters for one base query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySummary {
    /// Base query URL
    pub query: String,

    /// Where its records went
    pub destination: String,

    pub partitions: u64,
    pub pages_visited: u64,
    pub listings_seen: u64,
    pub records_added: u64,

    /// Listings skipped because their fingerprint was already known
    pub duplicates: u64,

    pub blocked: u64,
    pub skipped_pages: u64,
    pub empty_pages: u64,
    pub transport_errors: u64,
    pub page_count_failures: u64,

    /// How each partition walk ended
    pub stop_reasons: BTreeMap<StopReason, u64>,

    /// Set when the base query could not be crawled at all, or its destination failed
    pub error: Option<String>,

    pub cancelled: bool,
}

impl QuerySummary {
    pub fn new(query: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            destination: destination.into(),
            ..Self::default()
        }
    }

    /// Folds one partition walk into the summary
    pub fn absorb(&mut self, stats: &WalkStats, stop: Option<StopReason>) {
        self.pages_visited += stats.pages_visited;
        self.listings_seen += stats.listings_seen;
        self.duplicates += stats.listings_seen.saturating_sub(stats.new_records);
        self.blocked += stats.blocked;
        self.skipped_pages += stats.skipped;
        self.empty_pages += stats.empty;
        self.transport_errors += stats.transport_errors;

        if let Some(reason) = stop {
            *self.stop_reasons.entry(reason).or_insert(0) += 1;
            if reason == StopReason::Cancelled {
                self.cancelled = true;
            }
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Problems that were recovered from but still reported
    pub fn recovered_errors(&self) -> u64 {
        self.blocked + self.transport_errors + self.page_count_failures
    }
}

/// Outcome of a whole crawl, one summary per base query in input order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub queries: Vec<QuerySummary>,
}

impl CrawlReport {
    pub fn records_added(&self) -> u64 {
        self.queries.iter().map(|q| q.records_added).sum()
    }

    pub fn pages_visited(&self) -> u64 {
        self.queries.iter().map(|q| q.pages_visited).sum()
    }

    pub fn failed(&self) -> usize {
        self.queries.iter().filter(|q| q.is_failed()).count()
    }

    pub fn any_failed(&self) -> bool {
        self.failed() > 0
    }

    pub fn was_cancelled(&self) -> bool {
        self.queries.iter().any(|q| q.cancelled)
    }
}

/// Prints a crawl report to stdout
///
/// # Arguments
///
/// * `report` - The report to display
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");

    for (index, summary) in report.queries.iter().enumerate() {
        println!("Query {}: {}", index + 1, summary.query);
        println!("  Destination: {}", summary.destination);

        if let Some(error) = &summary.error {
            println!("  FAILED: {}", error);
        }

        println!("  Partitions: {}", summary.partitions);
        println!("  Pages visited: {}", summary.pages_visited);
        println!("  Listings seen: {}", summary.listings_seen);
        println!("  Records added: {}", summary.records_added);
        println!("  Duplicates: {}", summary.duplicates);

        if summary.recovered_errors() > 0 || summary.skipped_pages > 0 || summary.empty_pages > 0
        {
            println!(
                "  Blocked: {}, skipped pages: {}, empty pages: {}, transport errors: {}, page count failures: {}",
                summary.blocked,
                summary.skipped_pages,
                summary.empty_pages,
                summary.transport_errors,
                summary.page_count_failures
            );
        }

        if !summary.stop_reasons.is_empty() {
            let reasons: Vec<String> = summary
                .stop_reasons
                .iter()
                .map(|(reason, count)| format!("{} x{}", reason, count))
                .collect();
            println!("  Partition endings: {}", reasons.join(", "));
        }
        if summary.cancelled {
            println!("  (cancelled)");
        }
        println!();
    }

    println!(
        "Total: {} records added over {} pages, {} of {} queries failed",
        report.records_added(),
        report.pages_visited(),
        report.failed(),
        report.queries.len()
    );
}
