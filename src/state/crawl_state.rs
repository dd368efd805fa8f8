//! Per-partition walk state
//!
//! This module holds the counters a page walker keeps for one partition and the
//! reasons a walk can end.
use std::fmt;

/// Why a partition walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StopReason {
    /// Every page up to the page cap was visited
    PageCapReached,

    /// The catalog redirected consecutive pages to the same URL
    RedirectRepeat,

    /// Consecutive pages came back without listings
    EmptyPages,

    /// Consecutive pages held only already-known listings
    Stagnated,

    /// A page kept failing at the transport level
    TransportFailure,

    /// The crawl was cancelled between pages
    Cancelled,
}

impl StopReason {
    /// Returns true if the walk ended because of a failure rather than a rule
    pub fn is_error(&self) -> bool {
        matches!(self, Self::TransportFailure)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PageCapReached => "page_cap_reached",
            Self::RedirectRepeat => "redirect_repeat",
            Self::EmptyPages => "empty_pages",
            Self::Stagnated => "stagnated",
            Self::TransportFailure => "transport_failure",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters for one partition walk
///
/// Every counter starts at 0 for a new partition. A counter drops back to 0 on the
/// event that counts as success for it and grows otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlState {
    /// Page currently being walked (1-based)
    pub page: u32,

    /// Consecutive fetches that returned no listings
    pub empty_streak: u32,

    /// Consecutive pages whose effective URL repeated the previous page's
    pub repeat_streak: u32,

    /// Consecutive pages that yielded no new records
    pub stagnant_streak: u32,

    /// Effective URL of the last page that was evaluated
    last_effective_url: Option<String>,
}

impl Default for CrawlState {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlState {
    pub fn new() -> Self {
        Self {
            page: 1,
            empty_streak: 0,
            repeat_streak: 0,
            stagnant_streak: 0,
            last_effective_url: None,
        }
    }

    /// Records a page's effective URL and returns the repeat streak
    pub fn observe_effective_url(&mut self, url: &str) -> u32 {
        if self.last_effective_url.as_deref() == Some(url) {
            self.repeat_streak += 1;
        } else {
            self.repeat_streak = 0;
            self.last_effective_url = Some(url.to_string());
        }
        self.repeat_streak
    }

    /// Records a fetch without listings and returns the empty streak
    pub fn record_empty(&mut self) -> u32 {
        self.empty_streak += 1;
        self.empty_streak
    }

    /// Records a page with listings, `new_records` of them unknown, and returns
    /// the stagnation streak
    pub fn record_listings(&mut self, new_records: usize) -> u32 {
        self.empty_streak = 0;
        if new_records == 0 {
            self.stagnant_streak += 1;
        } else {
            self.stagnant_streak = 0;
        }
        self.stagnant_streak
    }

    /// Moves on to the next page
    pub fn advance(&mut self) {
        self.page += 1;
    }
}
