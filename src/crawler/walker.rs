//! Page-by-page traversal of one partition
//!
//! A [`PageWalker`] is pulled one page at a time with [`PageWalker::next_page`]. Each
//! call fetches at most one page index (refetching it after blocks, empty results or
//! transport errors) and returns the records on it that are not yet known. The walk
//! ends on the first terminal rule:
//!
//! - the page cap is passed
//! - the same effective URL comes back for too many consecutive pages
//! - too many consecutive fetches return no listings
//! - too many consecutive pages return only known listings
//! - a page keeps failing at the transport level
//! - the cancellation token fires
//!
//! A page that stays blocked through its whole retry budget is skipped, not terminal.

use crate::catalog::{Extractor, FetchError, FetchedPage, Fetcher, Query};
use crate::config::WalkerConfig;
use crate::record::Record;
use crate::state::{CrawlState, StopReason};
use crate::storage::KnownFingerprints;
use rand::Rng;
use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Walk thresholds and delays
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkPolicy {
    pub block_cooldown: Duration,
    pub block_retries: u32,
    pub empty_retry_delay: Duration,
    pub empty_page_limit: u32,
    pub stagnation_limit: u32,
    pub repeat_limit: u32,
    pub transport_retries: u32,
    pub transport_retry_delay: Duration,
    pub pacing_min: Duration,
    pub pacing_max: Duration,
}

impl From<&WalkerConfig> for WalkPolicy {
    fn from(config: &WalkerConfig) -> Self {
        Self {
            block_cooldown: Duration::from_secs(config.block_cooldown_secs),
            block_retries: config.block_retries,
            empty_retry_delay: Duration::from_secs(config.empty_retry_secs),
            empty_page_limit: config.empty_page_limit,
            stagnation_limit: config.stagnation_limit,
            repeat_limit: config.repeat_limit,
            transport_retries: config.transport_retries,
            transport_retry_delay: Duration::from_secs(config.transport_retry_secs),
            pacing_min: Duration::from_millis(config.pacing_min_ms),
            pacing_max: Duration::from_millis(config.pacing_max_ms),
        }
    }
}

impl Default for WalkPolicy {
    fn default() -> Self {
        Self::from(&WalkerConfig::default())
    }
}

impl WalkPolicy {
    /// A random delay within the pacing range
    fn pacing_delay(&self) -> Duration {
        let min = self.pacing_min.as_millis() as u64;
        let max = (self.pacing_max.as_millis() as u64).max(min);
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

/// One walked page
#[derive(Debug, Clone, PartialEq)]
pub struct WalkedPage {
    /// Page index (1-based)
    pub page: u32,

    /// Listings extracted from the page, known ones included
    pub listings_seen: usize,

    /// Listings not yet known, in page order
    pub records: Vec<Record>,
}

/// Counters for one partition walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Fetcher calls, retries included
    pub fetches: u64,
    /// Pages whose listings were evaluated
    pub pages_visited: u64,
    pub listings_seen: u64,
    pub new_records: u64,
    /// Anti-bot responses
    pub blocked: u64,
    /// Pages given up on after exhausting the block budget
    pub skipped: u64,
    /// Fetches that returned no listings
    pub empty: u64,
    pub transport_errors: u64,
}

/// Drives the page walk of one partition
pub struct PageWalker<'a> {
    query: Query,
    fetcher: &'a dyn Fetcher,
    extractor: &'a dyn Extractor,
    policy: &'a WalkPolicy,
    page_cap: u32,
    cancel: CancellationToken,
    state: CrawlState,
    stats: WalkStats,
    stop: Option<StopReason>,
}

impl<'a> PageWalker<'a> {
    /// Creates a walker positioned before page 1
    ///
    /// # Arguments
    ///
    /// * `query` - The partition to walk
    /// * `fetcher` - Session used for every page of the partition
    /// * `extractor` - Reads listings and block markers from fetched pages
    /// * `policy` - Thresholds and delays
    /// * `page_cap` - Highest page index that may be fetched
    /// * `cancel` - Checked between pages and during sleeps
    pub fn new(
        query: Query,
        fetcher: &'a dyn Fetcher,
        extractor: &'a dyn Extractor,
        policy: &'a WalkPolicy,
        page_cap: u32,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            query,
            fetcher,
            extractor,
            policy,
            page_cap,
            cancel,
            state: CrawlState::new(),
            stats: WalkStats::default(),
            stop: None,
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn stats(&self) -> &WalkStats {
        &self.stats
    }

    /// Why the walk ended, once it has
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop
    }

    /// Walks the next page
    ///
    /// # Arguments
    ///
    /// * `known` - Fingerprints already persisted; their listings are not returned
    ///
    /// # Returns
    ///
    /// * `Some(WalkedPage)` - The page that was walked, possibly without records
    /// * `None` - The walk has ended; see [`PageWalker::stop_reason`]
    pub async fn next_page<K>(&mut self, known: &K) -> Option<WalkedPage>
    where
        K: KnownFingerprints + Sync + ?Sized,
    {
        if self.stop.is_some() {
            return None;
        }
        if self.cancel.is_cancelled() {
            return self.finish(StopReason::Cancelled);
        }
        if self.state.page > self.page_cap {
            return self.finish(StopReason::PageCapReached);
        }

        let page = self.state.page;
        if page > 1 && !self.pause(self.policy.pacing_delay()).await {
            return self.finish(StopReason::Cancelled);
        }

        let mut block_attempts = 0;
        let mut transport_attempts = 0;
        let mut url_observed = false;

        loop {
            match self.fetch(page).await {
                Err(FetchError::Blocked { url }) => {
                    self.stats.blocked += 1;
                    if block_attempts < self.policy.block_retries {
                        block_attempts += 1;
                        tracing::warn!(
                            "Blocked at {} (attempt {}/{}), cooling down for {:?}",
                            url,
                            block_attempts,
                            self.policy.block_retries,
                            self.policy.block_cooldown
                        );
                        if !self.pause(self.policy.block_cooldown).await {
                            return self.finish(StopReason::Cancelled);
                        }
                        continue;
                    }

                    tracing::warn!("Page {} of {} still blocked, skipping it", page, self.query.label());
                    self.stats.skipped += 1;
                    self.state.advance();
                    return Some(WalkedPage {
                        page,
                        listings_seen: 0,
                        records: Vec::new(),
                    });
                }
                Err(FetchError::Transport { url, message }) => {
                    self.stats.transport_errors += 1;
                    if transport_attempts < self.policy.transport_retries {
                        transport_attempts += 1;
                        tracing::warn!(
                            "Transport error at {}: {} (retry {}/{})",
                            url,
                            message,
                            transport_attempts,
                            self.policy.transport_retries
                        );
                        if !self.pause(self.policy.transport_retry_delay).await {
                            return self.finish(StopReason::Cancelled);
                        }
                        continue;
                    }

                    tracing::warn!("Giving up on {} after transport errors: {}", url, message);
                    return self.finish(StopReason::TransportFailure);
                }
                Ok(fetched) => {
                    if !url_observed {
                        url_observed = true;
                        let repeats = self
                            .state
                            .observe_effective_url(fetched.effective_url.as_str());
                        if repeats >= self.policy.repeat_limit {
                            tracing::info!(
                                "Page {} redirected to {} again, assuming the end of {}",
                                page,
                                fetched.effective_url,
                                self.query.label()
                            );
                            return self.finish(StopReason::RedirectRepeat);
                        }
                    }

                    let listings = self.extractor.listings(&fetched.html);
                    if listings.is_empty() {
                        self.stats.empty += 1;
                        let streak = self.state.record_empty();
                        if streak >= self.policy.empty_page_limit {
                            return self.finish(StopReason::EmptyPages);
                        }
                        tracing::warn!(
                            "No listings on page {}, retrying in {:?}",
                            page,
                            self.policy.empty_retry_delay
                        );
                        if !self.pause(self.policy.empty_retry_delay).await {
                            return self.finish(StopReason::Cancelled);
                        }
                        continue;
                    }

                    return Some(self.evaluate(page, listings, known));
                }
            }
        }
    }

    async fn fetch(&mut self, page: u32) -> Result<FetchedPage, FetchError> {
        self.stats.fetches += 1;
        let fetched = self.fetcher.get(&self.query, page).await?;
        if self.extractor.is_blocked(&fetched.html) {
            return Err(FetchError::Blocked {
                url: fetched.effective_url.to_string(),
            });
        }
        Ok(fetched)
    }

    /// Filters a page's listings down to unknown ones and updates the streaks
    fn evaluate<K>(&mut self, page: u32, listings: Vec<Record>, known: &K) -> WalkedPage
    where
        K: KnownFingerprints + ?Sized,
    {
        let listings_seen = listings.len();
        let mut on_page = HashSet::new();
        let records: Vec<Record> = listings
            .into_iter()
            .filter(|record| {
                let fingerprint = record.fingerprint();
                !known.is_known(&fingerprint) && on_page.insert(fingerprint)
            })
            .collect();

        self.stats.pages_visited += 1;
        self.stats.listings_seen += listings_seen as u64;
        self.stats.new_records += records.len() as u64;

        tracing::info!(
            "Page {}/{} of {}: {} listings, {} new",
            page,
            self.page_cap,
            self.query.label(),
            listings_seen,
            records.len()
        );

        let stagnant = self.state.record_listings(records.len());
        self.state.advance();
        if stagnant >= self.policy.stagnation_limit {
            tracing::info!(
                "{} pages without new listings, ending {}",
                stagnant,
                self.query.label()
            );
            self.stop = Some(StopReason::Stagnated);
        }

        WalkedPage {
            page,
            listings_seen,
            records,
        }
    }

    /// Sleeps unless cancelled first; returns false on cancellation
    async fn pause(&self, delay: Duration) -> bool {
        if delay.is_zero() {
            return !self.cancel.is_cancelled();
        }
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    fn finish(&mut self, reason: StopReason) -> Option<WalkedPage> {
        if reason.is_error() {
            tracing::warn!("Walk of {} ended: {}", self.query.label(), reason);
        } else {
            tracing::info!("Walk of {} ended: {}", self.query.label(), reason);
        }
        self.stop = Some(reason);
        None
    }
}
