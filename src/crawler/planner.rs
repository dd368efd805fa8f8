//! Partition planning
//!
//! The catalog never serves more than a fixed number of pages for one query. The
//! planner splits an over-large query into manufacture-year windows and, where a
//! window is still too large, into one sub-query per transmission type.
//!
//! The tree is two levels deep at most. Output order follows the axes: ascending year
//! windows, then [`Transmission::ALL`] order inside a split window.

use crate::catalog::{PageCounter, Query, Transmission, YearRange};
use crate::config::CrawlerConfig;

/// Planner settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Highest page count a partition may have
    pub max_pages: u32,

    /// First year of the windowed range; the first window is open below it
    pub first_year: u16,

    /// Last year of the windowed range; the last window is open above it
    pub last_year: u16,

    /// Years per window
    pub window_years: u16,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_pages: 500,
            first_year: 2000,
            last_year: current_year(),
            window_years: 2,
        }
    }
}

impl From<&CrawlerConfig> for PlannerConfig {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            first_year: config.first_year,
            last_year: config.last_year.unwrap_or_else(current_year),
            window_years: config.year_window,
        }
    }
}

/// The current calendar year
pub fn current_year() -> u16 {
    use chrono::Datelike;
    chrono::Local::now().year().clamp(0, u16::MAX as i32) as u16
}

/// A query expected to fit under the page cap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub query: Query,

    /// Page count observed while planning; `None` for unconditional transmission splits
    pub page_count: Option<u32>,
}

/// Output of [`PartitionPlanner::plan`]
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub partitions: Vec<Partition>,

    /// Page counts that could not be determined while planning
    pub page_count_failures: u32,
}

/// Splits over-large queries into partitions
pub struct PartitionPlanner<'a, C: PageCounter + ?Sized> {
    counter: &'a C,
    config: PlannerConfig,
}

impl<'a, C: PageCounter + ?Sized> PartitionPlanner<'a, C> {
    pub fn new(counter: &'a C, config: PlannerConfig) -> Self {
        Self { counter, config }
    }

    /// The year windows used for splitting, in ascending order
    pub fn year_windows(&self) -> Vec<YearRange> {
        let first = self.config.first_year;
        let last = self.config.last_year.max(first);
        let step = self.config.window_years.max(1);

        let mut windows = Vec::new();
        let mut start = first;
        loop {
            let end = start.saturating_add(step - 1);
            let is_first = start == first;
            let is_last = end >= last;
            windows.push(YearRange::new(
                if is_first { None } else { Some(start) },
                if is_last { None } else { Some(end) },
            ));
            if is_last {
                break;
            }
            start = end + 1;
        }
        windows
    }

    /// Splits a query into partitions
    ///
    /// # Returns
    ///
    /// The query itself if it fits, otherwise its year windows, with over-large or
    /// uncountable windows split by transmission
    pub async fn plan(&self, query: &Query) -> Plan {
        let mut plan = Plan::default();

        match self.counter.page_count(query).await {
            Ok(pages) if pages <= self.config.max_pages => {
                tracing::info!("{} has {} pages, no partitioning needed", query, pages);
                plan.partitions.push(Partition {
                    query: query.clone(),
                    page_count: Some(pages),
                });
                return plan;
            }
            Ok(pages) => {
                tracing::info!(
                    "{} has {} pages (cap {}), splitting by year",
                    query,
                    pages,
                    self.config.max_pages
                );
            }
            Err(e) => {
                plan.page_count_failures += 1;
                tracing::warn!("Page count unavailable for {}, splitting by year: {}", query, e);
            }
        }

        for window in self.year_windows() {
            let Some(windowed) = query.with_years(window) else {
                tracing::debug!("Window {} lies outside {}", window, query.label());
                continue;
            };

            let fits = match self.counter.page_count(&windowed).await {
                Ok(pages) if pages <= self.config.max_pages => Some(pages),
                Ok(pages) => {
                    tracing::info!("Window {} has {} pages, splitting by gearbox", window, pages);
                    None
                }
                Err(e) => {
                    plan.page_count_failures += 1;
                    tracing::warn!(
                        "Page count unavailable for window {}, splitting by gearbox: {}",
                        window,
                        e
                    );
                    None
                }
            };

            if let Some(pages) = fits {
                plan.partitions.push(Partition {
                    query: windowed,
                    page_count: Some(pages),
                });
                continue;
            }

            if windowed.transmission().is_some() {
                tracing::warn!(
                    "{} already filters on gearbox, accepting it over the cap",
                    windowed.label()
                );
                plan.partitions.push(Partition {
                    query: windowed,
                    page_count: None,
                });
                continue;
            }

            for transmission in Transmission::ALL {
                if let Some(split) = windowed.with_transmission(transmission) {
                    plan.partitions.push(Partition {
                        query: split,
                        page_count: None,
                    });
                }
            }
        }

        tracing::info!("Planned {} partitions for {}", plan.partitions.len(), query);
        plan
    }
}
