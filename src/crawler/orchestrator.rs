//! Crawl orchestration
//!
//! The orchestrator runs every base query as its own task. A task opens a fetcher
//! session, plans the query into partitions and walks them one after another,
//! appending each new record to the query's [`ResultStore`]. Base queries that map
//! to the same destination share one store, so their appends are serialized.

use crate::catalog::{Catalog, Extractor, FetcherFactory, PageCounter, Query};
use crate::config::Config;
use crate::crawler::planner::{Plan, PartitionPlanner, PlannerConfig};
use crate::crawler::walker::{PageWalker, WalkPolicy};
use crate::output::{CrawlReport, QuerySummary};
use crate::storage::{open_store, OutputTarget, ResultStore, StoreResult};
use crate::HarvestError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

type SharedStore = Arc<Mutex<ResultStore>>;

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub planner: PlannerConfig,
    pub walk: WalkPolicy,

    /// Base queries crawled at the same time
    pub max_concurrent_queries: usize,
}

impl From<&Config> for OrchestratorSettings {
    fn from(config: &Config) -> Self {
        Self {
            planner: PlannerConfig::from(&config.crawler),
            walk: WalkPolicy::from(&config.walker),
            max_concurrent_queries: config.crawler.max_concurrent_queries,
        }
    }
}

/// Top-level crawl driver
pub struct CrawlOrchestrator {
    factory: Arc<dyn FetcherFactory>,
    extractor: Arc<dyn Extractor>,
    settings: Arc<OrchestratorSettings>,
    stores: Mutex<HashMap<PathBuf, SharedStore>>,
    cancel: CancellationToken,
}

impl CrawlOrchestrator {
    pub fn new(
        factory: Arc<dyn FetcherFactory>,
        extractor: Arc<dyn Extractor>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            factory,
            extractor,
            settings: Arc::new(settings),
            stores: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the crawl at the next page boundary when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Opens the store for a destination, or returns the one already open for it
    fn store_for(&self, target: &OutputTarget) -> StoreResult<SharedStore> {
        let mut stores = self.stores.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(store) = stores.get(&target.path) {
            return Ok(Arc::clone(store));
        }

        let store = Arc::new(Mutex::new(open_store(target)?));
        stores.insert(target.path.clone(), Arc::clone(&store));
        Ok(store)
    }

    /// Plans a base query without walking it
    ///
    /// # Returns
    ///
    /// * `Ok(Plan)` - Partitions of the query
    /// * `Err(HarvestError)` - The fetcher session could not be opened
    pub async fn plan(&self, query: &Query) -> Result<Plan, HarvestError> {
        let fetcher = self.factory.open(query)?;
        let catalog = Catalog::new(fetcher.as_ref(), self.extractor.as_ref());
        let planner = PartitionPlanner::new(&catalog, self.settings.planner.clone());
        Ok(planner.plan(query).await)
    }

    /// Crawls every base query
    ///
    /// # Arguments
    ///
    /// * `queries` - Base queries, crawled independently
    /// * `destination_for` - Destination of the query at a given input index
    /// * `page_cap` - Highest page index walked in any partition
    ///
    /// # Returns
    ///
    /// One summary per base query, in input order. Failures are reported in the
    /// summaries; a failed base query never stops the others.
    pub async fn run<F>(&self, queries: Vec<Query>, destination_for: F, page_cap: u32) -> CrawlReport
    where
        F: Fn(usize, &Query) -> OutputTarget,
    {
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent_queries.max(1)));
        let mut tasks = JoinSet::new();
        let mut summaries = Vec::with_capacity(queries.len());

        for (index, query) in queries.into_iter().enumerate() {
            let target = destination_for(index, &query);
            let mut summary =
                QuerySummary::new(query.to_string(), target.path.display().to_string());
            summary.error = Some("crawl task did not complete".to_string());
            summaries.push(summary);

            let job = QueryJob {
                query,
                store: self.store_for(&target),
                summary: QuerySummary::new(
                    summaries[index].query.clone(),
                    summaries[index].destination.clone(),
                ),
                factory: Arc::clone(&self.factory),
                extractor: Arc::clone(&self.extractor),
                settings: Arc::clone(&self.settings),
                cancel: self.cancel.clone(),
                page_cap,
            };
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                (index, job.run().await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, summary)) => summaries[index] = summary,
                Err(e) => tracing::error!("Crawl task failed: {}", e),
            }
        }

        CrawlReport {
            queries: summaries,
        }
    }
}

/// Everything one base query task owns
struct QueryJob {
    query: Query,
    store: StoreResult<SharedStore>,
    summary: QuerySummary,
    factory: Arc<dyn FetcherFactory>,
    extractor: Arc<dyn Extractor>,
    settings: Arc<OrchestratorSettings>,
    cancel: CancellationToken,
    page_cap: u32,
}

impl QueryJob {
    async fn run(self) -> QuerySummary {
        let QueryJob {
            query,
            store,
            mut summary,
            factory,
            extractor,
            settings,
            cancel,
            page_cap,
        } = self;

        let store = match store {
            Ok(store) => store,
            Err(e) => {
                tracing::error!("Cannot open destination for {}: {}", query, e);
                summary.error = Some(e.to_string());
                return summary;
            }
        };

        let fetcher = match factory.open(&query) {
            Ok(fetcher) => fetcher,
            Err(e) => {
                tracing::error!("{}", e);
                summary.error = Some(e.to_string());
                return summary;
            }
        };

        if cancel.is_cancelled() {
            summary.cancelled = true;
            return summary;
        }

        let catalog = Catalog::new(fetcher.as_ref(), extractor.as_ref());
        let plan = PartitionPlanner::new(&catalog, settings.planner.clone())
            .plan(&query)
            .await;
        summary.partitions = plan.partitions.len() as u64;
        summary.page_count_failures += u64::from(plan.page_count_failures);

        for (index, partition) in plan.partitions.into_iter().enumerate() {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let pages = match partition.page_count {
                Some(pages) => pages,
                None => match catalog.page_count(&partition.query).await {
                    Ok(pages) => pages,
                    Err(e) => {
                        summary.page_count_failures += 1;
                        tracing::warn!(
                            "Page count unavailable for {}, walking up to {} pages: {}",
                            partition.query.label(),
                            page_cap,
                            e
                        );
                        page_cap
                    }
                },
            };
            let cap = pages.min(page_cap);

            tracing::info!(
                "Partition {}/{} of {}: {} ({} pages)",
                index + 1,
                summary.partitions,
                query,
                partition.query.label(),
                cap
            );

            let mut walker = PageWalker::new(
                partition.query,
                fetcher.as_ref(),
                extractor.as_ref(),
                &settings.walk,
                cap,
                cancel.clone(),
            );

            while let Some(walked) = walker.next_page(store.as_ref()).await {
                for record in &walked.records {
                    let appended = {
                        let mut guard = store.lock().unwrap_or_else(PoisonError::into_inner);
                        guard.try_append(record)
                    };
                    match appended {
                        Ok(true) => summary.records_added += 1,
                        Ok(false) => summary.duplicates += 1,
                        Err(e) => {
                            tracing::error!("Write to {} failed: {}", summary.destination, e);
                            summary.absorb(walker.stats(), walker.stop_reason());
                            summary.error = Some(e.to_string());
                            return summary;
                        }
                    }
                }
            }

            summary.absorb(walker.stats(), walker.stop_reason());
        }

        tracing::info!(
            "Finished {}: {} pages, {} new records",
            query,
            summary.pages_visited,
            summary.records_added
        );
        summary
    }
}
