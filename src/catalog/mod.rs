//! Catalog access: queries, page fetching and page extraction
//!
//! The crawler never talks HTTP or HTML directly. It sees the catalog through two
//! collaborators, a [`Fetcher`] that returns pages and an [`Extractor`] that reads
//! them, plus the [`PageCounter`] capability built from both.

mod extractor;
mod fetcher;
mod query;

pub use extractor::{Extractor, ScraperExtractor};
pub use fetcher::{
    FetchError, FetchedPage, Fetcher, FetcherFactory, HttpFetcher, HttpFetcherFactory,
};
pub use query::{
    Query, QueryError, Transmission, YearRange, GEARBOX_PARAM, PAGE_PARAM, YEAR_FROM_PARAM,
    YEAR_TO_PARAM,
};

use async_trait::async_trait;

/// Reports how many result pages a query has
#[async_trait]
pub trait PageCounter: Send + Sync {
    async fn page_count(&self, query: &Query) -> Result<u32, FetchError>;
}

/// A fetcher session paired with an extractor
pub struct Catalog<'a> {
    fetcher: &'a dyn Fetcher,
    extractor: &'a dyn Extractor,
}

impl<'a> Catalog<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, extractor: &'a dyn Extractor) -> Self {
        Self { fetcher, extractor }
    }
}

#[async_trait]
impl PageCounter for Catalog<'_> {
    /// Fetches the first page and reads its pagination
    async fn page_count(&self, query: &Query) -> Result<u32, FetchError> {
        let page = self.fetcher.get(query, 1).await?;
        if self.extractor.is_blocked(&page.html) {
            return Err(FetchError::Blocked {
                url: page.effective_url.to_string(),
            });
        }
        Ok(self.extractor.page_count(&page.html))
    }
}
