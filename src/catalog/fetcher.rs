//! Page fetching
//!
//! This module defines the [`Fetcher`] seam used by the crawler and its HTTP
//! implementation, including:
//! - Building one cookie-keeping HTTP session per base query
//! - User agent rotation by page index
//! - Classifying responses into pages, blocks and transport failures

use crate::catalog::Query;
use crate::config::FetcherConfig;
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::header::{ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A successfully fetched catalog page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Page body
    pub html: String,

    /// Final URL after redirects
    pub effective_url: Url,
}

/// Fetch outcomes other than a page
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The site answered with an anti-bot challenge
    #[error("Blocked by anti-bot response at {url}")]
    Blocked { url: String },

    /// Network, DNS, timeout or unexpected HTTP status
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },
}

/// Fetches pages of a catalog query
///
/// Implementations own their politeness and anti-detection policy; the crawler only
/// consumes the three outcomes of [`Fetcher::get`].
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, query: &Query, page: u32) -> Result<FetchedPage, FetchError>;
}

/// Creates one fetcher session per base query
pub trait FetcherFactory: Send + Sync {
    fn open(&self, query: &Query) -> Result<Box<dyn Fetcher>, HarvestError>;
}

/// reqwest-backed fetcher with a persistent cookie session
pub struct HttpFetcher {
    client: Client,
    user_agents: Vec<String>,
    accept_language: String,
}

impl HttpFetcher {
    /// Builds a fetcher with its own HTTP session
    ///
    /// # Arguments
    ///
    /// * `config` - Fetcher settings (timeout, headers, user agents)
    ///
    /// # Returns
    ///
    /// * `Ok(HttpFetcher)` - Successfully built fetcher
    /// * `Err(reqwest::Error)` - Failed to build the HTTP client
    pub fn new(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            user_agents: config.user_agents.clone(),
            accept_language: config.accept_language.clone(),
        })
    }

    /// User agent for a page, cycling through the configured list
    fn user_agent_for(&self, page: u32) -> Option<&str> {
        if self.user_agents.is_empty() {
            return None;
        }
        let index = page as usize % self.user_agents.len();
        Some(self.user_agents[index].as_str())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, query: &Query, page: u32) -> Result<FetchedPage, FetchError> {
        let url = query.page_url(page);
        let mut request = self
            .client
            .get(url.clone())
            .header(ACCEPT_LANGUAGE, self.accept_language.as_str());
        if let Some(agent) = self.user_agent_for(page) {
            request = request.header(USER_AGENT, agent);
        }

        let response = request.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                "Request timeout".to_string()
            } else if e.is_connect() {
                "Connection refused".to_string()
            } else {
                e.to_string()
            };
            FetchError::Transport {
                url: url.to_string(),
                message,
            }
        })?;

        let status = response.status();
        let effective_url = response.url().clone();

        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::FORBIDDEN {
            return Err(FetchError::Blocked {
                url: effective_url.to_string(),
            });
        }

        if !status.is_success() {
            return Err(FetchError::Transport {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let html = response.text().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        Ok(FetchedPage {
            html,
            effective_url,
        })
    }
}

/// Opens an [`HttpFetcher`] for every base query
pub struct HttpFetcherFactory {
    config: FetcherConfig,
}

impl HttpFetcherFactory {
    pub fn new(config: FetcherConfig) -> Self {
        Self { config }
    }
}

impl FetcherFactory for HttpFetcherFactory {
    fn open(&self, query: &Query) -> Result<Box<dyn Fetcher>, HarvestError> {
        let fetcher = HttpFetcher::new(&self.config).map_err(|e| HarvestError::FetcherInit {
            query: query.to_string(),
            message: e.to_string(),
        })?;
        Ok(Box::new(fetcher))
    }
}
