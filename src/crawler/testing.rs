//! Scripted collaborators for crawler tests
//!
//! Stub pages are plain text, one directive per line:
//! - `pages N` sets the pagination count
//! - `listing TITLE` adds a listing with that title
//! - `blocked` marks the page as a CAPTCHA response

use crate::catalog::{Extractor, FetchError, FetchedPage, Fetcher, FetcherFactory, Query};
use crate::crawler::WalkPolicy;
use crate::record::{Record, RecordField};
use crate::HarvestError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

const PLACEHOLDER_URL: &str = "https://stub.invalid/";

/// Walk policy without any delays
pub fn instant_policy() -> WalkPolicy {
    WalkPolicy {
        block_cooldown: Duration::ZERO,
        empty_retry_delay: Duration::ZERO,
        transport_retry_delay: Duration::ZERO,
        pacing_min: Duration::ZERO,
        pacing_max: Duration::ZERO,
        ..WalkPolicy::default()
    }
}

/// A page whose effective URL is the requested page URL
pub fn page(body: &str) -> FetchedPage {
    FetchedPage {
        html: body.to_string(),
        effective_url: Url::parse(PLACEHOLDER_URL).unwrap(),
    }
}

/// A page that was redirected to `url`
pub fn page_at(body: &str, url: &str) -> FetchedPage {
    FetchedPage {
        html: body.to_string(),
        effective_url: Url::parse(url).unwrap(),
    }
}

pub fn blocked() -> FetchError {
    FetchError::Blocked {
        url: "https://stub.invalid/".to_string(),
    }
}

pub fn transport() -> FetchError {
    FetchError::Transport {
        url: "https://stub.invalid/".to_string(),
        message: "connection reset".to_string(),
    }
}

/// Builds a stub page listing the given titles
pub fn listings(titles: &[&str]) -> String {
    titles
        .iter()
        .map(|t| format!("listing {}", t))
        .collect::<Vec<_>>()
        .join("\n")
}

type Script = HashMap<(String, u32), VecDeque<Result<FetchedPage, FetchError>>>;

/// Fetcher that replays scripted responses per (query, page)
///
/// The last scripted response for a page repeats once the queue is down to it.
#[derive(Default)]
pub struct ScriptedFetcher {
    script: Mutex<Script>,
    calls: Mutex<Vec<(String, u32)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, query: &Query, page: u32, response: Result<FetchedPage, FetchError>) {
        self.script
            .lock()
            .unwrap()
            .entry((query.url().to_string(), page))
            .or_default()
            .push_back(response);
    }

    /// Page numbers fetched for a query, in call order
    pub fn pages_fetched(&self, query: &Query) -> Vec<u32> {
        let url = query.url().to_string();
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| *u == url)
            .map(|(_, p)| *p)
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn get(&self, query: &Query, page: u32) -> Result<FetchedPage, FetchError> {
        let key = (query.url().to_string(), page);
        self.calls.lock().unwrap().push(key.clone());

        let mut script = self.script.lock().unwrap();
        let response = match script.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if queue.len() == 1 => queue[0].clone(),
            _ => {
                return Err(FetchError::Transport {
                    url: query.page_url(page).to_string(),
                    message: "no scripted response".to_string(),
                })
            }
        };

        response.map(|mut fetched| {
            if fetched.effective_url.as_str() == PLACEHOLDER_URL {
                fetched.effective_url = query.page_url(page);
            }
            fetched
        })
    }
}

#[async_trait]
impl Fetcher for Arc<ScriptedFetcher> {
    async fn get(&self, query: &Query, page: u32) -> Result<FetchedPage, FetchError> {
        self.as_ref().get(query, page).await
    }
}

/// Factory handing out one shared scripted fetcher, or failing for chosen queries
#[derive(Default)]
pub struct ScriptedFactory {
    pub fetcher: Arc<ScriptedFetcher>,
    pub failing: Vec<String>,
}

impl FetcherFactory for ScriptedFactory {
    fn open(&self, query: &Query) -> Result<Box<dyn Fetcher>, HarvestError> {
        if self.failing.contains(&query.to_string()) {
            return Err(HarvestError::FetcherInit {
                query: query.to_string(),
                message: "browser failed to start".to_string(),
            });
        }
        Ok(Box::new(Arc::clone(&self.fetcher)))
    }
}

/// Extractor for the line-based stub page format
pub struct StubExtractor;

impl Extractor for StubExtractor {
    fn page_count(&self, html: &str) -> u32 {
        html.lines()
            .filter_map(|l| l.trim().strip_prefix("pages "))
            .filter_map(|n| n.trim().parse().ok())
            .max()
            .unwrap_or(1)
    }

    fn listings(&self, html: &str) -> Vec<Record> {
        html.lines()
            .filter_map(|l| l.trim().strip_prefix("listing "))
            .map(|title| {
                Record::default()
                    .with(RecordField::Title, title.trim())
                    .with(RecordField::ScrapedAt, "2024-03-01 10:00:00")
            })
            .collect()
    }

    fn is_blocked(&self, html: &str) -> bool {
        html.lines().any(|l| l.trim() == "blocked")
    }
}
