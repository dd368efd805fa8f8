use crate::storage::OutputFormat;
use serde::Deserialize;

/// Main configuration structure for Listing-Harvest
///
/// Every section has defaults, so a file holding only `[[query]]` entries is complete.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub walker: WalkerConfig,
    pub fetcher: FetcherConfig,
    pub selectors: SelectorConfig,
    pub output: OutputConfig,
    pub query: Vec<QueryEntry>,
}

/// Planning and scheduling configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Highest page count the catalog serves for one query
    pub max_pages: u32,

    /// Number of base queries crawled at the same time
    pub max_concurrent_queries: usize,

    /// First year of the year-window axis
    pub first_year: u16,

    /// Last year of the year-window axis; the current year when unset
    pub last_year: Option<u16>,

    /// Width of a year window
    pub year_window: u16,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 500,
            max_concurrent_queries: 1,
            first_year: 2000,
            last_year: None,
            year_window: 2,
        }
    }
}

/// Page-walk timing and termination thresholds
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WalkerConfig {
    /// Sleep after an anti-bot response (seconds)
    pub block_cooldown_secs: u64,

    /// Refetches of a blocked page before it is skipped
    pub block_retries: u32,

    /// Sleep before refetching an empty page (seconds)
    pub empty_retry_secs: u64,

    /// Consecutive empty pages that end a partition
    pub empty_page_limit: u32,

    /// Consecutive pages without new records that end a partition
    pub stagnation_limit: u32,

    /// Consecutive repeated effective URLs that end a partition
    pub repeat_limit: u32,

    /// Refetches of a page after transport errors before the partition is abandoned
    pub transport_retries: u32,

    /// Sleep between transport retries (seconds)
    pub transport_retry_secs: u64,

    /// Lower bound of the inter-page delay (milliseconds)
    pub pacing_min_ms: u64,

    /// Upper bound of the inter-page delay (milliseconds)
    pub pacing_max_ms: u64,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            block_cooldown_secs: 90,
            block_retries: 2,
            empty_retry_secs: 15,
            empty_page_limit: 2,
            stagnation_limit: 3,
            repeat_limit: 2,
            transport_retries: 2,
            transport_retry_secs: 10,
            pacing_min_ms: 3000,
            pacing_max_ms: 5000,
        }
    }
}

/// HTTP session configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetcherConfig {
    /// Request timeout (seconds)
    pub timeout_secs: u64,

    /// Accept-Language header sent with every request
    pub accept_language: String,

    /// User agents, rotated by page index
    pub user_agents: Vec<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            accept_language: "pl-PL,pl;q=0.9,en-US;q=0.8,en;q=0.7".to_string(),
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/98.0.4758.102 Safari/537.36".to_string(),
                "Mozilla/5.0 (Windows NT 6.1; Win64; x64; rv:95.0) Gecko/20100101 Firefox/95.0".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 12_0_1) AppleWebKit/535.36 (KHTML, like Gecko) Chrome/99.0.4844.51 Safari/535.36".to_string(),
            ],
        }
    }
}

/// CSS selectors and text markers for listing extraction
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SelectorConfig {
    /// One element per listing; its `data-id` attribute is the listing id
    pub listing: String,
    pub title: String,
    pub link: String,
    pub price: String,
    pub mileage: String,
    pub fuel_type: String,
    pub gearbox: String,
    pub year: String,
    pub location: String,
    pub seller_type: String,

    /// Pagination items; the highest numeric one is the page count
    pub pagination: String,

    /// A paragraph containing one of these is the currency
    pub currency_markers: Vec<String>,

    /// A paragraph containing one of these is the description
    pub description_markers: Vec<String>,

    /// A paragraph containing one of these is the price indicator
    pub indicator_markers: Vec<String>,

    /// Case-insensitive page text marking an anti-bot response
    pub block_markers: Vec<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        let parameter = |name: &str| format!("dd[data-parameter='{}']", name);
        Self {
            listing: "article[data-id]".to_string(),
            title: "h2 a".to_string(),
            link: "h2 a".to_string(),
            price: "h3".to_string(),
            mileage: parameter("mileage"),
            fuel_type: parameter("fuel_type"),
            gearbox: parameter("gearbox"),
            year: parameter("year"),
            location: "dl p".to_string(),
            seller_type: "li".to_string(),
            pagination: "ul.ooa-1vdlgt7 li".to_string(),
            currency_markers: vec!["PLN".to_string(), "EUR".to_string()],
            description_markers: vec!["cm3".to_string(), "KM".to_string()],
            indicator_markers: vec!["średniej".to_string()],
            block_markers: vec!["captcha".to_string(), "zbyt wiele zapytań".to_string()],
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory holding the default per-query destinations
    pub directory: String,

    /// Format of the default destinations
    pub format: OutputFormat,

    /// File name prefix of the default destinations
    pub file_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "output".to_string(),
            format: OutputFormat::Csv,
            file_prefix: "otomoto_listings".to_string(),
        }
    }
}

/// A base query to crawl
#[derive(Debug, Clone, Deserialize)]
pub struct QueryEntry {
    /// Catalog search URL
    pub url: String,

    /// Explicit destination file; the format follows its extension
    #[serde(default)]
    pub destination: Option<String>,
}
