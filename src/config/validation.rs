use crate::catalog::Query;
use crate::config::types::{
    Config, CrawlerConfig, FetcherConfig, OutputConfig, QueryEntry, SelectorConfig, WalkerConfig,
};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_walker_config(&config.walker)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_selector_config(&config.selectors)?;
    validate_output_config(&config.output)?;
    validate_queries(&config.query)?;
    Ok(())
}

/// Validates planning and scheduling configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.max_concurrent_queries < 1 || config.max_concurrent_queries > 16 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-queries must be between 1 and 16, got {}",
            config.max_concurrent_queries
        )));
    }

    if config.year_window < 1 {
        return Err(ConfigError::Validation(format!(
            "year-window must be >= 1, got {}",
            config.year_window
        )));
    }

    if let Some(last) = config.last_year {
        if last < config.first_year {
            return Err(ConfigError::Validation(format!(
                "last-year ({}) must not precede first-year ({})",
                last, config.first_year
            )));
        }
    }

    Ok(())
}

/// Validates walker thresholds and delays
fn validate_walker_config(config: &WalkerConfig) -> Result<(), ConfigError> {
    if config.pacing_min_ms > config.pacing_max_ms {
        return Err(ConfigError::Validation(format!(
            "pacing-min-ms ({}) must not exceed pacing-max-ms ({})",
            config.pacing_min_ms, config.pacing_max_ms
        )));
    }

    for (name, value) in [
        ("empty-page-limit", config.empty_page_limit),
        ("stagnation-limit", config.stagnation_limit),
        ("repeat-limit", config.repeat_limit),
    ] {
        if value < 1 {
            return Err(ConfigError::Validation(format!(
                "{} must be >= 1, got {}",
                name, value
            )));
        }
    }

    Ok(())
}

/// Validates HTTP session configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 || config.timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be between 1 and 300, got {}",
            config.timeout_secs
        )));
    }

    if config.user_agents.is_empty() {
        return Err(ConfigError::Validation(
            "user-agents cannot be empty".to_string(),
        ));
    }

    if config.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user-agents cannot contain blank entries".to_string(),
        ));
    }

    Ok(())
}

/// Validates that no selector is blank; syntax is checked when the extractor is built
fn validate_selector_config(config: &SelectorConfig) -> Result<(), ConfigError> {
    let selectors = [
        ("listing", &config.listing),
        ("title", &config.title),
        ("link", &config.link),
        ("price", &config.price),
        ("mileage", &config.mileage),
        ("fuel-type", &config.fuel_type),
        ("gearbox", &config.gearbox),
        ("year", &config.year),
        ("location", &config.location),
        ("seller-type", &config.seller_type),
        ("pagination", &config.pagination),
    ];

    for (name, selector) in selectors {
        if selector.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "selector '{}' cannot be empty",
                name
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.file_prefix.is_empty() || config.file_prefix.contains(['/', '\\']) {
        return Err(ConfigError::Validation(format!(
            "file-prefix must be a plain file name, got '{}'",
            config.file_prefix
        )));
    }

    Ok(())
}

/// Validates base query URLs
fn validate_queries(queries: &[QueryEntry]) -> Result<(), ConfigError> {
    for entry in queries {
        Query::parse(&entry.url).map_err(|e| ConfigError::InvalidQuery(e.to_string()))?;

        if let Some(destination) = &entry.destination {
            if destination.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "destination for '{}' cannot be empty",
                    entry.url
                )));
            }
        }
    }

    Ok(())
}
