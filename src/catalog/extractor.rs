//! HTML extraction for catalog pages
//!
//! This module turns one fetched page into:
//! - The highest page index shown in the pagination
//! - The listing records on the page
//! - A verdict on whether the page is an anti-bot challenge

use crate::config::SelectorConfig;
use crate::record::{Record, RecordField};
use crate::HarvestError;
use chrono::Local;
use scraper::{ElementRef, Html, Selector};

/// Parses fetched pages into page counts and listing records
pub trait Extractor: Send + Sync {
    /// Highest page index visible in the pagination; 1 when there is none
    fn page_count(&self, html: &str) -> u32;

    /// Listing records on the page; empty when the page shows no listings
    fn listings(&self, html: &str) -> Vec<Record>;

    /// Whether the page is a block or CAPTCHA response
    fn is_blocked(&self, html: &str) -> bool;
}

/// CSS-selector based extractor
pub struct ScraperExtractor {
    listing: Selector,
    title: Selector,
    link: Selector,
    price: Selector,
    location: Selector,
    seller_type: Selector,
    paragraph: Selector,
    pagination: Selector,
    parameters: Vec<(RecordField, Selector)>,
    currency_markers: Vec<String>,
    description_markers: Vec<String>,
    indicator_markers: Vec<String>,
    block_markers: Vec<String>,
}

impl ScraperExtractor {
    /// Compiles the configured selectors
    ///
    /// # Returns
    ///
    /// * `Ok(ScraperExtractor)` - All selectors compiled
    /// * `Err(HarvestError::Selector)` - A selector failed to parse
    pub fn new(config: &SelectorConfig) -> Result<Self, HarvestError> {
        let parameters = vec![
            (RecordField::Mileage, compile(&config.mileage)?),
            (RecordField::FuelType, compile(&config.fuel_type)?),
            (RecordField::Gearbox, compile(&config.gearbox)?),
            (RecordField::Year, compile(&config.year)?),
        ];

        Ok(Self {
            listing: compile(&config.listing)?,
            title: compile(&config.title)?,
            link: compile(&config.link)?,
            price: compile(&config.price)?,
            location: compile(&config.location)?,
            seller_type: compile(&config.seller_type)?,
            paragraph: compile("p")?,
            pagination: compile(&config.pagination)?,
            parameters,
            currency_markers: config.currency_markers.clone(),
            description_markers: config.description_markers.clone(),
            indicator_markers: config.indicator_markers.clone(),
            block_markers: config
                .block_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
        })
    }

    fn parse_listing(&self, listing: ElementRef<'_>, scraped_at: &str) -> Record {
        let mut record = Record::default();

        if let Some(id) = listing.value().attr("data-id") {
            record.set(RecordField::ListingId, id.trim());
        }
        if let Some(title) = first_text(listing, &self.title) {
            record.set(RecordField::Title, title);
        }
        if let Some(href) = listing
            .select(&self.link)
            .next()
            .and_then(|a| a.value().attr("href"))
        {
            record.set(RecordField::Link, href.trim());
        }
        if let Some(price) = first_text(listing, &self.price) {
            record.set(RecordField::Price, price);
        }
        for (field, selector) in &self.parameters {
            if let Some(value) = first_text(listing, selector) {
                record.set(*field, value);
            }
        }
        if let Some(location) = first_text(listing, &self.location) {
            record.set(RecordField::Location, location);
        }
        if let Some(seller) = first_text(listing, &self.seller_type) {
            record.set(RecordField::SellerType, seller);
        }

        let paragraphs: Vec<String> = listing
            .select(&self.paragraph)
            .map(element_text)
            .filter(|t| !t.is_empty())
            .collect();
        if let Some(currency) = find_marked(&paragraphs, &self.currency_markers) {
            record.set(RecordField::Currency, currency);
        }
        if let Some(description) = find_marked(&paragraphs, &self.description_markers) {
            record.set(RecordField::Description, description);
        }
        if let Some(indicator) = find_marked(&paragraphs, &self.indicator_markers) {
            record.set(RecordField::PriceIndicator, indicator);
        }

        record.set(RecordField::ScrapedAt, scraped_at);
        record
    }
}

impl Extractor for ScraperExtractor {
    fn page_count(&self, html: &str) -> u32 {
        let document = Html::parse_document(html);
        document
            .select(&self.pagination)
            .filter_map(|item| element_text(item).parse::<u32>().ok())
            .max()
            .filter(|n| *n > 0)
            .unwrap_or(1)
    }

    fn listings(&self, html: &str) -> Vec<Record> {
        let document = Html::parse_document(html);
        let scraped_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        document
            .select(&self.listing)
            .map(|listing| self.parse_listing(listing, &scraped_at))
            .collect()
    }

    fn is_blocked(&self, html: &str) -> bool {
        if self.block_markers.is_empty() {
            return false;
        }
        let document = Html::parse_document(html);
        let text = document
            .root_element()
            .text()
            .collect::<String>()
            .to_lowercase();
        self.block_markers.iter().any(|m| text.contains(m.as_str()))
    }
}

fn compile(selector: &str) -> Result<Selector, HarvestError> {
    Selector::parse(selector).map_err(|e| HarvestError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// Whitespace-collapsed text of an element
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .map(element_text)
        .find(|t| !t.is_empty())
}

fn find_marked(paragraphs: &[String], markers: &[String]) -> Option<String> {
    paragraphs
        .iter()
        .find(|p| markers.iter().any(|m| p.contains(m.as_str())))
        .cloned()
}
