//! Listing records and their deduplication keys
//!
//! A [`Record`] is one listing as rendered on one catalog page. Every field is
//! optional; an extractor leaves a field empty when the page does not carry it.

mod fingerprint;

pub use fingerprint::{Fingerprint, FINGERPRINT_FIELDS};

use serde::{Deserialize, Serialize};

/// Placeholder that legacy flat files carry for a missing field
const MISSING_MARKER: &str = "N/A";

/// True when a raw value stands for a missing field
pub(crate) fn is_missing(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == MISSING_MARKER
}

/// Named fields of a listing record
///
/// The order of [`RecordField::ALL`] is the column order used by every destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    ListingId,
    Title,
    Link,
    Description,
    Mileage,
    FuelType,
    Gearbox,
    Year,
    Location,
    SellerType,
    Price,
    Currency,
    PriceIndicator,
    ScrapedAt,
}

impl RecordField {
    /// All fields in column order
    pub const ALL: [RecordField; 14] = [
        Self::ListingId,
        Self::Title,
        Self::Link,
        Self::Description,
        Self::Mileage,
        Self::FuelType,
        Self::Gearbox,
        Self::Year,
        Self::Location,
        Self::SellerType,
        Self::Price,
        Self::Currency,
        Self::PriceIndicator,
        Self::ScrapedAt,
    ];

    /// Column header used in flat-file destinations
    pub fn header(&self) -> &'static str {
        match self {
            Self::ListingId => "ID",
            Self::Title => "Title",
            Self::Link => "Link",
            Self::Description => "Description",
            Self::Mileage => "Mileage",
            Self::FuelType => "Fuel Type",
            Self::Gearbox => "Gearbox",
            Self::Year => "Year",
            Self::Location => "Location",
            Self::SellerType => "Seller Type",
            Self::Price => "Price",
            Self::Currency => "Currency",
            Self::PriceIndicator => "Price Indicator",
            Self::ScrapedAt => "Scraping Date",
        }
    }

    /// Column name used in table destinations
    pub fn column(&self) -> &'static str {
        match self {
            Self::ListingId => "listing_id",
            Self::Title => "title",
            Self::Link => "link",
            Self::Description => "description",
            Self::Mileage => "mileage",
            Self::FuelType => "fuel_type",
            Self::Gearbox => "gearbox",
            Self::Year => "year",
            Self::Location => "location",
            Self::SellerType => "seller_type",
            Self::Price => "price",
            Self::Currency => "currency",
            Self::PriceIndicator => "price_indicator",
            Self::ScrapedAt => "scraped_at",
        }
    }
}

/// One listing extracted from one catalog page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    #[serde(rename = "ID")]
    pub listing_id: Option<String>,

    #[serde(rename = "Title")]
    pub title: Option<String>,

    #[serde(rename = "Link")]
    pub link: Option<String>,

    #[serde(rename = "Description")]
    pub description: Option<String>,

    #[serde(rename = "Mileage")]
    pub mileage: Option<String>,

    #[serde(rename = "Fuel Type")]
    pub fuel_type: Option<String>,

    #[serde(rename = "Gearbox")]
    pub gearbox: Option<String>,

    #[serde(rename = "Year")]
    pub year: Option<String>,

    #[serde(rename = "Location")]
    pub location: Option<String>,

    #[serde(rename = "Seller Type")]
    pub seller_type: Option<String>,

    #[serde(rename = "Price")]
    pub price: Option<String>,

    #[serde(rename = "Currency")]
    pub currency: Option<String>,

    #[serde(rename = "Price Indicator", alias = "Otomoto Indicator")]
    pub price_indicator: Option<String>,

    #[serde(rename = "Scraping Date")]
    pub scraped_at: Option<String>,
}

impl Record {
    /// Returns the value of a field, if present
    pub fn get(&self, field: RecordField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    /// Sets a field; blank values and the `N/A` placeholder are stored as absent
    pub fn set(&mut self, field: RecordField, value: impl Into<String>) {
        let value = value.into();
        *self.slot_mut(field) = if is_missing(&value) {
            None
        } else {
            Some(value)
        };
    }

    /// Builder-style variant of [`Record::set`]
    pub fn with(mut self, field: RecordField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Computes the deduplication key of this record
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self)
    }

    fn slot(&self, field: RecordField) -> &Option<String> {
        match field {
            RecordField::ListingId => &self.listing_id,
            RecordField::Title => &self.title,
            RecordField::Link => &self.link,
            RecordField::Description => &self.description,
            RecordField::Mileage => &self.mileage,
            RecordField::FuelType => &self.fuel_type,
            RecordField::Gearbox => &self.gearbox,
            RecordField::Year => &self.year,
            RecordField::Location => &self.location,
            RecordField::SellerType => &self.seller_type,
            RecordField::Price => &self.price,
            RecordField::Currency => &self.currency,
            RecordField::PriceIndicator => &self.price_indicator,
            RecordField::ScrapedAt => &self.scraped_at,
        }
    }

    fn slot_mut(&mut self, field: RecordField) -> &mut Option<String> {
        match field {
            RecordField::ListingId => &mut self.listing_id,
            RecordField::Title => &mut self.title,
            RecordField::Link => &mut self.link,
            RecordField::Description => &mut self.description,
            RecordField::Mileage => &mut self.mileage,
            RecordField::FuelType => &mut self.fuel_type,
            RecordField::Gearbox => &mut self.gearbox,
            RecordField::Year => &mut self.year,
            RecordField::Location => &mut self.location,
            RecordField::SellerType => &mut self.seller_type,
            RecordField::Price => &mut self.price,
            RecordField::Currency => &mut self.currency,
            RecordField::PriceIndicator => &mut self.price_indicator,
            RecordField::ScrapedAt => &mut self.scraped_at,
        }
    }
}
