use super::{is_missing, Record, RecordField};
use std::fmt;

/// Fields that identify a listing, in key order
///
/// Listing ids and scrape timestamps are excluded: the same listing can reappear
/// under a re-issued id.
pub const FINGERPRINT_FIELDS: [RecordField; 9] = [
    RecordField::Title,
    RecordField::Description,
    RecordField::Mileage,
    RecordField::FuelType,
    RecordField::Gearbox,
    RecordField::Year,
    RecordField::Location,
    RecordField::SellerType,
    RecordField::Price,
];

/// ASCII unit separator; never produced by the extractor's trimmed text
const DELIMITER: char = '\u{1f}';

/// Deduplication key of a [`Record`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Builds the key from the trimmed [`FINGERPRINT_FIELDS`]
    ///
    /// Missing fields count as empty, including fields holding the `N/A` placeholder.
    pub fn of(record: &Record) -> Self {
        let mut key = String::new();
        for (i, field) in FINGERPRINT_FIELDS.iter().enumerate() {
            if i > 0 {
                key.push(DELIMITER);
            }
            let value = record.get(*field).unwrap_or("");
            if !is_missing(value) {
                key.push_str(value.trim());
            }
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.replace(DELIMITER, "|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record::default()
            .with(RecordField::ListingId, "6112345678")
            .with(RecordField::Title, "Skoda Octavia 2.0 TDI")
            .with(RecordField::Description, "1968 cm3 • 150 KM")
            .with(RecordField::Mileage, "182 000 km")
            .with(RecordField::FuelType, "Diesel")
            .with(RecordField::Gearbox, "Manualna")
            .with(RecordField::Year, "2016")
            .with(RecordField::Location, "Poznań")
            .with(RecordField::SellerType, "Prywatny sprzedawca")
            .with(RecordField::Price, "42 900")
            .with(RecordField::ScrapedAt, "2024-03-01 10:00:00")
    }

    #[test]
    fn test_fingerprint_is_idempotent() {
        let record = sample();
        assert_eq!(Fingerprint::of(&record), Fingerprint::of(&record));
    }

    #[test]
    fn test_reissued_id_and_timestamp_do_not_matter() {
        let a = sample();
        let b = sample()
            .with(RecordField::ListingId, "6119999999")
            .with(RecordField::ScrapedAt, "2024-03-02 18:30:00")
            .with(RecordField::Link, "https://example.com/other-link");

        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_dedup_fields_matter() {
        let a = sample();
        let b = sample().with(RecordField::Price, "41 900");
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let a = sample();
        let mut b = sample();
        b.title = Some("  Skoda Octavia 2.0 TDI\n".to_string());
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_missing_fields_are_empty() {
        let fingerprint = Fingerprint::of(&Record::default());
        assert_eq!(fingerprint.as_str().len(), FINGERPRINT_FIELDS.len() - 1);
        assert_eq!(fingerprint.to_string(), "||||||||");
    }

    #[test]
    fn test_placeholder_matches_missing_field() {
        let mut legacy = sample();
        legacy.seller_type = Some("N/A".to_string());
        legacy.location = Some(" N/A".to_string());

        let mut extracted = sample();
        extracted.seller_type = None;
        extracted.location = None;

        assert_eq!(legacy.fingerprint(), extracted.fingerprint());
    }

    #[test]
    fn test_field_order_is_significant() {
        let a = Record::default()
            .with(RecordField::Title, "x")
            .with(RecordField::Description, "y");
        let b = Record::default()
            .with(RecordField::Title, "y")
            .with(RecordField::Description, "x");
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
