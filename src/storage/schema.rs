//! Database schema for the SQLite destination

/// SQL schema for the listings table
///
/// No primary key beyond the implicit rowid; uniqueness is a fingerprint concern.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS listings (
    listing_id TEXT,
    title TEXT,
    link TEXT,
    description TEXT,
    mileage TEXT,
    fuel_type TEXT,
    gearbox TEXT,
    year TEXT,
    location TEXT,
    seller_type TEXT,
    price TEXT,
    currency TEXT,
    price_indicator TEXT,
    scraped_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_listings_listing_id ON listings(listing_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
