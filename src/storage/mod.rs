//! Storage module for persisting harvested records
//!
//! This module handles every write the crawler makes, including:
//! - The destination interface and its CSV and SQLite implementations
//! - Fingerprint-based deduplication across pages, partitions and runs
//! - Rebuilding the known set from persisted content on every open

mod csv_file;
mod result_store;
mod schema;
mod sqlite;
mod traits;

pub use csv_file::CsvDestination;
pub use result_store::ResultStore;
pub use sqlite::SqliteDestination;
pub use traits::{Destination, KnownFingerprints, StoreError, StoreResult};

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// On-disk format of a destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Sqlite,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Sqlite => "db",
        }
    }

    /// Guesses the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "csv" => Some(Self::Csv),
            "db" | "sqlite" | "sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => f.write_str("csv"),
            Self::Sqlite => f.write_str("sqlite"),
        }
    }
}

/// Where one base query's records go
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputTarget {
    pub path: PathBuf,
    pub format: OutputFormat,
}

impl OutputTarget {
    pub fn new(path: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    /// Target whose format follows the file extension, defaulting to CSV
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = OutputFormat::from_path(&path).unwrap_or_default();
        Self { path, format }
    }
}

/// Opens the destination described by a target
///
/// # Arguments
///
/// * `target` - Path and format of the destination
///
/// # Returns
///
/// * `Ok(Box<dyn Destination>)` - Destination ready to load and append
/// * `Err(StoreError)` - Failed to open the destination
pub fn open_destination(target: &OutputTarget) -> StoreResult<Box<dyn Destination>> {
    match target.format {
        OutputFormat::Csv => Ok(Box::new(CsvDestination::new(&target.path))),
        OutputFormat::Sqlite => Ok(Box::new(SqliteDestination::open(&target.path)?)),
    }
}

/// Opens a [`ResultStore`] over the destination described by a target
pub fn open_store(target: &OutputTarget) -> StoreResult<ResultStore> {
    ResultStore::open(open_destination(target)?)
}
