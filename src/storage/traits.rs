//! Destination trait and storage error types
//!
//! This module defines the interface every record destination implements and the
//! errors storage operations can raise.

use crate::record::{Fingerprint, Record};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// An append-capable, re-readable record store
///
/// Destinations carry no primary key; uniqueness is enforced by the
/// [`ResultStore`](crate::storage::ResultStore) in front of them.
pub trait Destination: Send {
    /// Reads every record currently persisted; a destination that does not exist
    /// yet reads as empty
    fn load(&mut self) -> StoreResult<Vec<Record>>;

    /// Appends records after the existing content without rewriting it
    fn append(&mut self, records: &[Record]) -> StoreResult<()>;

    /// Human-readable location, used in logs
    fn describe(&self) -> String;
}

/// Read-only view of the fingerprints a destination already holds
pub trait KnownFingerprints {
    fn is_known(&self, fingerprint: &Fingerprint) -> bool;
}

impl KnownFingerprints for HashSet<Fingerprint> {
    fn is_known(&self, fingerprint: &Fingerprint) -> bool {
        self.contains(fingerprint)
    }
}
