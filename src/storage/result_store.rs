//! Resumable, deduplicating record sink
//!
//! A [`ResultStore`] is the only writer of its destination. On open it rebuilds the
//! set of known fingerprints from whatever the destination already holds; after that
//! it appends a record only if its fingerprint is new.

use crate::record::{Fingerprint, Record};
use crate::storage::traits::{Destination, KnownFingerprints, StoreResult};
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Deduplicating, append-only sink in front of one destination
pub struct ResultStore {
    destination: Box<dyn Destination>,
    known: HashSet<Fingerprint>,
}

impl ResultStore {
    /// Opens a store and seeds its known set from the destination's content
    ///
    /// # Arguments
    ///
    /// * `destination` - Where records live; may not exist yet
    ///
    /// # Returns
    ///
    /// * `Ok(ResultStore)` - Store ready for appends
    /// * `Err(StoreError)` - The existing content could not be read
    pub fn open(mut destination: Box<dyn Destination>) -> StoreResult<Self> {
        let existing = destination.load()?;
        let loaded = existing.len();
        let known: HashSet<Fingerprint> = existing.iter().map(Fingerprint::of).collect();

        if loaded > 0 {
            tracing::info!(
                "Loaded {} rows from {} ({} unique)",
                loaded,
                destination.describe(),
                known.len()
            );
        } else {
            tracing::info!("{} is empty, starting fresh", destination.describe());
        }

        Ok(Self { destination, known })
    }

    /// Appends a record unless its fingerprint is already known
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The record was new and has been written
    /// * `Ok(false)` - The record was a duplicate; nothing was written
    /// * `Err(StoreError)` - The write failed; the record stays unknown
    pub fn try_append(&mut self, record: &Record) -> StoreResult<bool> {
        let fingerprint = Fingerprint::of(record);
        if self.known.contains(&fingerprint) {
            return Ok(false);
        }

        self.destination.append(std::slice::from_ref(record))?;
        self.known.insert(fingerprint);
        Ok(true)
    }

    /// Number of distinct fingerprints known to this store
    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    pub fn describe(&self) -> String {
        self.destination.describe()
    }
}

impl KnownFingerprints for ResultStore {
    fn is_known(&self, fingerprint: &Fingerprint) -> bool {
        self.known.contains(fingerprint)
    }
}

impl KnownFingerprints for Mutex<ResultStore> {
    fn is_known(&self, fingerprint: &Fingerprint) -> bool {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_known(fingerprint)
    }
}
