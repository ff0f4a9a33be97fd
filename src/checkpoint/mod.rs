//! Checkpoint: the persisted record set
//!
//! The checkpoint is both the harvest deliverable and its resume point. It is
//! loaded once at startup, consulted to skip identifiers that were already
//! fetched, and rewritten after every successful batch.
//!
//! The whole corpus is serialized on each save, so a save costs time
//! proportional to the number of records fetched so far. That is fine for
//! tens of thousands of records; much larger corpora would want an append log.

mod json;
mod traits;

pub use json::JsonFileStore;
pub use traits::{RecordStore, StoreError, StoreResult};

use crate::record::Record;
use std::collections::HashSet;
use std::path::Path;

/// In-memory view of the stored records, keyed by identifier
pub struct Checkpoint<S: RecordStore = JsonFileStore> {
    store: S,
    records: Vec<Record>,
    identifiers: HashSet<String>,
}

impl Checkpoint<JsonFileStore> {
    /// Opens the JSON checkpoint at `path`; a missing file yields an empty checkpoint
    pub fn open(path: &Path) -> StoreResult<Self> {
        Self::load(JsonFileStore::new(path))
    }
}

impl<S: RecordStore> Checkpoint<S> {
    /// Loads the records held by `store`
    ///
    /// Duplicate identifiers left by older tools are collapsed (first record
    /// wins). Records without an identifier are kept in the output but can
    /// never satisfy a lookup.
    pub fn load(store: S) -> StoreResult<Self> {
        let stored = store.load()?;
        let loaded = stored.len();

        let mut checkpoint = Self {
            store,
            records: Vec::with_capacity(loaded),
            identifiers: HashSet::with_capacity(loaded),
        };

        let mut unkeyed = 0usize;
        for record in stored {
            if record.pmid.is_empty() {
                unkeyed += 1;
                checkpoint.records.push(record);
            } else {
                checkpoint.insert(record);
            }
        }

        let duplicates = loaded - checkpoint.records.len();
        if duplicates > 0 {
            tracing::warn!(
                "Dropped {} duplicate records while loading {}",
                duplicates,
                checkpoint.store.location()
            );
        }
        if unkeyed > 0 {
            tracing::warn!(
                "{} records in {} have no identifier",
                unkeyed,
                checkpoint.store.location()
            );
        }

        tracing::info!(
            "Loaded {} records from {}",
            checkpoint.records.len(),
            checkpoint.store.location()
        );

        Ok(checkpoint)
    }

    /// Returns true if a record with this identifier is already stored
    pub fn contains(&self, identifier: &str) -> bool {
        self.identifiers.contains(identifier)
    }

    /// Adds a record unless its identifier is empty or already present
    ///
    /// Returns true when the record was added.
    pub fn insert(&mut self, record: Record) -> bool {
        if record.pmid.is_empty() || !self.identifiers.insert(record.pmid.clone()) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Writes the full record set to the backing store
    pub fn save(&self) -> StoreResult<()> {
        self.store.save(&self.records)
    }

    /// All records in insertion order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records are held
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Location of the backing store, for log messages
    pub fn location(&self) -> String {
        self.store.location()
    }
}
