//! Record store trait and error types

use crate::record::Record;
use thiserror::Error;

/// Errors that can occur while loading or persisting records
///
/// Every variant is fatal for a harvest: the process must not report
/// progress it cannot persist.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Corrupt record file {path}: {source}")]
    Corrupt {
        path: String,
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Backing storage for the checkpoint
///
/// `save` always receives the complete record set; implementations replace
/// the previous contents wholesale.
pub trait RecordStore {
    /// Loads every stored record; an absent store yields an empty list
    fn load(&self) -> StoreResult<Vec<Record>>;

    /// Replaces the stored records
    ///
    /// A failure part-way through must leave the previously saved state
    /// readable.
    fn save(&self, records: &[Record]) -> StoreResult<()>;

    /// Human-readable location for log messages
    fn location(&self) -> String;
}
