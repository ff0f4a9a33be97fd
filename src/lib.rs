//! PubMed Harvester: bulk bibliographic-record harvesting
//!
//! This crate retrieves every identifier matching a search expression from the
//! NCBI E-utilities search endpoint, working around its per-query result cap by
//! partitioning the date range into windows, then fetches full records in
//! batches and persists them to a resumable JSON checkpoint.

pub mod checkpoint;
pub mod config;
pub mod harvest;
pub mod output;
pub mod record;

use thiserror::Error;

/// Main error type for harvester operations
///
/// Only failures that must stop the process end up here. Transient remote
/// failures are modelled by [`harvest::Failure`] and handled per unit of work.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Checkpoint error: {0}")]
    Store(#[from] checkpoint::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Missing required search query")]
    MissingQuery,

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),
}

/// Result type alias for harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use checkpoint::Checkpoint;
pub use config::Config;
pub use harvest::{Failure, HarvestReport, Harvester, RetryPolicy, Window};
pub use record::Record;
