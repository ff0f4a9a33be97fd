//! Configuration module for the harvester
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default; the command line can override the common ones.
//!
//! # Example
//!
//! ```no_run
//! use pubmed_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Harvesting: {}", config.query.term);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, EndpointConfig, OutputConfig, PacingConfig, QueryConfig, RetryConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, parse_config, parse_config_with_hash};
pub use validation::validate;
