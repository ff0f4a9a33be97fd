//! Harvest module: identifier search and record fetching
//!
//! This module contains the core harvesting logic, including:
//! - HTTP access to the search and detail endpoints
//! - Retry with exponential backoff for every remote call
//! - Count estimation and paged identifier collection
//! - Date-window partitioning around the per-query result cap
//! - Batched detail fetching with persistence after every batch

mod client;
mod coordinator;
mod details;
mod partition;
mod retry;
mod search;

pub use client::{build_http_client, user_agent_string, EutilsClient, SearchPage};
pub use coordinator::{planned_windows, run_harvest, HarvestReport, Harvester};
pub use details::{DetailBatchFetcher, FetchReport};
pub use partition::{windows, TimePartitioner, Window};
pub use retry::{Failure, RetryPolicy};
pub use search::{CountEstimator, IdPaginator};
