//! Harvest coordinator - wires the components together
//!
//! A harvest runs in two phases:
//! 1. Identifier collection, either window by window over a date range or as
//!    a single capped query
//! 2. Detail fetching for identifiers missing from the checkpoint
//!
//! All remote calls are made one after another from a single task. The
//! checkpoint is owned by the harvester for the duration of the run.

use crate::checkpoint::Checkpoint;
use crate::config::Config;
use crate::harvest::client::EutilsClient;
use crate::harvest::details::DetailBatchFetcher;
use crate::harvest::partition::{windows, TimePartitioner, Window};
use crate::harvest::search::{CountEstimator, IdPaginator};
use crate::harvest::RetryPolicy;
use std::path::Path;
use std::time::{Duration, Instant};

/// Summary of a completed harvest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestReport {
    /// Distinct identifiers returned by the search phase
    pub identifiers_found: usize,
    /// Identifiers skipped because the checkpoint already had them
    pub already_present: usize,
    /// Records added in this run
    pub fetched: usize,
    /// Detail batches skipped after exhausting retries
    pub failed_batches: usize,
    /// Records in the checkpoint at the end of the run
    pub total_records: usize,
}

/// Main harvester structure
pub struct Harvester {
    config: Config,
    client: EutilsClient,
    retry: RetryPolicy,
    checkpoint: Checkpoint,
}

impl Harvester {
    /// Creates a harvester and loads the checkpoint named in the configuration
    ///
    /// The configuration is expected to be validated already.
    pub fn new(config: Config) -> crate::Result<Self> {
        let client = EutilsClient::new(&config)?;
        let retry = RetryPolicy::from_config(&config.retry);
        let checkpoint = Checkpoint::open(Path::new(&config.output.records_path))?;

        Ok(Self {
            config,
            client,
            retry,
            checkpoint,
        })
    }

    /// Records currently held in the checkpoint
    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    /// The date windows a run would query, or `None` in single-window mode
    pub fn planned_windows(&self) -> Option<Vec<Window>> {
        planned_windows(&self.config)
    }

    /// Runs the search phase followed by the detail phase
    pub async fn run(&mut self) -> crate::Result<HarvestReport> {
        let start_time = Instant::now();
        let identifiers = self.collect_identifiers().await;

        tracing::info!(
            "Collected {} identifiers, fetching details",
            identifiers.len()
        );

        let pacing = &self.config.pacing;
        let fetcher = DetailBatchFetcher::new(
            &self.client,
            &self.retry,
            pacing.batch_size,
            Duration::from_millis(pacing.batch_delay_ms),
        );
        let fetched = fetcher.fetch(&identifiers, &mut self.checkpoint).await?;

        let report = HarvestReport {
            identifiers_found: identifiers.len(),
            already_present: fetched.already_present,
            fetched: fetched.fetched,
            failed_batches: fetched.failed_batches,
            total_records: self.checkpoint.len(),
        };

        if report.failed_batches > 0 {
            tracing::warn!(
                "{} batches failed; run the harvest again to retry them",
                report.failed_batches
            );
        }
        tracing::info!(
            "Harvest completed in {:?}: {} new records, {} total in {}",
            start_time.elapsed(),
            report.fetched,
            report.total_records,
            self.checkpoint.location()
        );

        Ok(report)
    }

    /// Search phase: distinct identifiers for the configured query
    async fn collect_identifiers(&self) -> Vec<String> {
        let query = &self.config.query;
        let cap = self.config.endpoint.result_cap;

        let page_delay = Duration::from_millis(self.config.pacing.page_delay_ms);
        let counter = CountEstimator::new(&self.client, &self.retry).with_delay(page_delay);
        let paginator = IdPaginator::new(
            &self.client,
            &self.retry,
            self.config.pacing.page_size,
            page_delay,
        );

        match (query.start_date, query.end_date) {
            (Some(start), Some(end)) => {
                tracing::info!(
                    "Searching for {:?} from {} to {}",
                    query.term,
                    start,
                    end
                );
                TimePartitioner::new(counter, paginator, cap, query.window_days)
                    .with_split_oversized(query.split_oversized_windows)
                    .harvest(&query.term, start, end)
                    .await
            }
            _ => {
                let mut retmax = query.max_results;
                if retmax > cap {
                    tracing::warn!(
                        "max_results {} exceeds the per-query cap of {}; use a date range to fetch more",
                        retmax,
                        cap
                    );
                    retmax = cap;
                }
                tracing::info!(
                    "Searching for {:?} (max {} results)",
                    query.term,
                    retmax
                );

                let mut ids = paginator.paginate(&query.term, retmax).await;
                let mut seen = std::collections::HashSet::new();
                ids.retain(|id| seen.insert(id.clone()));
                ids
            }
        }
    }
}

/// The date windows described by `config`, or `None` without a date range
pub fn planned_windows(config: &Config) -> Option<Vec<Window>> {
    match (config.query.start_date, config.query.end_date) {
        (Some(start), Some(end)) => Some(windows(start, end, config.query.window_days)),
        _ => None,
    }
}

/// Runs a complete harvest for `config`
///
/// This is the main entry point: it loads the checkpoint, collects
/// identifiers, fetches the missing records and returns a summary.
pub async fn run_harvest(config: Config) -> crate::Result<HarvestReport> {
    let mut harvester = Harvester::new(config)?;
    harvester.run().await
}
