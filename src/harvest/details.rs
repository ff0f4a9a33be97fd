//! Batched detail fetching
//!
//! Identifiers missing from the checkpoint are fetched in fixed-size batches.
//! Each successful batch is merged into the checkpoint and persisted before
//! the next request, so an interrupted harvest loses at most the batch in
//! flight.

use crate::checkpoint::{Checkpoint, RecordStore};
use crate::harvest::client::EutilsClient;
use crate::harvest::{Failure, RetryPolicy};
use crate::record::{parse_article_set, Record};
use std::collections::HashSet;
use std::time::Duration;

/// Outcome of a [`DetailBatchFetcher::fetch`] run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Identifiers skipped because the checkpoint already had them
    pub already_present: usize,
    /// Batches requested
    pub batches: usize,
    /// Batches skipped after exhausting retries
    pub failed_batches: usize,
    /// Records added to the checkpoint
    pub fetched: usize,
}

/// Fetches full records for identifiers in batches
pub struct DetailBatchFetcher<'a> {
    client: &'a EutilsClient,
    retry: &'a RetryPolicy,
    batch_size: usize,
    batch_delay: Duration,
}

impl<'a> DetailBatchFetcher<'a> {
    pub fn new(
        client: &'a EutilsClient,
        retry: &'a RetryPolicy,
        batch_size: usize,
        batch_delay: Duration,
    ) -> Self {
        Self {
            client,
            retry,
            batch_size: batch_size.max(1),
            batch_delay,
        }
    }

    /// Fetches every identifier not yet in `checkpoint`
    ///
    /// A batch that still fails after all retries is logged and skipped;
    /// running the harvest again picks it up. Failing to persist the
    /// checkpoint is fatal and returned as an error.
    pub async fn fetch<S: RecordStore>(
        &self,
        identifiers: &[String],
        checkpoint: &mut Checkpoint<S>,
    ) -> crate::Result<FetchReport> {
        let mut report = FetchReport::default();
        let mut queued: HashSet<&str> = HashSet::new();
        let mut missing: Vec<String> = Vec::new();

        for id in identifiers {
            if checkpoint.contains(id) {
                report.already_present += 1;
            } else if queued.insert(id.as_str()) {
                missing.push(id.clone());
            }
        }

        let total_batches = missing.len().div_ceil(self.batch_size);
        tracing::info!(
            "{} identifiers to fetch in {} batches ({} already in {})",
            missing.len(),
            total_batches,
            report.already_present,
            checkpoint.location()
        );

        for (index, batch) in missing.chunks(self.batch_size).enumerate() {
            report.batches += 1;
            let label = format!("detail batch {}/{}", index + 1, total_batches);

            let records = match self
                .retry
                .execute(&label, || self.fetch_batch(batch))
                .await
            {
                Ok(records) => records,
                Err(e) => {
                    tracing::error!("Skipping {}: {}", label, e);
                    report.failed_batches += 1;
                    continue;
                }
            };

            let mut added = 0;
            for record in records {
                if checkpoint.insert(record) {
                    added += 1;
                }
            }
            if added < batch.len() {
                tracing::warn!(
                    "{}: requested {} identifiers, received {} new records",
                    label,
                    batch.len(),
                    added
                );
            }

            checkpoint.save()?;
            report.fetched += added;
            tracing::info!(
                "Fetched {}. Total records: {}",
                label,
                checkpoint.len()
            );

            tokio::time::sleep(self.batch_delay).await;
        }

        Ok(report)
    }

    /// One detail request, parsed into records
    async fn fetch_batch(&self, batch: &[String]) -> Result<Vec<Record>, Failure> {
        let xml = self.client.fetch(batch).await?;
        let articles = parse_article_set(&xml).map_err(|e| {
            let preview: String = xml.chars().take(200).collect();
            Failure::Parse(format!("{} (response starts with {:?})", e, preview))
        })?;

        let mut records = Vec::with_capacity(articles.len());
        for article in articles {
            let record = article.into_record();
            if record.pmid.is_empty() {
                tracing::warn!("Dropping article without identifier: {:?}", record.title);
                continue;
            }
            records.push(record);
        }
        Ok(records)
    }
}
