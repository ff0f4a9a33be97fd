//! Identifier search: total counts and paged identifier lists

use crate::harvest::client::EutilsClient;
use crate::harvest::partition::Window;
use crate::harvest::RetryPolicy;
use std::time::Duration;

/// Asks the search endpoint how many records match, without fetching them
///
/// Runs of empty windows or repeated bisection issue one count request per
/// window, so a pacing delay can be set with [`CountEstimator::with_delay`].
pub struct CountEstimator<'a> {
    client: &'a EutilsClient,
    retry: &'a RetryPolicy,
    delay: Duration,
}

impl<'a> CountEstimator<'a> {
    pub fn new(client: &'a EutilsClient, retry: &'a RetryPolicy) -> Self {
        Self {
            client,
            retry,
            delay: Duration::ZERO,
        }
    }

    /// Sleep for `delay` after every count request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns the match count for `term`, restricted to `window` if given
    ///
    /// Any failure is logged and reported as 0: a window that cannot be
    /// counted is treated as having nothing to fetch.
    pub async fn count(&self, term: &str, window: Option<&Window>) -> u64 {
        let scoped;
        let term = match window {
            Some(window) => {
                scoped = window.scoped_query(term);
                scoped.as_str()
            }
            None => term,
        };

        let result = self
            .retry
            .execute("count", || self.client.search(term, 0, 0))
            .await;
        tokio::time::sleep(self.delay).await;

        match result {
            Ok(page) => page.count,
            Err(e) => {
                tracing::error!("Could not count results for query {:?}: {}", term, e);
                0
            }
        }
    }
}

/// Pages through one query's result set, accumulating identifiers
pub struct IdPaginator<'a> {
    client: &'a EutilsClient,
    retry: &'a RetryPolicy,
    page_size: u32,
    page_delay: Duration,
}

impl<'a> IdPaginator<'a> {
    pub fn new(
        client: &'a EutilsClient,
        retry: &'a RetryPolicy,
        page_size: u32,
        page_delay: Duration,
    ) -> Self {
        Self {
            client,
            retry,
            page_size: page_size.max(1),
            page_delay,
        }
    }

    /// Collects up to `retmax` identifiers for `term`, in result order
    ///
    /// Stops early when a page comes back empty. When a page cannot be
    /// fetched after all retries, the identifiers gathered so far are
    /// returned. The caller is responsible for keeping `retmax` within the
    /// endpoint's per-query cap.
    pub async fn paginate(&self, term: &str, retmax: u32) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        let mut retstart: u32 = 0;

        while retstart < retmax {
            let size = self.page_size.min(retmax - retstart);
            let label = format!("search page at offset {}", retstart);

            let page = match self
                .retry
                .execute(&label, || self.client.search(term, size, retstart))
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(
                        "Identifier list truncated at offset {} ({} collected): {}",
                        retstart,
                        ids.len(),
                        e
                    );
                    break;
                }
            };

            if page.ids.is_empty() {
                tracing::debug!("No more identifiers after offset {}", retstart);
                break;
            }

            retstart = retstart.saturating_add(page.ids.len() as u32);
            ids.extend(page.ids);
            tracing::info!("Fetched {} identifiers so far", ids.len());

            tokio::time::sleep(self.page_delay).await;
        }

        ids
    }
}
