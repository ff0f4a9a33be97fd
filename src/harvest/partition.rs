//! Date-window partitioning
//!
//! The search endpoint will page through at most a fixed number of results
//! for any single query. Splitting the query's publication-date range into
//! narrow windows keeps each window's result set under that cap; the union of
//! the windows' identifiers is the full result set.

use crate::harvest::search::{CountEstimator, IdPaginator};
use chrono::{Duration, NaiveDate};
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// An inclusive range of publication dates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Window {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Number of days covered, counting both ends
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Publication-date filter for this window, e.g.
    /// `("2020/01/01"[PDAT] : "2020/01/30"[PDAT])`
    pub fn date_filter(&self) -> String {
        format!(
            "(\"{}\"[PDAT] : \"{}\"[PDAT])",
            self.start.format("%Y/%m/%d"),
            self.end.format("%Y/%m/%d")
        )
    }

    /// `term` restricted to this window
    pub fn scoped_query(&self, term: &str) -> String {
        format!("{} AND {}", term, self.date_filter())
    }

    /// Splits the window into two halves, or returns `None` for a single day
    pub fn bisect(&self) -> Option<(Window, Window)> {
        if self.days() < 2 {
            return None;
        }
        let left_end = self.start + Duration::days(self.days() / 2 - 1);
        Some((
            Window::new(self.start, left_end),
            Window::new(left_end + Duration::days(1), self.end),
        ))
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Splits `[start, end]` into consecutive windows of `width_days`
///
/// Windows do not overlap, leave no gaps, and the last one is truncated to
/// `end`. An empty list is returned when `start > end`.
pub fn windows(start: NaiveDate, end: NaiveDate, width_days: u32) -> Vec<Window> {
    let span = Duration::days(i64::from(width_days.max(1)) - 1);
    let mut result = Vec::new();
    let mut current = start;

    while current <= end {
        let window_end = current
            .checked_add_signed(span)
            .map_or(end, |last| last.min(end));
        result.push(Window::new(current, window_end));

        // The calendar ends at NaiveDate::MAX
        match window_end.checked_add_signed(Duration::days(1)) {
            Some(next) => current = next,
            None => break,
        }
    }

    result
}

/// Drives counting and pagination window by window
pub struct TimePartitioner<'a> {
    counter: CountEstimator<'a>,
    paginator: IdPaginator<'a>,
    result_cap: u32,
    window_days: u32,
    split_oversized: bool,
}

impl<'a> TimePartitioner<'a> {
    pub fn new(
        counter: CountEstimator<'a>,
        paginator: IdPaginator<'a>,
        result_cap: u32,
        window_days: u32,
    ) -> Self {
        Self {
            counter,
            paginator,
            result_cap,
            window_days,
            split_oversized: false,
        }
    }

    /// Bisect windows whose count exceeds the cap instead of truncating them
    pub fn with_split_oversized(mut self, split: bool) -> Self {
        self.split_oversized = split;
        self
    }

    /// Collects the distinct identifiers matching `term` between `start` and `end`
    ///
    /// Windows are processed chronologically. Identifiers are returned in the
    /// order they were first seen.
    pub async fn harvest(&self, term: &str, start: NaiveDate, end: NaiveDate) -> Vec<String> {
        let mut pending: VecDeque<Window> = windows(start, end, self.window_days).into();
        let mut seen: HashSet<String> = HashSet::new();
        let mut ids: Vec<String> = Vec::new();

        tracing::info!(
            "Partitioned {} to {} into {} windows of {} days",
            start,
            end,
            pending.len(),
            self.window_days
        );

        while let Some(window) = pending.pop_front() {
            tracing::info!("Fetching identifiers for {}", window);

            let count = self.counter.count(term, Some(&window)).await;
            if count == 0 {
                tracing::debug!("No results in {}", window);
                continue;
            }

            if count > u64::from(self.result_cap) {
                if self.split_oversized {
                    if let Some((left, right)) = window.bisect() {
                        tracing::info!(
                            "{} results in {} exceed the cap of {}, splitting",
                            count,
                            window,
                            self.result_cap
                        );
                        pending.push_front(right);
                        pending.push_front(left);
                        continue;
                    }
                }
                tracing::warn!(
                    "{} results in {} exceed the cap of {}; only the first {} will be fetched, consider a narrower window",
                    count,
                    window,
                    self.result_cap,
                    self.result_cap
                );
            }

            let retmax = count.min(u64::from(self.result_cap)) as u32;
            let window_ids = self
                .paginator
                .paginate(&window.scoped_query(term), retmax)
                .await;

            let before = ids.len();
            for id in window_ids {
                if seen.insert(id.clone()) {
                    ids.push(id);
                }
            }
            tracing::info!(
                "{}: {} new identifiers ({} total)",
                window,
                ids.len() - before,
                ids.len()
            );
        }

        tracing::info!("Total distinct identifiers: {}", ids.len());
        ids
    }
}
