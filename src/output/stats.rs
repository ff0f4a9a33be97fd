//! Statistics over a checkpoint file
//!
//! This module provides functionality for summarizing harvested records
//! without touching the network.

use crate::checkpoint::Checkpoint;
use crate::record::Record;
use crate::HarvestError;
use std::collections::BTreeMap;
use std::path::Path;

/// Summary of the records held in a checkpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckpointStatistics {
    /// Total number of records
    pub total_records: u64,

    /// Records with a non-empty abstract
    pub with_abstract: u64,

    /// Records with no author names
    pub without_authors: u64,

    /// Records with no publication date
    pub without_date: u64,

    /// Record count per publication year ("unknown" when the date does not start with a year)
    pub by_year: BTreeMap<String, u64>,
}

/// Computes statistics for a set of records
pub fn compute_statistics(records: &[Record]) -> CheckpointStatistics {
    let mut stats = CheckpointStatistics {
        total_records: records.len() as u64,
        ..Default::default()
    };

    for record in records {
        if !record.abstract_text.is_empty() {
            stats.with_abstract += 1;
        }
        if record.authors.is_empty() {
            stats.without_authors += 1;
        }
        if record.pub_date.is_empty() {
            stats.without_date += 1;
        }
        *stats.by_year.entry(publication_year(&record.pub_date)).or_insert(0) += 1;
    }

    stats
}

/// Leading four-digit year of a normalized date, or "unknown"
fn publication_year(pub_date: &str) -> String {
    let year: String = pub_date.chars().take(4).collect();
    if year.len() == 4 && year.chars().all(|c| c.is_ascii_digit()) {
        year
    } else {
        "unknown".to_string()
    }
}

/// Loads statistics from the checkpoint at `path`
///
/// # Returns
///
/// * `Ok(CheckpointStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - The file could not be read or parsed
pub fn load_statistics(path: &Path) -> Result<CheckpointStatistics, HarvestError> {
    let checkpoint = Checkpoint::open(path)?;
    Ok(compute_statistics(checkpoint.records()))
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CheckpointStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Total records: {}", stats.total_records);
    println!(
        "  With abstract: {} ({:.1}%)",
        stats.with_abstract,
        percentage(stats.with_abstract, stats.total_records)
    );
    println!("  Without authors: {}", stats.without_authors);
    println!("  Without publication date: {}", stats.without_date);
    println!();

    if !stats.by_year.is_empty() {
        println!("Records by Publication Year:");
        for (year, count) in &stats.by_year {
            println!("  {}: {}", year, count);
        }
    }
}

fn percentage(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}
