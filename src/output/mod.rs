//! Output module for harvest reports and checkpoint statistics
//!
//! The record file itself is written by the checkpoint; this module only
//! produces human-readable summaries.

pub mod stats;

pub use stats::{compute_statistics, load_statistics, print_statistics, CheckpointStatistics};

use crate::harvest::HarvestReport;

/// Prints the summary of a finished harvest to stdout
pub fn print_report(report: &HarvestReport, records_path: &str) {
    println!("=== Harvest Summary ===\n");
    println!("  Identifiers found: {}", report.identifiers_found);
    println!("  Already in checkpoint: {}", report.already_present);
    println!("  Newly fetched: {}", report.fetched);
    if report.failed_batches > 0 {
        println!(
            "  Failed batches: {} (run again to retry)",
            report.failed_batches
        );
    }
    println!();
    println!(
        "✓ Saved {} records to {}",
        report.total_records, records_path
    );
}
