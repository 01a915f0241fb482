//! Output module for crawl reports and statistics
//!
//! This module handles:
//! - Printing the summary of a finished crawl
//! - Reading and displaying statistics from the crawl database

pub mod stats;

pub use stats::{load_statistics, print_statistics, CrawlStatistics};

use crate::crawler::{CrawlReport, WorkerExit};

/// Prints the summary of a finished crawl to stdout
///
/// # Arguments
///
/// * `report` - The report returned by the coordinator
pub fn print_crawl_report(report: &CrawlReport) {
    let outcomes = &report.outcomes;

    println!("=== Crawl Run {} ===\n", report.run_id);
    println!("Duration: {:.1}s", report.elapsed.as_secs_f64());
    println!("IDs enqueued: {}", report.enqueued);
    println!("Jobs handled: {}", outcomes.jobs());
    println!();

    println!("Stored:");
    println!("  Questions: {}", outcomes.stored);
    println!("  Empty stubs: {}", outcomes.stored_empty);
    println!("  Answers: {}", outcomes.answers);
    println!();

    println!("Dropped:");
    println!("  Bad proxy: {}", outcomes.bad_proxy);
    println!("  Rate limited: {}", outcomes.rate_limited);
    println!("  Malformed: {}", outcomes.malformed);
    println!("  Not persisted: {}", outcomes.persist_failed);
    println!();

    println!("Workers:");
    for worker in &report.workers {
        let exit = match worker.exit {
            WorkerExit::QueueDrained => "queue drained",
            WorkerExit::NoUsableProxies => "out of proxies",
        };
        println!(
            "  #{}: {} jobs over {} rounds, {}",
            worker.worker_id,
            worker.outcomes.jobs(),
            worker.rounds,
            exit
        );
    }
}
