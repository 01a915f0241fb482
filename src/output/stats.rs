//! Statistics generation from crawl database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::crawler::GapScanner;
use crate::model::QuestionId;
use crate::storage::{RunRecord, Storage};
use crate::CrawlerError;

/// Number of runs listed by `--stats`
const RECENT_RUN_LIMIT: usize = 5;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Stored questions, empty stubs included
    pub questions: u64,

    /// Stored stubs for questions the site reported as missing
    pub empty_questions: u64,

    /// Stored answers across all questions
    pub answers: u64,

    /// Highest stored question ID
    pub highest_id: Option<QuestionId>,

    /// Missing IDs below the highest stored ID
    pub interior_gaps: u64,

    /// Most recent runs, newest first
    pub recent_runs: Vec<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(CrawlerError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<CrawlStatistics, CrawlerError> {
    let questions = storage.count_questions()?;
    let empty_questions = storage.count_empty_questions()?;
    let answers = storage.count_answers()?;
    let highest_id = storage.max_question_id()?;

    // With the ceiling at the highest stored ID only the holes remain
    let interior_gaps = match highest_id {
        Some(highest) => GapScanner::new(storage.fetch_known_ids()?, highest).count() as u64,
        None => 0,
    };

    let recent_runs = storage.get_recent_runs(RECENT_RUN_LIMIT)?;

    Ok(CrawlStatistics {
        questions,
        empty_questions,
        answers,
        highest_id,
        interior_gaps,
        recent_runs,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Questions stored: {}", stats.questions);
    println!("  Empty question stubs: {}", stats.empty_questions);
    println!("  Answers stored: {}", stats.answers);
    match stats.highest_id {
        Some(highest) => println!("  Highest question ID: {}", highest),
        None => println!("  Highest question ID: none"),
    }
    println!("  Missing IDs below highest: {}", stats.interior_gaps);
    println!();

    if !stats.recent_runs.is_empty() {
        println!("Recent Runs:");
        for run in &stats.recent_runs {
            println!(
                "  #{} {} [{}] started {}, finished {}",
                run.id,
                run.status.to_db_string(),
                run.config_hash,
                run.started_at,
                run.finished_at.as_deref().unwrap_or("-")
            );
            println!(
                "      {} jobs, {} stored, {} dropped",
                run.totals.jobs, run.totals.stored, run.totals.dropped
            );
        }
        println!();
    }

    let with_content = stats.questions.saturating_sub(stats.empty_questions);
    let coverage = match stats.highest_id {
        Some(highest) if highest > 0 => (stats.questions as f64 / highest as f64) * 100.0,
        _ => 0.0,
    };

    println!(
        "Coverage: {:.1}% of IDs up to the highest stored ({} with content)",
        coverage, with_content
    );
}
