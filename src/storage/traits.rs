//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::model::{Question, QuestionId};
use crate::storage::{RunRecord, RunStatus, RunTotals};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The crawl itself only needs [`Storage::insert_question`] and
/// [`Storage::fetch_known_ids`]; the rest serves run tracking and statistics.
pub trait Storage {
    // ===== Questions =====

    /// Stores a question together with all of its answers
    ///
    /// The write is atomic: either the question row and every answer row become visible,
    /// or nothing does. Storing an ID again replaces the earlier question and answers.
    fn insert_question(&mut self, question: &Question) -> StorageResult<()>;

    /// Returns the IDs of all stored questions in ascending order
    fn fetch_known_ids(&self) -> StorageResult<Vec<QuestionId>>;

    /// Loads a stored question with its answers in document order
    fn get_question(&self, id: QuestionId) -> StorageResult<Option<Question>>;

    // ===== Run Management =====

    /// Creates a new crawl run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Closes a run with its final status and totals
    fn finish_run(&mut self, run_id: i64, status: RunStatus, totals: &RunTotals)
        -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent runs, newest first
    fn get_recent_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>>;

    // ===== Statistics =====

    /// Counts stored questions, stubs included
    fn count_questions(&self) -> StorageResult<u64>;

    /// Counts stubs stored for questions the site reported missing
    fn count_empty_questions(&self) -> StorageResult<u64>;

    /// Counts stored answers
    fn count_answers(&self) -> StorageResult<u64>;

    /// Returns the highest stored question ID
    fn max_question_id(&self) -> StorageResult<Option<QuestionId>>;
}
