//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::model::{Answer, Question, QuestionId};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, RunTotals};
use crate::CrawlerError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(CrawlerError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, CrawlerError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, CrawlerError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn to_db_id(id: u64) -> StorageResult<i64> {
    i64::try_from(id).map_err(|_| StorageError::Database(format!("ID {} out of range", id)))
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Failed),
        totals: RunTotals {
            jobs: row.get::<_, i64>(5)? as u64,
            stored: row.get::<_, i64>(6)? as u64,
            dropped: row.get::<_, i64>(7)? as u64,
        },
    })
}

const RUN_COLUMNS: &str =
    "id, started_at, finished_at, config_hash, status, jobs, stored, dropped";

impl Storage for SqliteStorage {
    // ===== Questions =====

    fn insert_question(&mut self, question: &Question) -> StorageResult<()> {
        let question_id = to_db_id(question.id)?;
        let now = Utc::now().to_rfc3339();

        // Dropping the transaction without commit rolls everything back
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO questions (id, payload, fetched_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET payload = excluded.payload, fetched_at = excluded.fetched_at",
            params![question_id, question.payload, now],
        )?;

        tx.execute(
            "DELETE FROM answers WHERE question_id = ?1",
            params![question_id],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO answers (question_id, position, answer_id, author_id, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;

            for (position, answer) in question.answers.iter().enumerate() {
                stmt.execute(params![
                    question_id,
                    position as i64,
                    to_db_id(answer.id)?,
                    to_db_id(answer.author_id)?,
                    answer.payload,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn fetch_known_ids(&self) -> StorageResult<Vec<QuestionId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM questions ORDER BY id ASC")?;

        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .map(|id| id.map(|id| id as u64))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ids)
    }

    fn get_question(&self, id: QuestionId) -> StorageResult<Option<Question>> {
        let question_id = to_db_id(id)?;

        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM questions WHERE id = ?1",
                params![question_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(payload) = payload else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT answer_id, author_id, payload FROM answers
             WHERE question_id = ?1 ORDER BY position ASC",
        )?;

        let answers = stmt
            .query_map(params![question_id], |row| {
                Ok(Answer {
                    id: row.get::<_, i64>(0)? as u64,
                    author_id: row.get::<_, i64>(1)? as u64,
                    payload: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Question {
            id,
            payload,
            answers,
        }))
    }

    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        totals: &RunTotals,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, jobs = ?3, stored = ?4, dropped = ?5
             WHERE id = ?6",
            params![
                status.to_db_string(),
                now,
                totals.jobs as i64,
                totals.stored as i64,
                totals.dropped as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_recent_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM runs ORDER BY id DESC LIMIT ?1",
            RUN_COLUMNS
        ))?;

        let runs = stmt
            .query_map(params![limit as i64], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    // ===== Statistics =====

    fn count_questions(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM questions", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_empty_questions(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM questions q
             WHERE q.payload = '' AND NOT EXISTS (SELECT 1 FROM answers a WHERE a.question_id = q.id)",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_answers(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM answers", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn max_question_id(&self) -> StorageResult<Option<QuestionId>> {
        let max: Option<i64> = self
            .conn
            .query_row("SELECT MAX(id) FROM questions", [], |row| row.get(0))?;
        Ok(max.map(|id| id as u64))
    }
}
