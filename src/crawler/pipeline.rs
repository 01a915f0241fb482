//! Fetch → extract → persist for a single job

use crate::crawler::classifier::FetchOutcome;
use crate::crawler::extractor::ContentExtractor;
use crate::crawler::fetcher::{Fetcher, ProxyEndpoint};
use crate::crawler::worker::{JobHandler, JobOutcome};
use crate::model::{Question, QuestionId};
use crate::storage::{Storage, StorageError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Jobs between two progress lines
const PROGRESS_INTERVAL: u64 = 100;

/// The production [`JobHandler`]
///
/// Outcome policy:
///
/// | Fetch outcome | Action | Job outcome |
/// |---------------|--------|-------------|
/// | Success | extract and store | Stored (or PersistFailed) |
/// | EmptyQuestion | store an empty stub | StoredEmpty (or PersistFailed) |
/// | BadProxy | log | BadProxy |
/// | RateLimited | log | RateLimited |
/// | MalformedQuestion | log, drop | Malformed |
///
/// Nothing is re-enqueued. Lost jobs are picked up by the gap scan of the next run.
pub struct CrawlPipeline<S> {
    fetcher: Fetcher,
    extractor: ContentExtractor,
    storage: Arc<Mutex<S>>,
    handled: AtomicU64,
    started: Instant,
}

impl<S> CrawlPipeline<S>
where
    S: Storage + Send,
{
    pub fn new(fetcher: Fetcher, extractor: ContentExtractor, storage: Arc<Mutex<S>>) -> Self {
        Self {
            fetcher,
            extractor,
            storage,
            handled: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    /// Jobs handled so far, across all workers
    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }

    fn record_progress(&self) {
        let handled = self.handled.fetch_add(1, Ordering::Relaxed) + 1;
        if handled % PROGRESS_INTERVAL == 0 {
            let rate = handled as f64 / self.started.elapsed().as_secs_f64();
            tracing::info!("Progress: {} jobs handled, {:.2} jobs/sec", handled, rate);
        }
    }

    fn persist(&self, question: &Question) -> Result<(), StorageError> {
        let mut storage = self.storage.lock().map_err(|_| StorageError::LockPoisoned)?;
        storage.insert_question(question)
    }

    fn store(&self, job: QuestionId, question: &Question, stored: JobOutcome) -> JobOutcome {
        match self.persist(question) {
            Ok(()) => stored,
            Err(e) => {
                tracing::error!("Question {}: failed to store: {}", job, e);
                JobOutcome::PersistFailed
            }
        }
    }
}

#[async_trait]
impl<S> JobHandler for CrawlPipeline<S>
where
    S: Storage + Send,
{
    async fn handle(&self, id: QuestionId, proxy: &ProxyEndpoint) -> JobOutcome {
        let outcome = match self.fetcher.fetch(proxy, id).await {
            FetchOutcome::Success(envelope) => {
                let question = self.extractor.extract_envelope(&envelope);
                if question.id != id {
                    tracing::debug!("Question {} was served as question {}", id, question.id);
                }
                let answers = question.answers.len();
                self.store(id, &question, JobOutcome::Stored { answers })
            }
            FetchOutcome::EmptyQuestion => {
                tracing::debug!("Question {} does not exist, storing stub", id);
                self.store(id, &Question::empty(id), JobOutcome::StoredEmpty)
            }
            FetchOutcome::BadProxy(reason) => {
                tracing::warn!(
                    "Question {}: proxy {} failed: {}",
                    id,
                    proxy.descriptor,
                    reason
                );
                JobOutcome::BadProxy
            }
            FetchOutcome::RateLimited => {
                tracing::warn!("Question {}: rate limited via {}", id, proxy.descriptor);
                JobOutcome::RateLimited
            }
            FetchOutcome::MalformedQuestion(reason) => {
                tracing::warn!("Question {}: dropping malformed response: {}", id, reason);
                JobOutcome::Malformed
            }
        };

        self.record_progress();
        outcome
    }
}
