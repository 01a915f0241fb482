//! Workers and per-worker proxy rotation
//!
//! Every worker owns a private [`WorkerProxyState`]. A round walks the active proxies in
//! random order, one job per proxy. Proxies that handled their job become the active set
//! of the next round; the others sit out until the worker is restarted. A worker stops when
//! the job queue is closed and drained, or when a round ends with no surviving proxy.
//!
//! Workers share nothing but the read-only [`ProxyPool`] and the [`JobQueue`], so two
//! workers may both probe the same dead proxy.

use crate::crawler::fetcher::{ProxyEndpoint, ProxyPool};
use crate::model::QuestionId;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Shared job queue with single delivery
///
/// Closing is signalled by dropping every sender; after that, workers drain what is left
/// and then see `None`.
#[derive(Debug, Clone)]
pub struct JobQueue {
    receiver: Arc<Mutex<mpsc::Receiver<QuestionId>>>,
}

impl JobQueue {
    /// Creates a bounded queue and the sender that feeds it
    pub fn channel(capacity: usize) -> (mpsc::Sender<QuestionId>, JobQueue) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            sender,
            JobQueue {
                receiver: Arc::new(Mutex::new(receiver)),
            },
        )
    }

    /// Waits for the next job; `None` once the queue is closed and empty
    pub async fn next_job(&self) -> Option<QuestionId> {
        self.receiver.lock().await.recv().await
    }
}

/// Result of one job attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Question and its answers persisted
    Stored { answers: usize },

    /// The site reported the question missing; a stub was persisted
    StoredEmpty,

    /// Transport or proxy failure; the job is lost for this run
    BadProxy,

    /// Soft block; the job is lost for this run
    RateLimited,

    /// Unusable content; the job is dropped
    Malformed,

    /// Fetch succeeded but the write failed; the job is lost for this run
    PersistFailed,
}

impl JobOutcome {
    /// Whether the proxy that served this job earns a place in the next round
    ///
    /// Only a job that went all the way into storage counts.
    pub fn proxy_healthy(&self) -> bool {
        self.is_stored()
    }

    /// Whether the job's question reached storage
    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Stored { .. } | Self::StoredEmpty)
    }
}

/// Runs one job through one proxy
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, id: QuestionId, proxy: &ProxyEndpoint) -> JobOutcome;
}

/// Per-outcome job counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub stored: u64,
    pub stored_empty: u64,
    pub answers: u64,
    pub bad_proxy: u64,
    pub rate_limited: u64,
    pub malformed: u64,
    pub persist_failed: u64,
}

impl OutcomeCounts {
    pub fn record(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Stored { answers } => {
                self.stored += 1;
                self.answers += answers as u64;
            }
            JobOutcome::StoredEmpty => self.stored_empty += 1,
            JobOutcome::BadProxy => self.bad_proxy += 1,
            JobOutcome::RateLimited => self.rate_limited += 1,
            JobOutcome::Malformed => self.malformed += 1,
            JobOutcome::PersistFailed => self.persist_failed += 1,
        }
    }

    pub fn merge(&mut self, other: &OutcomeCounts) {
        self.stored += other.stored;
        self.stored_empty += other.stored_empty;
        self.answers += other.answers;
        self.bad_proxy += other.bad_proxy;
        self.rate_limited += other.rate_limited;
        self.malformed += other.malformed;
        self.persist_failed += other.persist_failed;
    }

    /// Jobs attempted
    pub fn jobs(&self) -> u64 {
        self.persisted() + self.dropped()
    }

    /// Jobs whose question reached storage
    pub fn persisted(&self) -> u64 {
        self.stored + self.stored_empty
    }

    /// Jobs that produced nothing in storage
    pub fn dropped(&self) -> u64 {
        self.bad_proxy + self.rate_limited + self.malformed + self.persist_failed
    }
}

/// Proxy reputation private to one worker
///
/// Proxies are referenced by their index in the shared [`ProxyPool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerProxyState {
    active: Vec<usize>,
    survivors: BTreeSet<usize>,
}

impl WorkerProxyState {
    /// Starts with every proxy of the pool active
    pub fn new(pool_size: usize) -> Self {
        Self {
            active: (0..pool_size).collect(),
            survivors: BTreeSet::new(),
        }
    }

    /// Candidates of the current round
    pub fn active(&self) -> &[usize] {
        &self.active
    }

    /// Random permutation of the active set
    pub fn round_order(&self) -> Vec<usize> {
        let mut order = self.active.clone();
        order.shuffle(&mut rand::thread_rng());
        order
    }

    /// Marks a proxy as working this round
    pub fn record_success(&mut self, proxy: usize) {
        self.survivors.insert(proxy);
    }

    /// Closes the round: survivors become the active set
    ///
    /// Returns false when no proxy survived, which leaves the worker without egress.
    pub fn finish_round(&mut self) -> bool {
        self.active = std::mem::take(&mut self.survivors).into_iter().collect();
        !self.active.is_empty()
    }
}

/// Why a worker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// The queue was closed and empty
    QueueDrained,

    /// A round ended with no working proxy
    NoUsableProxies,
}

/// Summary returned by a finished worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub exit: WorkerExit,
    /// Rounds completed, the interrupted last round excluded
    pub rounds: u64,
    pub outcomes: OutcomeCounts,
}

/// Runs one worker until the queue drains or its proxies run out
pub async fn run_worker<H>(
    worker_id: usize,
    pool: Arc<ProxyPool>,
    queue: JobQueue,
    handler: Arc<H>,
) -> WorkerReport
where
    H: JobHandler + ?Sized,
{
    let mut state = WorkerProxyState::new(pool.len());
    let mut outcomes = OutcomeCounts::default();
    let mut rounds = 0u64;

    tracing::debug!("Worker {} started with {} proxies", worker_id, pool.len());

    loop {
        for index in state.round_order() {
            let Some(endpoint) = pool.get(index) else {
                continue;
            };

            let Some(id) = queue.next_job().await else {
                tracing::debug!("Worker {}: queue drained", worker_id);
                return WorkerReport {
                    worker_id,
                    exit: WorkerExit::QueueDrained,
                    rounds,
                    outcomes,
                };
            };

            let outcome = handler.handle(id, endpoint).await;
            tracing::debug!(
                "Worker {}: question {} via {} -> {:?}",
                worker_id,
                id,
                endpoint.descriptor,
                outcome
            );

            outcomes.record(outcome);
            if outcome.proxy_healthy() {
                state.record_success(index);
            }
        }

        rounds += 1;
        let before = state.active().len();

        if !state.finish_round() {
            tracing::warn!(
                "Worker {}: no proxy survived round {}, stopping",
                worker_id,
                rounds
            );
            return WorkerReport {
                worker_id,
                exit: WorkerExit::NoUsableProxies,
                rounds,
                outcomes,
            };
        }

        if state.active().len() < before {
            tracing::info!(
                "Worker {}: round {} kept {} of {} proxies",
                worker_id,
                rounds,
                state.active().len(),
                before
            );
        }
    }
}
