//! Crawler coordinator - main crawl orchestration logic
//!
//! This module wires the crawl together:
//! - Opening storage and reading the stored ID set
//! - Building the proxy pool and the fetch/extract/persist pipeline
//! - Spawning the gap-scan producer and the worker tasks
//! - Aggregating worker reports and recording the run

use crate::config::Config;
use crate::crawler::classifier::ResponseClassifier;
use crate::crawler::extractor::ContentExtractor;
use crate::crawler::fetcher::{Fetcher, ProxyPool};
use crate::crawler::gap_scanner::enqueue_missing;
use crate::crawler::pipeline::CrawlPipeline;
use crate::crawler::worker::{run_worker, JobQueue, OutcomeCounts, WorkerExit, WorkerReport};
use crate::model::ProxyDescriptor;
use crate::storage::{RunStatus, RunTotals, SqliteStorage, Storage, StorageError};
use crate::CrawlerError;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Jobs buffered per worker between the producer and the workers
const QUEUE_DEPTH_PER_WORKER: usize = 2;

/// Summary of a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub run_id: i64,

    /// IDs handed to the job queue by the gap scan
    pub enqueued: u64,

    pub workers: Vec<WorkerReport>,

    /// Outcome counters summed over every worker
    pub outcomes: OutcomeCounts,

    pub elapsed: Duration,
}

impl CrawlReport {
    /// Totals recorded in the run row
    pub fn totals(&self) -> RunTotals {
        RunTotals {
            jobs: self.outcomes.jobs(),
            stored: self.outcomes.persisted(),
            dropped: self.outcomes.dropped(),
        }
    }

    /// Number of workers that stopped because every proxy failed them
    pub fn exhausted_workers(&self) -> usize {
        self.workers
            .iter()
            .filter(|report| report.exit == WorkerExit::NoUsableProxies)
            .count()
    }
}

/// Main crawler coordinator structure
pub struct Coordinator<S = SqliteStorage> {
    config: Config,
    proxies: Vec<ProxyDescriptor>,
    config_hash: String,
    storage: Arc<Mutex<S>>,
}

impl Coordinator<SqliteStorage> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `proxies` - Loaded proxy list, at least one entry
    /// * `config_hash` - Hash of the configuration file, recorded with the run
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Storage opened successfully
    /// * `Err(CrawlerError)` - Empty proxy list or unusable database
    pub fn new(
        config: Config,
        proxies: Vec<ProxyDescriptor>,
        config_hash: impl Into<String>,
    ) -> Result<Self, CrawlerError> {
        let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
        Self::with_storage(config, proxies, config_hash, storage)
    }
}

impl<S> Coordinator<S>
where
    S: Storage + Send + 'static,
{
    /// Creates a coordinator over an already opened storage backend
    ///
    /// `config.output.database-path` is ignored.
    pub fn with_storage(
        config: Config,
        proxies: Vec<ProxyDescriptor>,
        config_hash: impl Into<String>,
        storage: S,
    ) -> Result<Self, CrawlerError> {
        if proxies.is_empty() {
            return Err(CrawlerError::Startup(
                "proxy list must contain at least one entry".to_string(),
            ));
        }

        Ok(Self {
            config,
            proxies,
            config_hash: config_hash.into(),
            storage: Arc::new(Mutex::new(storage)),
        })
    }

    /// Shared handle to the storage backend
    pub fn storage(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.storage)
    }

    /// Runs the crawl until the job queue drains or every worker runs out of proxies
    ///
    /// Startup failures (database, HTTP client construction) are returned as errors.
    /// Per-job failures never are: they show up in the report counters instead.
    pub async fn run(&self) -> Result<CrawlReport, CrawlerError> {
        let start_time = Instant::now();

        let (known_ids, run_id) = {
            let mut storage = self.lock_storage()?;
            // No baseline means no safe gap scan: abort before recording a run
            let known_ids = storage.fetch_known_ids().map_err(|e| {
                tracing::error!("Failed to read stored question IDs: {}", e);
                e
            })?;
            let run_id = storage.create_run(&self.config_hash)?;
            (known_ids, run_id)
        };

        tracing::info!(
            "Starting crawl run {}: {} questions stored, ceiling {}, {} workers, {} proxies",
            run_id,
            known_ids.len(),
            self.config.crawler.max_id,
            self.config.crawler.workers,
            self.proxies.len()
        );

        let pool = match ProxyPool::new(&self.config.crawler, &self.proxies) {
            Ok(pool) => Arc::new(pool),
            Err(e) => {
                self.record_failure(run_id);
                return Err(e.into());
            }
        };

        let fetcher = Fetcher::new(
            &self.config.crawler.base_url,
            ResponseClassifier::new(&self.config.classifier),
        );
        let pipeline = Arc::new(CrawlPipeline::new(
            fetcher,
            ContentExtractor::new(),
            Arc::clone(&self.storage),
        ));

        let workers = self.config.crawler.workers as usize;
        let (sender, queue) = JobQueue::channel(workers * QUEUE_DEPTH_PER_WORKER);

        let producer = tokio::spawn(enqueue_missing(
            known_ids,
            self.config.crawler.max_id,
            sender,
        ));

        let handles: Vec<_> = (0..workers)
            .map(|worker_id| {
                tokio::spawn(run_worker(
                    worker_id,
                    Arc::clone(&pool),
                    queue.clone(),
                    Arc::clone(&pipeline),
                ))
            })
            .collect();

        // Workers hold the only receivers from here on, so the producer notices when they are all gone
        drop(queue);

        let mut reports = Vec::with_capacity(workers);
        let mut task_failures = 0usize;
        for handle in handles {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    tracing::error!("Worker task failed: {}", e);
                    task_failures += 1;
                }
            }
        }

        let enqueued = match producer.await {
            Ok(enqueued) => enqueued,
            Err(e) => {
                tracing::error!("Producer task failed: {}", e);
                task_failures += 1;
                0
            }
        };

        let mut outcomes = OutcomeCounts::default();
        for report in &reports {
            outcomes.merge(&report.outcomes);
        }

        let report = CrawlReport {
            run_id,
            enqueued,
            workers: reports,
            outcomes,
            elapsed: start_time.elapsed(),
        };

        let status = if task_failures == 0 {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        self.lock_storage()?
            .finish_run(run_id, status, &report.totals())?;

        log_report(&report);
        Ok(report)
    }

    fn lock_storage(&self) -> Result<MutexGuard<'_, S>, StorageError> {
        self.storage.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn record_failure(&self, run_id: i64) {
        let result = self
            .lock_storage()
            .and_then(|mut storage| storage.finish_run(run_id, RunStatus::Failed, &RunTotals::default()));
        if let Err(e) = result {
            tracing::error!("Failed to mark run {} as failed: {}", run_id, e);
        }
    }
}

fn log_report(report: &CrawlReport) {
    let outcomes = &report.outcomes;

    tracing::info!(
        "Crawl run {} finished in {:?}: {} enqueued, {} handled, {} stored ({} empty, {} answers)",
        report.run_id,
        report.elapsed,
        report.enqueued,
        outcomes.jobs(),
        outcomes.persisted(),
        outcomes.stored_empty,
        outcomes.answers
    );

    if outcomes.dropped() > 0 {
        tracing::info!(
            "Dropped {} jobs: {} bad proxy, {} rate limited, {} malformed, {} not persisted",
            outcomes.dropped(),
            outcomes.bad_proxy,
            outcomes.rate_limited,
            outcomes.malformed,
            outcomes.persist_failed
        );
    }

    let exhausted = report.exhausted_workers();
    if exhausted == report.workers.len() && exhausted > 0 {
        tracing::warn!(
            "Every worker ran out of usable proxies; remaining IDs are left for the next run"
        );
    } else if exhausted > 0 {
        tracing::warn!("{} workers ran out of usable proxies", exhausted);
    }
}

/// Runs a complete crawl operation
///
/// This is the main entry point for crawling:
/// 1. Open the database and read the stored ID set
/// 2. Record a new run
/// 3. Build one HTTP client per proxy
/// 4. Enqueue every missing ID and drain the queue with the worker pool
/// 5. Record the totals on the run
///
/// # Example
///
/// ```no_run
/// use theq_crawler::config::{load_config_with_hash, load_proxy_list};
/// use theq_crawler::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("config.toml"))?;
/// let proxies = load_proxy_list(None)?;
/// let report = run_crawl(config, proxies, hash).await?;
/// println!("{} questions stored", report.outcomes.persisted());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: Config,
    proxies: Vec<ProxyDescriptor>,
    config_hash: String,
) -> Result<CrawlReport, CrawlerError> {
    let coordinator = Coordinator::new(config, proxies, config_hash)?;
    coordinator.run().await
}
