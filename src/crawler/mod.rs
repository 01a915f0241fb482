//! Crawler module for question harvesting
//!
//! This module contains the core crawling logic, including:
//! - Gap scanning over the stored ID set
//! - HTTP fetching through per-proxy clients
//! - Soft-block aware response classification
//! - Single-pass extraction of questions and answers
//! - The worker pool with per-worker proxy rotation
//! - Overall crawl coordination

mod classifier;
mod coordinator;
mod extractor;
mod fetcher;
mod gap_scanner;
mod pipeline;
mod worker;

pub use classifier::{FetchOutcome, ResponseClassifier};
pub use coordinator::{run_crawl, Coordinator, CrawlReport};
pub use extractor::{AnswerEvent, ContentExtractor, ExtractError, PendingAnswer, QuestionEnvelope};
pub use fetcher::{build_http_client, Fetcher, ProxyEndpoint, ProxyPool};
pub use gap_scanner::{enqueue_missing, GapScanner};
pub use pipeline::CrawlPipeline;
pub use worker::{
    run_worker, JobHandler, JobOutcome, JobQueue, OutcomeCounts, WorkerExit, WorkerProxyState,
    WorkerReport,
};

use crate::config::Config;
use crate::model::ProxyDescriptor;
use crate::CrawlerError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Initialize the storage layer and record a run
/// 2. Build one HTTP client per proxy
/// 3. Enqueue every question ID missing from storage
/// 4. Fetch, classify, extract and store them with the worker pool
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `proxies` - Egress paths shared by every worker
/// * `config_hash` - Hash of the configuration file, recorded with the run
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl finished; lost jobs are counted, not fatal
/// * `Err(CrawlerError)` - Crawl could not start
pub async fn crawl(
    config: Config,
    proxies: Vec<ProxyDescriptor>,
    config_hash: String,
) -> Result<CrawlReport, CrawlerError> {
    run_crawl(config, proxies, config_hash).await
}
