//! End-to-end crawls against a mock server

use crate::support::{
    captcha_body, create_test_config, mount_question, not_found_body, question_body,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use theq_crawler::config::parse_proxy_list;
use theq_crawler::crawler::{Coordinator, JobHandler, JobOutcome, ProxyEndpoint, ProxyPool};
use theq_crawler::model::{Question, QuestionId};
use theq_crawler::storage::{
    RunRecord, RunStatus, RunTotals, Storage, StorageError, StorageResult,
};
use theq_crawler::{CrawlerError, ProxyDescriptor};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn db_path(temp_dir: &TempDir) -> String {
    temp_dir
        .path()
        .join("theq.db")
        .to_string_lossy()
        .into_owned()
}

#[tokio::test]
async fn test_crawl_stores_questions_and_stubs() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();

    mount_question(&mock_server, 1, question_body(1, &[(11, 100), (12, 200)])).await;
    mount_question(&mock_server, 2, not_found_body(2)).await;
    mount_question(&mock_server, 3, question_body(3, &[])).await;
    mount_question(&mock_server, 4, question_body(4, &[(41, 100)])).await;

    let config = create_test_config(&mock_server.uri(), 4, 2, &db_path(&temp_dir));
    let coordinator = Coordinator::new(config, vec![ProxyDescriptor::Direct], "hash").unwrap();
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.enqueued, 4);
    assert_eq!(report.outcomes.stored, 3);
    assert_eq!(report.outcomes.stored_empty, 1);
    assert_eq!(report.outcomes.answers, 3);
    assert_eq!(report.outcomes.dropped(), 0);

    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    assert_eq!(storage.fetch_known_ids().unwrap(), vec![1, 2, 3, 4]);

    let first = storage.get_question(1).unwrap().unwrap();
    assert_eq!(first.payload, "question 1");
    let answers: Vec<(u64, u64)> = first.answers.iter().map(|a| (a.id, a.author_id)).collect();
    assert_eq!(answers, vec![(11, 100), (12, 200)]);
    assert_eq!(first.answers[0].payload, r#"{"answer":11}"#);

    assert!(storage.get_question(2).unwrap().unwrap().is_empty());

    let run = storage.get_run(report.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "hash");
    assert_eq!(
        run.totals,
        RunTotals {
            jobs: 4,
            stored: 4,
            dropped: 0
        }
    );
}

#[tokio::test]
async fn test_rerun_fetches_only_missing_ids() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();

    for id in [1, 2, 3, 5] {
        mount_question(&mock_server, id, question_body(id, &[])).await;
    }
    mount_question(&mock_server, 4, captcha_body()).await;

    // Three direct entries give one worker three slots per round, so ID 4 only costs its own slot
    let proxies = parse_proxy_list("\n\n\n").unwrap();
    assert_eq!(proxies.len(), 3);

    let config = create_test_config(&mock_server.uri(), 5, 1, &db_path(&temp_dir));
    let first = Coordinator::new(config.clone(), proxies.clone(), "hash")
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(first.outcomes.rate_limited, 1);
    assert_eq!(first.outcomes.persisted(), 4);

    // The site stops throttling
    mock_server.reset().await;
    Mock::given(method("GET"))
        .and(path("/questions/next/4"))
        .respond_with(ResponseTemplate::new(200).set_body_string(question_body(4, &[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let coordinator = Coordinator::new(config, proxies, "hash").unwrap();
    let second = coordinator.run().await.unwrap();

    assert_eq!(second.enqueued, 1);
    assert_eq!(second.outcomes.stored, 1);

    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    assert_eq!(storage.fetch_known_ids().unwrap(), vec![1, 2, 3, 4, 5]);
    assert_eq!(storage.get_recent_runs(10).unwrap().len(), 2);
}

#[tokio::test]
async fn test_crawl_terminates_when_everything_is_rate_limited() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(captcha_body()))
        .mount(&mock_server)
        .await;

    let proxies = parse_proxy_list("\n\n").unwrap();
    let config = create_test_config(&mock_server.uri(), 50, 2, &db_path(&temp_dir));
    let coordinator = Coordinator::new(config, proxies, "hash").unwrap();
    let report = coordinator.run().await.unwrap();

    // Each worker burns both of its proxies in its first round, then gives up
    assert_eq!(report.outcomes.rate_limited, 4);
    assert_eq!(report.outcomes.persisted(), 0);
    assert_eq!(report.exhausted_workers(), 2);
    assert!(report.enqueued < 50);

    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    assert_eq!(storage.count_questions().unwrap(), 0);
}

#[tokio::test]
async fn test_dead_proxy_costs_exactly_one_job() {
    let mock_server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();

    for id in 1..=6 {
        mount_question(&mock_server, id, question_body(id, &[(id * 10, 1)])).await;
    }

    let proxies = vec![
        ProxyDescriptor::Direct,
        ProxyDescriptor::Via(Url::parse("http://127.0.0.1:1").unwrap()),
    ];
    let config = create_test_config(&mock_server.uri(), 6, 1, &db_path(&temp_dir));
    let coordinator = Coordinator::new(config, proxies, "hash").unwrap();
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.outcomes.bad_proxy, 1);
    assert_eq!(report.outcomes.stored, 5);
    assert_eq!(report.exhausted_workers(), 0);

    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    assert_eq!(storage.count_questions().unwrap(), 5);
    assert_eq!(storage.get_run(report.run_id).unwrap().totals.dropped, 1);
}

/// Storage whose writes always fail, and whose reads fail too when `unreadable` is set
#[derive(Default)]
struct BrokenStorage {
    unreadable: bool,
    runs_created: usize,
    finished_runs: Vec<(RunStatus, RunTotals)>,
}

impl Storage for BrokenStorage {
    fn insert_question(&mut self, _question: &Question) -> StorageResult<()> {
        Err(StorageError::Database("disk full".to_string()))
    }

    fn fetch_known_ids(&self) -> StorageResult<Vec<QuestionId>> {
        if self.unreadable {
            return Err(StorageError::Database("table questions is corrupt".to_string()));
        }
        Ok(Vec::new())
    }

    fn get_question(&self, _id: QuestionId) -> StorageResult<Option<Question>> {
        Ok(None)
    }

    fn create_run(&mut self, _config_hash: &str) -> StorageResult<i64> {
        self.runs_created += 1;
        Ok(self.runs_created as i64)
    }

    fn finish_run(
        &mut self,
        _run_id: i64,
        status: RunStatus,
        totals: &RunTotals,
    ) -> StorageResult<()> {
        self.finished_runs.push((status, *totals));
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        Err(StorageError::RunNotFound(run_id))
    }

    fn get_recent_runs(&self, _limit: usize) -> StorageResult<Vec<RunRecord>> {
        Ok(Vec::new())
    }

    fn count_questions(&self) -> StorageResult<u64> {
        Ok(0)
    }

    fn count_empty_questions(&self) -> StorageResult<u64> {
        Ok(0)
    }

    fn count_answers(&self) -> StorageResult<u64> {
        Ok(0)
    }

    fn max_question_id(&self) -> StorageResult<Option<QuestionId>> {
        Ok(None)
    }
}

#[tokio::test]
async fn test_failing_store_stops_worker_after_one_round() {
    let mock_server = MockServer::start().await;
    for id in 1..=30 {
        mount_question(&mock_server, id, question_body(id, &[(id, 1)])).await;
    }

    let proxies = parse_proxy_list("\n\n\n").unwrap();
    let config = create_test_config(&mock_server.uri(), 30, 1, ":memory:");
    let coordinator =
        Coordinator::with_storage(config, proxies, "hash", BrokenStorage::default()).unwrap();
    let report = coordinator.run().await.unwrap();

    // Every proxy fetched fine but none of the writes landed
    assert_eq!(report.exhausted_workers(), 1);
    assert_eq!(report.workers[0].rounds, 1);
    assert_eq!(report.outcomes.jobs(), 3);
    assert_eq!(report.outcomes.persist_failed, 3);
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);

    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    assert_eq!(
        storage.finished_runs,
        vec![(
            RunStatus::Completed,
            RunTotals {
                jobs: 3,
                stored: 0,
                dropped: 3
            }
        )]
    );
}

#[tokio::test]
async fn test_unreadable_store_aborts_before_any_fetch() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(question_body(1, &[])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let storage = BrokenStorage {
        unreadable: true,
        ..BrokenStorage::default()
    };
    let config = create_test_config(&mock_server.uri(), 10, 2, ":memory:");
    let coordinator =
        Coordinator::with_storage(config, vec![ProxyDescriptor::Direct], "hash", storage).unwrap();

    let result = coordinator.run().await;
    assert!(matches!(result, Err(CrawlerError::Storage(_))));

    assert!(mock_server.received_requests().await.unwrap().is_empty());

    let storage = coordinator.storage();
    let storage = storage.lock().unwrap();
    assert_eq!(storage.runs_created, 0);
    assert!(storage.finished_runs.is_empty());
}

/// Handler that records every job it sees
struct RecordingHandler {
    seen: Mutex<Vec<QuestionId>>,
}

#[async_trait]
impl JobHandler for RecordingHandler {
    async fn handle(&self, id: QuestionId, _proxy: &ProxyEndpoint) -> JobOutcome {
        self.seen.lock().unwrap().push(id);
        JobOutcome::StoredEmpty
    }
}

#[tokio::test]
async fn test_gap_scan_feeds_worker_pool() {
    use theq_crawler::crawler::{enqueue_missing, run_worker, JobQueue};

    let config = create_test_config("http://127.0.0.1:1", 10, 3, ":memory:");
    let pool = Arc::new(
        ProxyPool::new(&config.crawler, &parse_proxy_list("\n\n").unwrap()).unwrap(),
    );
    let handler = Arc::new(RecordingHandler {
        seen: Mutex::new(Vec::new()),
    });

    let (sender, queue) = JobQueue::channel(4);
    let producer = tokio::spawn(enqueue_missing(vec![2, 5, 9], 12, sender));
    let workers: Vec<_> = (0..3)
        .map(|worker_id| {
            tokio::spawn(run_worker(
                worker_id,
                Arc::clone(&pool),
                queue.clone(),
                Arc::clone(&handler),
            ))
        })
        .collect();
    drop(queue);

    let mut handled = 0;
    for worker in workers {
        handled += worker.await.unwrap().outcomes.jobs();
    }
    assert_eq!(producer.await.unwrap(), 9);
    assert_eq!(handled, 9);

    let mut seen = handler.seen.lock().unwrap().clone();
    seen.sort_unstable();
    assert_eq!(seen, vec![1, 3, 4, 6, 7, 8, 10, 11, 12]);
}
