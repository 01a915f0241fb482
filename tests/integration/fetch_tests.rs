//! Fetcher classification against a mock server

use crate::support::{captcha_body, create_test_config, mount_question, not_found_body, question_body};
use theq_crawler::crawler::{FetchOutcome, Fetcher, ProxyPool, ResponseClassifier};
use theq_crawler::ProxyDescriptor;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn direct_pool(base_url: &str) -> ProxyPool {
    let config = create_test_config(base_url, 10, 1, ":memory:");
    ProxyPool::new(&config.crawler, &[ProxyDescriptor::Direct]).unwrap()
}

async fn fetch(server: &MockServer, id: u64) -> FetchOutcome {
    let pool = direct_pool(&server.uri());
    let fetcher = Fetcher::new(&server.uri(), ResponseClassifier::default());
    fetcher.fetch(pool.get(0).unwrap(), id).await
}

#[tokio::test]
async fn test_fetch_success() {
    let mock_server = MockServer::start().await;
    mount_question(&mock_server, 42, question_body(42, &[(1, 10)])).await;

    match fetch(&mock_server, 42).await {
        FetchOutcome::Success(envelope) => {
            assert_eq!(envelope.id, 42);
            assert!(envelope.html.contains("answer-1"));
        }
        other => panic!("expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_sends_configured_user_agent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/questions/next/3"))
        .and(header("user-agent", "TestBot/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(question_body(3, &[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    assert!(matches!(fetch(&mock_server, 3).await, FetchOutcome::Success(_)));
}

#[tokio::test]
async fn test_fetch_captcha_page_is_rate_limited() {
    let mock_server = MockServer::start().await;
    mount_question(&mock_server, 5, captcha_body()).await;

    assert_eq!(fetch(&mock_server, 5).await, FetchOutcome::RateLimited);
}

#[tokio::test]
async fn test_fetch_http_429_is_rate_limited() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/questions/next/5"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    assert_eq!(fetch(&mock_server, 5).await, FetchOutcome::RateLimited);
}

#[tokio::test]
async fn test_fetch_server_error_is_bad_proxy() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/questions/next/5"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    assert_eq!(
        fetch(&mock_server, 5).await,
        FetchOutcome::BadProxy("HTTP 502".to_string())
    );
}

#[tokio::test]
async fn test_fetch_not_found_question() {
    let mock_server = MockServer::start().await;
    mount_question(&mock_server, 8, not_found_body(8)).await;

    assert_eq!(fetch(&mock_server, 8).await, FetchOutcome::EmptyQuestion);
}

#[tokio::test]
async fn test_fetch_malformed_envelope() {
    let mock_server = MockServer::start().await;
    mount_question(&mock_server, 9, r#"{"questionId": 9}"#.to_string()).await;

    assert!(matches!(
        fetch(&mock_server, 9).await,
        FetchOutcome::MalformedQuestion(_)
    ));
}

#[tokio::test]
async fn test_fetch_through_dead_proxy_is_bad_proxy() {
    let mock_server = MockServer::start().await;
    mount_question(&mock_server, 1, question_body(1, &[])).await;

    let config = create_test_config(&mock_server.uri(), 10, 1, ":memory:");
    let dead = ProxyDescriptor::Via(Url::parse("http://127.0.0.1:1").unwrap());
    let pool = ProxyPool::new(&config.crawler, &[dead]).unwrap();
    let fetcher = Fetcher::new(&mock_server.uri(), ResponseClassifier::default());

    let outcome = fetcher.fetch(pool.get(0).unwrap(), 1).await;
    assert!(matches!(outcome, FetchOutcome::BadProxy(_)));
}
