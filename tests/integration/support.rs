//! Shared fixtures for the integration tests

use theq_crawler::config::{ClassifierConfig, Config, CrawlerConfig, OutputConfig, ProxyConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at a mock server
pub fn create_test_config(base_url: &str, max_id: u64, workers: u32, db_path: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            base_url: base_url.to_string(),
            max_id,
            workers,
            user_agent: "TestBot/1.0".to_string(),
            request_timeout: 5,
            connect_timeout: 1,
        },
        classifier: ClassifierConfig::default(),
        proxies: ProxyConfig::default(),
        output: OutputConfig {
            database_path: db_path.to_string(),
        },
    }
}

/// Builds the HTML fragment of one answer
pub fn answer_html(answer_id: u64, payload: &str, author_id: u64) -> String {
    format!(
        r#"<div class="answer" id="answer-{}">
             <script type="application/ld+json">{}</script>
             <div class="answer__body"><p>Some text</p></div>
             <a class="answer__account-username" href="/account/{}">user</a>
           </div>"#,
        answer_id, payload, author_id
    )
}

/// Builds a question envelope body with the given answers as `(answer_id, author_id)`
pub fn question_body(id: u64, answers: &[(u64, u64)]) -> String {
    let mut html = format!(r#"<div class="question" question-data="question {}"></div>"#, id);
    for (answer_id, author_id) in answers {
        let payload = format!(r#"{{"answer":{}}}"#, answer_id);
        html.push_str(&answer_html(*answer_id, &payload, *author_id));
    }

    serde_json::json!({ "questionId": id, "questionHTML": html }).to_string()
}

/// Body the site serves instead of a question when it throttles a client
pub fn captcha_body() -> String {
    r#"<html><body><form><div class="g-recaptcha" data-sitekey="x"></div></form></body></html>"#
        .to_string()
}

/// Body the site serves for an ID with no question behind it
pub fn not_found_body(id: u64) -> String {
    serde_json::json!({
        "questionId": id,
        "questionHTML": "<div class=\"question-not-found\">Nothing here</div>"
    })
    .to_string()
}

/// Mounts a GET handler for one question page
pub async fn mount_question(server: &MockServer, id: u64, body: String) {
    Mock::given(method("GET"))
        .and(path(format!("/questions/next/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}
