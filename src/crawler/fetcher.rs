//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building one HTTP client per proxy with the spoofed user agent
//! - Building question page URLs
//! - GET requests and transport error classification
//!
//! Content-level classification is delegated to [`ResponseClassifier`].

use crate::config::CrawlerConfig;
use crate::crawler::classifier::{FetchOutcome, ResponseClassifier};
use crate::model::{ProxyDescriptor, QuestionId};
use reqwest::{Client, Proxy, StatusCode};
use std::time::Duration;

/// Builds an HTTP client that sends every request through `proxy`
///
/// # Arguments
///
/// * `config` - Crawler configuration (user agent and timeouts)
/// * `proxy` - The egress path for this client
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Invalid proxy address or TLS backend failure
pub fn build_http_client(
    config: &CrawlerConfig,
    proxy: &ProxyDescriptor,
) -> Result<Client, reqwest::Error> {
    let builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.request_timeout))
        .connect_timeout(Duration::from_secs(config.connect_timeout))
        .gzip(true)
        .brotli(true);

    let builder = match proxy {
        // Ignore HTTP_PROXY and friends so "direct" really means direct
        ProxyDescriptor::Direct => builder.no_proxy(),
        ProxyDescriptor::Via(url) => builder.proxy(Proxy::all(url.as_str())?),
    };

    builder.build()
}

/// A proxy together with the client bound to it
#[derive(Debug, Clone)]
pub struct ProxyEndpoint {
    pub descriptor: ProxyDescriptor,
    pub client: Client,
}

/// The configured proxies, built once and shared read-only by every worker
#[derive(Debug, Clone)]
pub struct ProxyPool {
    endpoints: Vec<ProxyEndpoint>,
}

impl ProxyPool {
    /// Builds a client for every proxy
    pub fn new(config: &CrawlerConfig, proxies: &[ProxyDescriptor]) -> Result<Self, reqwest::Error> {
        let endpoints = proxies
            .iter()
            .map(|descriptor| {
                Ok(ProxyEndpoint {
                    descriptor: descriptor.clone(),
                    client: build_http_client(config, descriptor)?,
                })
            })
            .collect::<Result<Vec<_>, reqwest::Error>>()?;

        Ok(Self { endpoints })
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ProxyEndpoint> {
        self.endpoints.get(index)
    }
}

/// Fetches question pages and classifies the responses
#[derive(Debug, Clone)]
pub struct Fetcher {
    base_url: String,
    classifier: ResponseClassifier,
}

impl Fetcher {
    pub fn new(base_url: &str, classifier: ResponseClassifier) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            classifier,
        }
    }

    /// Returns the page URL for a question ID
    pub fn question_url(&self, id: QuestionId) -> String {
        format!("{}/questions/next/{}", self.base_url, id)
    }

    /// Fetches one question through the given endpoint
    ///
    /// # Classification
    ///
    /// | Condition | Outcome |
    /// |-----------|---------|
    /// | Timeout, connect error, body read error | BadProxy |
    /// | HTTP 429 | RateLimited |
    /// | Any other non-2xx status (407, 5xx, ...) | BadProxy |
    /// | 2xx | decided by the body, see [`ResponseClassifier`] |
    ///
    /// There is no retry here: a failed attempt is reported once and the caller moves on.
    pub async fn fetch(&self, endpoint: &ProxyEndpoint, id: QuestionId) -> FetchOutcome {
        let url = self.question_url(id);

        let response = match endpoint.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => return FetchOutcome::BadProxy(describe_transport_error(&e)),
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return FetchOutcome::RateLimited;
        }
        if !status.is_success() {
            return FetchOutcome::BadProxy(format!("HTTP {}", status.as_u16()));
        }

        match response.bytes().await {
            Ok(body) => self.classifier.classify_body(&body),
            Err(e) => FetchOutcome::BadProxy(describe_transport_error(&e)),
        }
    }
}

fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        format!("Connection failed: {}", error)
    } else {
        error.to_string()
    }
}
