//! Response classification
//!
//! The target answers with HTTP 200 both when it rate limits a client and when a
//! question does not exist, so the outcome of a fetch is decided by looking at the body.
//! Checks run in a fixed order: rate-limit markers, then not-found markers, then the
//! envelope shape.

use crate::config::ClassifierConfig;
use crate::crawler::extractor::QuestionEnvelope;

/// Outcome of fetching one question through one proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A well-formed question envelope
    Success(QuestionEnvelope),

    /// Transport-level failure: timeout, refused connection, proxy error status
    BadProxy(String),

    /// The body is a soft block
    RateLimited,

    /// The site says the question does not exist
    EmptyQuestion,

    /// The body is not a usable question envelope
    MalformedQuestion(String),
}

impl FetchOutcome {
    /// Short label used in logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::BadProxy(_) => "bad-proxy",
            Self::RateLimited => "rate-limited",
            Self::EmptyQuestion => "empty-question",
            Self::MalformedQuestion(_) => "malformed-question",
        }
    }
}

/// Classifies response bodies by their content
#[derive(Debug, Clone)]
pub struct ResponseClassifier {
    rate_limit_markers: Vec<String>,
    not_found_markers: Vec<String>,
}

impl Default for ResponseClassifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}

impl ResponseClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            rate_limit_markers: config.rate_limit_markers.clone(),
            not_found_markers: config.not_found_markers.clone(),
        }
    }

    /// Classifies the body of a response that arrived with a success status
    pub fn classify_body(&self, body: &[u8]) -> FetchOutcome {
        if contains_any(body, &self.rate_limit_markers) {
            return FetchOutcome::RateLimited;
        }

        if contains_any(body, &self.not_found_markers) {
            return FetchOutcome::EmptyQuestion;
        }

        match QuestionEnvelope::decode(body) {
            Ok(envelope) => FetchOutcome::Success(envelope),
            Err(e) => FetchOutcome::MalformedQuestion(e.to_string()),
        }
    }
}

fn contains_any(body: &[u8], markers: &[String]) -> bool {
    markers.iter().any(|marker| {
        let marker = marker.as_bytes();
        !marker.is_empty() && body.windows(marker.len()).any(|window| window == marker)
    })
}
