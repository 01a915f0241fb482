//! TheQ crawler: a proxy-rotating harvester for sequentially numbered Q&A pages
//!
//! This crate walks a dense numeric question ID space, fetches every question that is not
//! yet stored, classifies soft blocks hidden behind HTTP 200 responses, extracts the
//! question and its answers from the embedded HTML fragment and persists the raw payloads.

pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod storage;

use thiserror::Error;

/// Main error type for crawler operations
///
/// Only startup-level failures travel through this type. Per-job failures are absorbed by
/// the workers and reported as [`crawler::JobOutcome`] values.
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Startup failed: {0}")]
    Startup(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid proxy on line {line}: {message}")]
    InvalidProxy { line: usize, message: String },
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{Answer, ProxyDescriptor, Question, QuestionId};
