//! Configuration module for the crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files
//! and the newline-delimited proxy list.
//!
//! # Example
//!
//! ```no_run
//! use theq_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawling up to question {}", config.crawler.max_id);
//! ```

mod parser;
mod proxies;
mod types;
mod validation;

// Re-export types
pub use types::{ClassifierConfig, Config, CrawlerConfig, OutputConfig, ProxyConfig};

// Re-export loader functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use proxies::{load_proxy_list, parse_proxy_list};
pub use validation::{validate, MAX_WORKERS};
