use crate::config::types::{ClassifierConfig, Config, CrawlerConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound on concurrent workers
pub const MAX_WORKERS: u32 = 256;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_classifier_config(&config.classifier)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
pub(crate) fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let base_url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if base_url.scheme() != "http" && base_url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            config.base_url
        )));
    }

    if config.max_id < 1 {
        return Err(ConfigError::Validation("max-id must be >= 1".to_string()));
    }

    if config.workers < 1 || config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.workers
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.request_timeout < 1 || config.connect_timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "timeouts must be >= 1s, got request-timeout={}s connect-timeout={}s",
            config.request_timeout, config.connect_timeout
        )));
    }

    Ok(())
}

/// Validates soft-block markers
fn validate_classifier_config(config: &ClassifierConfig) -> Result<(), ConfigError> {
    validate_markers("rate-limit-markers", &config.rate_limit_markers)?;
    validate_markers("not-found-markers", &config.not_found_markers)?;
    Ok(())
}

fn validate_markers(name: &str, markers: &[String]) -> Result<(), ConfigError> {
    if markers.is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
    }

    // An empty marker would match every body
    if markers.iter().any(|m| m.is_empty()) {
        return Err(ConfigError::Validation(format!(
            "{} cannot contain empty strings",
            name
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
