use serde::Deserialize;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub proxies: ProxyConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Site root, question pages live under `{base-url}/questions/next/{id}`
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Highest question ID to fetch
    #[serde(rename = "max-id")]
    pub max_id: u64,

    /// Number of concurrent workers
    pub workers: u32,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout", default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

/// Markers used to recognize soft blocks in HTTP 200 bodies
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Any of these in a body means the request was rate limited
    #[serde(rename = "rate-limit-markers", default = "default_rate_limit_markers")]
    pub rate_limit_markers: Vec<String>,

    /// Any of these in a body means the question does not exist
    #[serde(rename = "not-found-markers", default = "default_not_found_markers")]
    pub not_found_markers: Vec<String>,
}

/// Proxy list location
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyConfig {
    /// Newline-delimited proxy list; connect directly when unset
    #[serde(rename = "list-path")]
    pub list_path: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rate_limit_markers: default_rate_limit_markers(),
            not_found_markers: default_not_found_markers(),
        }
    }
}

fn default_base_url() -> String {
    "http://thequestion.ru".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

// Markup only: answer text inside the envelope is HTML-escaped and JSON-quoted, so it cannot match
fn default_rate_limit_markers() -> Vec<String> {
    vec![
        "class=\"g-recaptcha\"".to_string(),
        "<title>Too Many Requests</title>".to_string(),
    ]
}

fn default_not_found_markers() -> Vec<String> {
    vec!["\"questionNotFound\":true".to_string(), "question-not-found".to_string()]
}
