use crate::model::ProxyDescriptor;
use crate::ConfigError;
use std::path::Path;
use url::Url;

const PROXY_SCHEMES: [&str; 4] = ["http", "https", "socks5", "socks5h"];

/// Loads the proxy list
///
/// Without a path the crawler connects directly, so the list is a single
/// [`ProxyDescriptor::Direct`].
///
/// # Arguments
///
/// * `path` - Optional path to a newline-delimited proxy list
///
/// # Returns
///
/// * `Ok(Vec<ProxyDescriptor>)` - One descriptor per line
/// * `Err(ConfigError)` - The file could not be read or a line is not a valid proxy URL
pub fn load_proxy_list(path: Option<&Path>) -> Result<Vec<ProxyDescriptor>, ConfigError> {
    let Some(path) = path else {
        return Ok(vec![ProxyDescriptor::Direct]);
    };

    let content = std::fs::read_to_string(path)?;
    parse_proxy_list(&content)
}

/// Parses a newline-delimited proxy list
///
/// Blank lines stand for a direct connection. Every other line must be a proxy URL
/// with an http, https or socks5 scheme.
pub fn parse_proxy_list(content: &str) -> Result<Vec<ProxyDescriptor>, ConfigError> {
    let mut proxies = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            proxies.push(ProxyDescriptor::Direct);
            continue;
        }

        let url = Url::parse(line).map_err(|e| ConfigError::InvalidProxy {
            line: index + 1,
            message: format!("'{}': {}", line, e),
        })?;

        if !PROXY_SCHEMES.contains(&url.scheme()) {
            return Err(ConfigError::InvalidProxy {
                line: index + 1,
                message: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        proxies.push(ProxyDescriptor::Via(url));
    }

    if proxies.is_empty() {
        return Err(ConfigError::Validation("proxy list is empty".to_string()));
    }

    Ok(proxies)
}
