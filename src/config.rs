use crate::error::{RelayError, Result};
use crate::proxy::ProviderSpec;
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiServerConfig,
    /// Proxy rotation configuration
    pub proxy: ProxyConfig,
    /// Upstream fetch configuration
    pub fetch: FetchConfig,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port for the API server (default: 8000)
    pub port: u16,
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,
    /// Allowed CORS origins (comma-separated, empty = any origin)
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Route upstream calls through rotating proxies
    pub enabled: bool,
    /// Proxy-list providers to query on refresh
    pub providers: Vec<ProviderSpec>,
    /// Timeout for each provider query
    pub provider_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Upstream calls per request, including the first
    pub max_attempts: u32,
    /// Deadline for one upstream call
    pub attempt_timeout: Duration,
    /// Language used when the request does not name one
    pub default_language: String,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            api: ApiServerConfig {
                port: get_env_or("API_PORT", "8000").parse().map_err(|_| {
                    RelayError::InvalidConfig("API_PORT must be a valid port number".into())
                })?,
                host: get_env_or("API_HOST", "0.0.0.0"),
                cors_origins: split_list(&get_env_or("CORS_ORIGINS", "")),
            },
            proxy: ProxyConfig {
                enabled: get_env_or("PROXY_ENABLED", "true")
                    .parse()
                    .unwrap_or(true),
                providers: parse_providers()?,
                provider_timeout: Duration::from_secs(
                    get_env_or("PROXY_PROVIDER_TIMEOUT", "5")
                        .parse()
                        .unwrap_or(5),
                ),
            },
            fetch: FetchConfig {
                max_attempts: get_env_or("FETCH_MAX_ATTEMPTS", "3")
                    .parse::<u32>()
                    .map_err(|_| {
                        RelayError::InvalidConfig(
                            "FETCH_MAX_ATTEMPTS must be a positive number".into(),
                        )
                    })?
                    .max(1),
                attempt_timeout: Duration::from_secs(
                    get_env_or("FETCH_ATTEMPT_TIMEOUT", "30")
                        .parse()
                        .unwrap_or(30),
                ),
                default_language: get_env_or("DEFAULT_LANGUAGE", "en"),
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "pretty"),
            },
        })
    }

    /// Get the API server address
    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn parse_providers() -> Result<Vec<ProviderSpec>> {
    let raw = env::var("PROXY_PROVIDERS").unwrap_or_default();
    let entries = split_list(&raw);
    if entries.is_empty() {
        return Ok(ProviderSpec::defaults());
    }

    entries
        .iter()
        .map(|entry| {
            ProviderSpec::parse(entry)
                .map_err(|e| RelayError::InvalidConfig(format!("PROXY_PROVIDERS: {}", e)))
        })
        .collect()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
