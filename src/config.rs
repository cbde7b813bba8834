//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Shared configuration file (config/default.toml)
//! 3. Local configuration file (config/local.toml)
//! 4. Environment variables (override)

use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;

/// Main client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub search: SearchConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Root of the remote API (e.g., "https://campus.example.com/api")
    pub base_url: String,
    /// Transport timeout in seconds (default: 30)
    pub timeout_seconds: u64,
    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl ApiConfig {
    /// Parse the base URL
    ///
    /// # Errors
    /// Returns `AppError::Config` if the URL is not an absolute http(s) URL
    pub fn parsed_base_url(&self) -> Result<url::Url, crate::error::AppError> {
        let url = url::Url::parse(self.base_url.trim()).map_err(|e| {
            crate::error::AppError::Config(format!("api.base_url is not a valid URL: {}", e))
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(crate::error::AppError::Config(format!(
                "api.base_url must use http or https, got {}",
                other
            ))),
        }
    }
}

fn default_user_agent() -> String {
    format!("RustRoom/{}", env!("CARGO_PKG_VERSION"))
}

/// Search configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Debounce delay for search input in milliseconds (default: 500)
    pub debounce_ms: u64,
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Remote collection cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Seconds a fetched collection counts as fresh (default: 0 = always refetch)
    pub freshness_seconds: u64,
}

impl CacheConfig {
    /// Freshness window, `None` when every load refetches
    pub fn freshness(&self) -> Option<Duration> {
        (self.freshness_seconds > 0).then(|| Duration::from_secs(self.freshness_seconds))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:3000/api".to_string(),
                timeout_seconds: 30,
                user_agent: default_user_agent(),
            },
            search: SearchConfig { debounce_ms: 500 },
            cache: CacheConfig {
                freshness_seconds: 0,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (RUSTROOM__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("api.base_url", "http://localhost:3000/api")?
            .set_default("api.timeout_seconds", 30)?
            .set_default("api.user_agent", default_user_agent())?
            .set_default("search.debounce_ms", 500)?
            .set_default("cache.freshness_seconds", 0)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (RUSTROOM__*)
            .add_source(
                Environment::with_prefix("RUSTROOM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        let url = self.api.parsed_base_url()?;

        if self.api.timeout_seconds == 0 {
            return Err(crate::error::AppError::Config(
                "api.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        let host = url.host_str().unwrap_or_default();
        if url.scheme() != "https" {
            if is_local_api_host(host) {
                tracing::warn!(
                    host = %host,
                    "Using plain http against a local API host"
                );
            } else {
                return Err(crate::error::AppError::Config(
                    "api.base_url must use https for non-local hosts".to_string(),
                ));
            }
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(crate::error::AppError::Config(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                self.logging.format
            )));
        }

        Ok(())
    }
}

fn normalized_api_host(host: &str) -> String {
    host.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase()
}

fn is_local_api_host(host: &str) -> bool {
    let host = normalized_api_host(host);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
