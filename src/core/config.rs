//! Configuration management for the MCP server.
//!
//! This module provides a centralized configuration structure that can be
//! populated from environment variables or defaults.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::transport::TransportConfig;
use crate::domains::tools::definitions::RetryPolicy;

/// Main configuration structure for the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,

    /// Upstream HTTP providers used by the tools.
    pub upstream: UpstreamConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,
}

/// Settings shared by every outbound HTTP call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Timeout applied to each individual request.
    pub timeout: Duration,

    /// `User-Agent` header sent upstream.
    pub user_agent: String,

    pub forecast: ForecastConfig,

    pub random_user: RandomUserConfig,
}

/// Weather forecast provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Base URL; `{locale}` is replaced with [`ForecastConfig::locale`].
    pub base_url: String,

    /// Provider locale, e.g. "zh-cn" or "en".
    pub locale: String,

    /// Retry behaviour for non-success responses.
    pub retry: RetryPolicy,
}

impl ForecastConfig {
    /// Base URL with the locale substituted and no trailing slash.
    pub fn endpoint(&self) -> String {
        self.base_url
            .replace("{locale}", &self.locale)
            .trim_end_matches('/')
            .to_string()
    }
}

/// Random user provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomUserConfig {
    pub base_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            forecast: ForecastConfig {
                base_url: "https://{locale}.wttr.in".to_string(),
                locale: "zh-cn".to_string(),
                retry: RetryPolicy::default(),
            },
            random_user: RandomUserConfig {
                base_url: "https://randomuser.me/api/".to_string(),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "weather-user-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            transport: TransportConfig::default(),
            upstream: UpstreamConfig::default(),
        }
    }
}

impl LoggingConfig {
    /// Load the logging settings alone.
    ///
    /// Read before the rest of the configuration so the subscriber is in
    /// place when [`Config::from_env`] reports invalid values.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            level: std::env::var("MCP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables are expected to be prefixed with `MCP_`.
    /// For example: `MCP_SERVER_NAME`, `MCP_LOG_LEVEL`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        config.logging = LoggingConfig::from_env();

        config.transport = TransportConfig::from_env();

        let upstream = &mut config.upstream;
        if let Some(secs) = parse_env::<u64>("MCP_HTTP_TIMEOUT_SECS") {
            upstream.timeout = Duration::from_secs(secs);
        }
        if let Ok(agent) = std::env::var("MCP_USER_AGENT") {
            upstream.user_agent = agent;
        }
        if let Ok(url) = std::env::var("MCP_FORECAST_URL") {
            upstream.forecast.base_url = url;
        }
        if let Ok(locale) = std::env::var("MCP_FORECAST_LOCALE") {
            upstream.forecast.locale = locale;
        }
        if let Some(attempts) = parse_env::<u32>("MCP_FORECAST_MAX_ATTEMPTS") {
            upstream.forecast.retry.max_attempts = attempts.max(1);
        }
        if let Some(ms) = parse_env::<u64>("MCP_FORECAST_BACKOFF_MS") {
            upstream.forecast.retry.base_delay = Duration::from_millis(ms);
        }
        if let Ok(url) = std::env::var("MCP_RANDOM_USER_URL") {
            upstream.random_user.base_url = url;
        }

        info!(
            "Forecast provider: {} (max {} attempt(s))",
            upstream.forecast.endpoint(),
            upstream.forecast.retry.max_attempts
        );

        config
    }
}

/// Read and parse an environment variable, warning on unparsable values.
fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure env var tests run serially
    static ENV_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_upstreams() {
        let config = Config::default();
        assert_eq!(config.upstream.forecast.endpoint(), "https://zh-cn.wttr.in");
        assert_eq!(config.upstream.forecast.retry.max_attempts, 3);
        assert_eq!(config.upstream.timeout, Duration::from_secs(10));
        assert_eq!(
            config.upstream.random_user.base_url,
            "https://randomuser.me/api/"
        );
    }

    #[test]
    fn test_endpoint_without_placeholder() {
        let forecast = ForecastConfig {
            base_url: "http://127.0.0.1:9999/".to_string(),
            locale: "en".to_string(),
            retry: RetryPolicy::default(),
        };
        assert_eq!(forecast.endpoint(), "http://127.0.0.1:9999");
    }

    #[test]
    fn test_forecast_overrides_from_env() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("MCP_FORECAST_LOCALE", "en");
            std::env::set_var("MCP_FORECAST_MAX_ATTEMPTS", "5");
            std::env::set_var("MCP_FORECAST_BACKOFF_MS", "250");
        }
        let config = Config::from_env();
        assert_eq!(config.upstream.forecast.endpoint(), "https://en.wttr.in");
        assert_eq!(config.upstream.forecast.retry.max_attempts, 5);
        assert_eq!(
            config.upstream.forecast.retry.base_delay,
            Duration::from_millis(250)
        );
        unsafe {
            std::env::remove_var("MCP_FORECAST_LOCALE");
            std::env::remove_var("MCP_FORECAST_MAX_ATTEMPTS");
            std::env::remove_var("MCP_FORECAST_BACKOFF_MS");
        }
    }

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_logging_level_from_env() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("MCP_LOG_LEVEL", "debug");
        }
        assert_eq!(LoggingConfig::from_env().level, "debug");
        assert_eq!(Config::from_env().logging.level, "debug");
        unsafe {
            std::env::remove_var("MCP_LOG_LEVEL");
        }
    }

    #[test]
    fn test_invalid_value_warning_reaches_installed_subscriber() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("MCP_FORECAST_BACKOFF_MS", "fast");
        }

        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let config = tracing::subscriber::with_default(subscriber, Config::from_env);

        unsafe {
            std::env::remove_var("MCP_FORECAST_BACKOFF_MS");
        }
        assert_eq!(
            config.upstream.forecast.retry.base_delay,
            Duration::from_secs(1)
        );
        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Ignoring invalid value for MCP_FORECAST_BACKOFF_MS"));
    }

    #[test]
    fn test_invalid_numbers_fall_back_to_defaults() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("MCP_HTTP_TIMEOUT_SECS", "soon");
            std::env::set_var("MCP_FORECAST_MAX_ATTEMPTS", "0");
        }
        let config = Config::from_env();
        assert_eq!(config.upstream.timeout, Duration::from_secs(10));
        assert_eq!(config.upstream.forecast.retry.max_attempts, 1);
        unsafe {
            std::env::remove_var("MCP_HTTP_TIMEOUT_SECS");
            std::env::remove_var("MCP_FORECAST_MAX_ATTEMPTS");
        }
    }
}
