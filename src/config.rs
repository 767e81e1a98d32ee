//! Configuration management for chaser-steps

use crate::logging::Severity;
use crate::{Error, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Page settings applied to the target when a session attaches
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PageSettings {
    /// Load images
    pub load_images: bool,

    /// Load plugins
    pub load_plugins: bool,

    /// User agent override
    pub user_agent: Option<String>,

    /// Enforce same-origin policy and CSP
    pub web_security_enabled: bool,

    /// Ignore TLS certificate errors
    pub ignore_ssl_errors: bool,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            load_images: false,
            load_plugins: false,
            user_agent: Some(
                "Mozilla/5.0 (Windows NT 6.3; rv:36.0) Gecko/20100101 Firefox/36.0".to_string(),
            ),
            web_security_enabled: false,
            ignore_ssl_errors: true,
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minimum severity written to the diagnostic stream
    pub log_level: Severity,

    /// Trace every resource request and response
    pub verbose: bool,

    /// Timeout for native waits in milliseconds
    pub wait_timeout_ms: u64,

    /// Timeout for a whole run in milliseconds
    pub step_timeout_ms: Option<u64>,

    /// Interval between readiness polls in milliseconds
    pub poll_interval_ms: u64,

    /// CDP endpoint of the browser
    pub cdp_endpoint: String,

    /// Page settings
    pub page: PageSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Severity::Info,
            verbose: false,
            wait_timeout_ms: 120_000,
            step_timeout_ms: None,
            poll_interval_ms: 50,
            cdp_endpoint: "ws://localhost:9222".to_string(),
            page: PageSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(level) = env::var("CHASER_LOG_LEVEL") {
            config.log_level = level.parse()?;
        }

        if let Ok(verbose) = env::var("CHASER_VERBOSE") {
            config.verbose = verbose
                .parse()
                .map_err(|_| Error::configuration("Invalid CHASER_VERBOSE"))?;
        }

        if let Ok(timeout) = env::var("CHASER_WAIT_TIMEOUT") {
            config.wait_timeout_ms = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid CHASER_WAIT_TIMEOUT"))?;
        }

        if let Ok(timeout) = env::var("CHASER_STEP_TIMEOUT") {
            config.step_timeout_ms = Some(
                timeout
                    .parse()
                    .map_err(|_| Error::configuration("Invalid CHASER_STEP_TIMEOUT"))?,
            );
        }

        if let Ok(interval) = env::var("CHASER_POLL_INTERVAL") {
            config.poll_interval_ms = interval
                .parse()
                .map_err(|_| Error::configuration("Invalid CHASER_POLL_INTERVAL"))?;
        }

        if let Ok(endpoint) = env::var("CHASER_CDP_ENDPOINT") {
            config.cdp_endpoint = endpoint;
        }

        if let Ok(user_agent) = env::var("CHASER_USER_AGENT") {
            config.page.user_agent = Some(user_agent);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::configuration("poll_interval_ms must be positive"));
        }
        if self.wait_timeout_ms == 0 {
            return Err(Error::configuration("wait_timeout_ms must be positive"));
        }
        Ok(())
    }

    /// Native wait timeout
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    /// Whole-run timeout, if any
    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_ms.map(Duration::from_millis)
    }

    /// Readiness poll interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
